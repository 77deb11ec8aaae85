#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the LCR characterization rig.
//!
//! `Config` and its sections are deserialized from TOML and validated with
//! `Config::validate`. Every section is optional; missing values fall back to
//! the defaults of the reference rig.
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LcrCfg {
    /// Serial port of the meter; the simulator is used when absent.
    pub port: Option<String>,
    pub baud: u32,
    /// Nominal frame interval in seconds.
    pub frame_period_s: f64,
    /// Transmission time of one byte in seconds.
    pub byte_time_s: f64,
    /// Accepted excess frame-start spacing before frames count as lost.
    pub drift_tolerance_s: f64,
    /// Silence in seconds after which the link is considered dead.
    pub stale_timeout_s: f64,
    pub simulation: SimLcrCfg,
}

impl Default for LcrCfg {
    fn default() -> Self {
        Self {
            port: None,
            baud: 9600,
            frame_period_s: 0.5024,
            byte_time_s: 0.0177,
            drift_tolerance_s: 0.3,
            stale_timeout_s: 5.0,
            simulation: SimLcrCfg::default(),
        }
    }
}

/// Simulated meter: a capacitor whose value follows the chamber temperature.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SimLcrCfg {
    /// Capacitance at `reference_c`, farads.
    pub nominal_f: f64,
    /// Relative change per °C.
    pub tempco_per_c: f64,
    pub reference_c: f64,
    /// Dissipation factor reported as the secondary quantity.
    pub dissipation: f64,
    /// Index of a frame to silently drop.
    pub drop_frame: Option<u64>,
    /// Index of a frame whose trailer is corrupted.
    pub corrupt_frame: Option<u64>,
}

impl Default for SimLcrCfg {
    fn default() -> Self {
        Self {
            nominal_f: 47e-9,
            tempco_per_c: -7.5e-4,
            reference_c: 25.0,
            dissipation: 0.0125,
            drop_frame: None,
            corrupt_frame: None,
        }
    }
}

/// First-order thermal plant standing in for the chamber driver.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ChamberCfg {
    pub ambient_c: f64,
    /// Steady-state rise above ambient at full power, °C.
    pub gain_c: f64,
    pub time_constant_s: f64,
    /// Interval between temperature samples, seconds.
    pub sample_period_s: f64,
    /// Simulated loss of the chamber link after this many seconds.
    pub fault_after_s: Option<f64>,
}

impl Default for ChamberCfg {
    fn default() -> Self {
        Self {
            ambient_c: 22.0,
            gain_c: 90.0,
            time_constant_s: 180.0,
            sample_period_s: 0.7368,
            fault_after_s: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntegratorMode {
    #[default]
    Always,
    Conditional,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PidCfg {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Controller sample time, seconds.
    pub dt_s: f64,
    /// Integral is reset while |error| exceeds this band.
    pub integral_band: f64,
    pub integrator: IntegratorMode,
}

impl Default for PidCfg {
    fn default() -> Self {
        Self {
            kp: 0.06,
            ki: 0.0008,
            kd: 0.0,
            dt_s: 0.7368,
            integral_band: 10.0,
            integrator: IntegratorMode::Always,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Step,
    #[default]
    Linear,
}

/// Segment durations: a single number for all segments or one per segment.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Durations {
    Uniform(f64),
    PerSegment(Vec<f64>),
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SetpointCfg {
    pub profile: Profile,
    /// Setpoint values, °C.
    pub values: Vec<f64>,
    /// Segment durations, seconds.
    pub durations_s: Durations,
}

impl Default for SetpointCfg {
    fn default() -> Self {
        Self {
            profile: Profile::Linear,
            values: vec![25.0, 25.0, 75.0, 75.0],
            durations_s: Durations::PerSegment(vec![900.0, 3000.0, 900.0]),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RunnerCfg {
    /// Trajectory cycles to run.
    pub iterations: u64,
    /// Tick period of the acquisition loop, ms.
    pub poll_ms: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            iterations: 1,
            poll_ms: 50,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct OutputCfg {
    /// Parent directory for run folders.
    pub directory: String,
}

impl Default for OutputCfg {
    fn default() -> Self {
        Self {
            directory: "data".into(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub lcr: LcrCfg,
    pub chamber: ChamberCfg,
    pub pid: PidCfg,
    pub setpoint: SetpointCfg,
    pub runner: RunnerCfg,
    pub output: OutputCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // LCR link
        if let Some(port) = &self.lcr.port
            && port.trim().is_empty()
        {
            eyre::bail!("lcr.port must not be empty when set");
        }
        if self.lcr.baud == 0 {
            eyre::bail!("lcr.baud must be > 0");
        }
        if !positive(self.lcr.frame_period_s) {
            eyre::bail!("lcr.frame_period_s must be > 0");
        }
        if !positive(self.lcr.byte_time_s) {
            eyre::bail!("lcr.byte_time_s must be > 0");
        }
        if self.lcr.byte_time_s * 17.0 > self.lcr.frame_period_s {
            eyre::bail!("lcr.byte_time_s is too long for one frame per lcr.frame_period_s");
        }
        if !positive(self.lcr.drift_tolerance_s) {
            eyre::bail!("lcr.drift_tolerance_s must be > 0");
        }
        if !positive(self.lcr.stale_timeout_s) {
            eyre::bail!("lcr.stale_timeout_s must be > 0");
        }
        let sim = &self.lcr.simulation;
        if !positive(sim.nominal_f) {
            eyre::bail!("lcr.simulation.nominal_f must be > 0");
        }
        if !sim.tempco_per_c.is_finite() || !sim.reference_c.is_finite() {
            eyre::bail!("lcr.simulation.tempco_per_c and reference_c must be finite");
        }
        if !(0.0..=6.5).contains(&sim.dissipation) {
            eyre::bail!("lcr.simulation.dissipation must be in [0.0, 6.5]");
        }

        // Chamber plant
        if !self.chamber.ambient_c.is_finite() || !self.chamber.gain_c.is_finite() {
            eyre::bail!("chamber.ambient_c and chamber.gain_c must be finite");
        }
        if !positive(self.chamber.time_constant_s) {
            eyre::bail!("chamber.time_constant_s must be > 0");
        }
        if !positive(self.chamber.sample_period_s) {
            eyre::bail!("chamber.sample_period_s must be > 0");
        }
        if let Some(t) = self.chamber.fault_after_s
            && !(t.is_finite() && t >= 0.0)
        {
            eyre::bail!("chamber.fault_after_s must be >= 0");
        }

        // PID
        if !(self.pid.kp.is_finite() && self.pid.ki.is_finite() && self.pid.kd.is_finite()) {
            eyre::bail!("pid.kp, pid.ki and pid.kd must be finite");
        }
        if !positive(self.pid.dt_s) {
            eyre::bail!("pid.dt_s must be > 0");
        }
        if !(self.pid.integral_band.is_finite() && self.pid.integral_band >= 0.0) {
            eyre::bail!("pid.integral_band must be >= 0");
        }

        // Setpoint
        let sp = &self.setpoint;
        if sp.values.is_empty() {
            eyre::bail!("setpoint.values must not be empty");
        }
        if sp.values.iter().any(|v| !v.is_finite()) {
            eyre::bail!("setpoint.values must be finite");
        }
        let segments = match sp.profile {
            Profile::Step => sp.values.len(),
            Profile::Linear => {
                if sp.values.len() < 2 {
                    eyre::bail!("setpoint.values needs at least two entries for a linear profile");
                }
                sp.values.len() - 1
            }
        };
        match &sp.durations_s {
            Durations::Uniform(d) => {
                if !positive(*d) {
                    eyre::bail!("setpoint.durations_s must be > 0");
                }
            }
            Durations::PerSegment(ds) => {
                if ds.len() != segments {
                    eyre::bail!(
                        "setpoint.durations_s must have {} entries for {} values, got {}",
                        segments,
                        sp.values.len(),
                        ds.len()
                    );
                }
                if ds.iter().any(|d| !positive(*d)) {
                    eyre::bail!("setpoint.durations_s entries must be > 0");
                }
            }
        }

        // Runner
        if self.runner.iterations == 0 {
            eyre::bail!("runner.iterations must be >= 1");
        }
        if self.runner.poll_ms == 0 {
            eyre::bail!("runner.poll_ms must be >= 1");
        }
        if self.runner.poll_ms > 1000 {
            eyre::bail!("runner.poll_ms must be <= 1000 to keep up with the meter");
        }

        // Output
        if self.output.directory.trim().is_empty() {
            eyre::bail!("output.directory must not be empty");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}

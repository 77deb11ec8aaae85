//! Runtime configuration for the acquisition loop.
//!
//! These are the validated structs `AcquisitionCore` runs on. They are
//! separate from the TOML-deserialized config in `lcr_config`; see
//! `conversions` for the bridge.

pub use crate::link::LinkTiming;
pub use crate::pid::{IntegratorMode, PidCfg};
pub use crate::setpoint::{ProfileKind, SegmentDurations};

use crate::error::BuildError;
use crate::setpoint::Trajectory;

/// Loop pacing and termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunCfg {
    /// Number of full trajectory cycles to run.
    pub iterations: u64,
    /// Sleep between ticks, milliseconds.
    pub poll_ms: u64,
}

impl Default for RunCfg {
    fn default() -> Self {
        Self {
            iterations: 1,
            poll_ms: 50,
        }
    }
}

/// Setpoint profile description, turned into a `Trajectory` at build time.
#[derive(Debug, Clone, PartialEq)]
pub struct SetpointCfg {
    pub kind: ProfileKind,
    pub values: Vec<f64>,
    pub durations: SegmentDurations,
}

impl Default for SetpointCfg {
    fn default() -> Self {
        Self {
            kind: ProfileKind::Linear,
            values: vec![25.0, 25.0, 75.0, 75.0],
            durations: SegmentDurations::PerSegment(vec![900.0, 3000.0, 900.0]),
        }
    }
}

impl SetpointCfg {
    pub fn build(&self) -> Result<Trajectory, BuildError> {
        Trajectory::new(self.kind, self.values.clone(), &self.durations)
    }
}

/// Everything the runner needs besides the devices themselves.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub pid: PidCfg,
    pub timing: LinkTiming,
    pub run: RunCfg,
    pub trajectory: Trajectory,
}

pub(crate) fn validate_timing(t: &LinkTiming) -> Result<(), BuildError> {
    let all = [
        t.frame_period_s,
        t.byte_time_s,
        t.drift_tolerance_s,
        t.stale_timeout_s,
    ];
    if all.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
        return Err(BuildError::InvalidConfig(
            "link timing values must be finite and > 0",
        ));
    }
    Ok(())
}

pub(crate) fn validate_run(r: &RunCfg) -> Result<(), BuildError> {
    if r.iterations == 0 {
        return Err(BuildError::InvalidConfig("iterations must be >= 1"));
    }
    if r.poll_ms == 0 {
        return Err(BuildError::InvalidConfig("poll_ms must be >= 1"));
    }
    Ok(())
}

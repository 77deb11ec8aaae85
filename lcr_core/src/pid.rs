//! Discrete PID controller driving the chamber heater power.

use crate::error::BuildError;

/// Output range of the controller; the chamber accepts power in [0, 1].
pub const OUTPUT_MIN: f64 = 0.0;
pub const OUTPUT_MAX: f64 = 1.0;

/// How the integral term behaves while the output is clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegratorMode {
    /// Integrate on every update, clamped or not.
    #[default]
    Always,
    /// Skip accumulation on the update after a clamped output.
    Conditional,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidCfg {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Nominal time between process samples, seconds.
    pub dt_s: f64,
    /// Integral resets to zero whenever |error| exceeds this band.
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

impl PidCfg {
    pub fn validate(&self) -> Result<(), BuildError> {
        if !(self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()) {
            return Err(BuildError::InvalidConfig("PID gains must be finite"));
        }
        if !(self.dt_s.is_finite() && self.dt_s > 0.0) {
            return Err(BuildError::InvalidConfig("PID dt must be > 0"));
        }
        if !(self.integral_band.is_finite() && self.integral_band >= 0.0) {
            return Err(BuildError::InvalidConfig("PID integral band must be >= 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PidController {
    cfg: PidCfg,
    integral: f64,
    prev: Option<(f64, f64)>,
    saturated: bool,
}

impl PidController {
    pub fn new(cfg: PidCfg) -> Result<Self, BuildError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            integral: 0.0,
            prev: None,
            saturated: false,
        })
    }

    pub fn cfg(&self) -> &PidCfg {
        &self.cfg
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// True when the last output was clamped to the output range.
    pub fn saturated(&self) -> bool {
        self.saturated
    }

    /// One controller update for a fresh process sample.
    ///
    /// The first call only records state and returns 0.
    pub fn update(&mut self, setpoint: f64, measured: f64) -> f64 {
        let error = setpoint - measured;
        let mut output = 0.0;

        if let Some((_, prev_error)) = self.prev {
            let dt = self.cfg.dt_s;
            if error.abs() > self.cfg.integral_band {
                self.integral = 0.0;
            } else if self.cfg.integrator == IntegratorMode::Always || !self.saturated {
                self.integral += error * dt;
            }
            let derivative = (error - prev_error) / dt;
            let raw = self.cfg.kp * error + self.cfg.ki * self.integral + self.cfg.kd * derivative;

            output = raw.clamp(OUTPUT_MIN, OUTPUT_MAX);
            self.saturated = output != raw;
        }

        self.prev = Some((measured, error));
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn pid(mode: IntegratorMode) -> PidController {
        PidController::new(PidCfg {
            integrator: mode,
            ..PidCfg::default()
        })
        .unwrap()
    }

    #[test]
    fn first_update_only_primes_state() {
        let mut p = pid(IntegratorMode::Always);
        assert_eq!(p.update(80.0, 20.0), 0.0);
        assert_eq!(p.integral(), 0.0);
        assert!(!p.saturated());
    }

    #[test]
    fn clamps_and_flags_saturation() {
        let mut p = pid(IntegratorMode::Always);
        p.update(80.0, 20.0);
        assert_eq!(p.update(80.0, 20.0), 1.0);
        assert!(p.saturated());
        assert_eq!(p.update(20.0, 80.0), 0.0);
        assert!(p.saturated());
    }

    #[test]
    fn large_error_resets_integral() {
        let mut p = pid(IntegratorMode::Always);
        p.update(30.0, 25.0);
        p.update(30.0, 25.0);
        assert!(p.integral() > 0.0);
        p.update(50.0, 25.0);
        assert_eq!(p.integral(), 0.0);
    }

    #[test]
    fn holding_setpoint_settles_to_integral_only_output() {
        let mut p = pid(IntegratorMode::Always);
        for _ in 0..11 {
            p.update(40.0, 35.0);
        }
        let integral = p.integral();
        // Error collapses to zero; output is Ki * I from here on.
        let out = (0..50)
            .map(|_| p.update(40.0, 40.0))
            .last()
            .unwrap_or(f64::NAN);
        let expected = 0.0008 * integral;
        assert!((out - expected).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&out));
        assert!(!p.saturated());
    }

    #[test]
    fn conditional_mode_freezes_integral_while_clamped() {
        let mut always = pid(IntegratorMode::Always);
        let mut conditional = pid(IntegratorMode::Conditional);
        for p in [&mut always, &mut conditional] {
            p.update(45.0, 40.0);
            for _ in 0..5 {
                p.update(45.0, 36.0);
            }
        }
        // kp * 9 = 0.54 stays in range, so both integrate alike so far.
        assert_eq!(always.integral(), conditional.integral());

        let mut gains = PidCfg {
            kp: 1.0,
            ..PidCfg::default()
        };
        gains.integrator = IntegratorMode::Conditional;
        let mut hot = PidController::new(gains).unwrap();
        hot.update(45.0, 40.0);
        hot.update(45.0, 40.0);
        assert!(hot.saturated());
        let frozen = hot.integral();
        hot.update(45.0, 40.0);
        assert_eq!(hot.integral(), frozen);
    }

    #[rstest]
    #[case(f64::NAN, 0.7)]
    #[case(0.1, 0.0)]
    #[case(0.1, -1.0)]
    #[case(f64::INFINITY, 0.7)]
    fn rejects_bad_gains(#[case] kp: f64, #[case] dt_s: f64) {
        let cfg = PidCfg {
            kp,
            dt_s,
            ..PidCfg::default()
        };
        assert!(PidController::new(cfg).is_err());
    }
}

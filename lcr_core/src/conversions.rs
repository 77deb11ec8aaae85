//! `From` implementations bridging `lcr_config` types to `lcr_core` types.

use crate::config::{
    IntegratorMode, LinkTiming, PidCfg, ProfileKind, RunCfg, RunPlan, SegmentDurations,
    SetpointCfg,
};
use crate::error::BuildError;

// ── PidCfg ───────────────────────────────────────────────────────────────────

impl From<lcr_config::IntegratorMode> for IntegratorMode {
    fn from(m: lcr_config::IntegratorMode) -> Self {
        match m {
            lcr_config::IntegratorMode::Always => Self::Always,
            lcr_config::IntegratorMode::Conditional => Self::Conditional,
        }
    }
}

impl From<&lcr_config::PidCfg> for PidCfg {
    fn from(c: &lcr_config::PidCfg) -> Self {
        Self {
            kp: c.kp,
            ki: c.ki,
            kd: c.kd,
            dt_s: c.dt_s,
            integral_band: c.integral_band,
            integrator: c.integrator.into(),
        }
    }
}

// ── LinkTiming ───────────────────────────────────────────────────────────────

impl From<&lcr_config::LcrCfg> for LinkTiming {
    fn from(c: &lcr_config::LcrCfg) -> Self {
        Self {
            frame_period_s: c.frame_period_s,
            byte_time_s: c.byte_time_s,
            drift_tolerance_s: c.drift_tolerance_s,
            stale_timeout_s: c.stale_timeout_s,
        }
    }
}

// ── RunCfg ───────────────────────────────────────────────────────────────────

impl From<&lcr_config::RunnerCfg> for RunCfg {
    fn from(c: &lcr_config::RunnerCfg) -> Self {
        Self {
            iterations: c.iterations,
            poll_ms: c.poll_ms,
        }
    }
}

// ── SetpointCfg ──────────────────────────────────────────────────────────────

impl From<&lcr_config::SetpointCfg> for SetpointCfg {
    fn from(c: &lcr_config::SetpointCfg) -> Self {
        let kind = match c.profile {
            lcr_config::Profile::Step => ProfileKind::Step,
            lcr_config::Profile::Linear => ProfileKind::Linear,
        };
        let durations = match &c.durations_s {
            lcr_config::Durations::Uniform(d) => SegmentDurations::Uniform(*d),
            lcr_config::Durations::PerSegment(ds) => SegmentDurations::PerSegment(ds.clone()),
        };
        Self {
            kind,
            values: c.values.clone(),
            durations,
        }
    }
}

// ── RunPlan ──────────────────────────────────────────────────────────────────

impl TryFrom<&lcr_config::Config> for RunPlan {
    type Error = BuildError;

    fn try_from(c: &lcr_config::Config) -> Result<Self, Self::Error> {
        let trajectory = SetpointCfg::from(&c.setpoint).build()?;
        Ok(Self {
            pid: PidCfg::from(&c.pid),
            timing: LinkTiming::from(&c.lcr),
            run: RunCfg::from(&c.runner),
            trajectory,
        })
    }
}

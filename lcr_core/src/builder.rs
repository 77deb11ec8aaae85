//! Type-state builder for the boxed `Acquisition` loop.

use std::marker::PhantomData;
use std::sync::Arc;

use lcr_traits::{ByteLink, Chamber, Clock, MonotonicClock};

use crate::config::{RunCfg, RunPlan, validate_run, validate_timing};
use crate::core::AcquisitionCore;
use crate::error::{BuildError, Result};
use crate::link::LinkTiming;
use crate::pid::{PidCfg, PidController};
use crate::setpoint::Trajectory;

/// Acquisition loop over boxed devices, as produced by [`AcquisitionBuilder`].
pub type Acquisition = AcquisitionCore<Box<dyn ByteLink>, Box<dyn Chamber>>;

// Type-state markers
pub struct Missing;
pub struct Set;

/// Builder for `Acquisition`. LCR link, chamber and trajectory are mandatory;
/// everything else falls back to defaults. All values are validated on build.
pub struct AcquisitionBuilder<L, C, T> {
    link: Option<Box<dyn ByteLink>>,
    chamber: Option<Box<dyn Chamber>>,
    trajectory: Option<Trajectory>,
    pid: Option<PidCfg>,
    timing: Option<LinkTiming>,
    run: Option<RunCfg>,
    stop_check: Option<Box<dyn Fn() -> bool>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _l: PhantomData<L>,
    _c: PhantomData<C>,
    _t: PhantomData<T>,
}

impl Default for AcquisitionBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            link: None,
            chamber: None,
            trajectory: None,
            pid: None,
            timing: None,
            run: None,
            stop_check: None,
            clock: None,
            _l: PhantomData,
            _c: PhantomData,
            _t: PhantomData,
        }
    }
}

impl Acquisition {
    /// Start building an `Acquisition`.
    pub fn builder() -> AcquisitionBuilder<Missing, Missing, Missing> {
        AcquisitionBuilder::default()
    }
}

impl<L, C, T> AcquisitionBuilder<L, C, T> {
    fn retag<L2, C2, T2>(self) -> AcquisitionBuilder<L2, C2, T2> {
        AcquisitionBuilder {
            link: self.link,
            chamber: self.chamber,
            trajectory: self.trajectory,
            pid: self.pid,
            timing: self.timing,
            run: self.run,
            stop_check: self.stop_check,
            clock: self.clock,
            _l: PhantomData,
            _c: PhantomData,
            _t: PhantomData,
        }
    }

    pub fn with_pid(mut self, pid: PidCfg) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn with_link_timing(mut self, timing: LinkTiming) -> Self {
        self.timing = Some(timing);
        self
    }

    pub fn with_run(mut self, run: RunCfg) -> Self {
        self.run = Some(run);
        self
    }

    /// Cooperative cancellation, polled once per tick.
    pub fn with_stop_check<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        self.stop_check = Some(Box::new(f));
        self
    }

    /// Provide a custom clock implementation; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Apply pid, timing and run settings from a plan; the trajectory is set separately.
    pub fn with_plan_settings(self, plan: &RunPlan) -> Self {
        self.with_pid(plan.pid)
            .with_link_timing(plan.timing)
            .with_run(plan.run)
    }

    /// Fallible build available in any type-state; returns `BuildError` for missing pieces.
    pub fn try_build(self) -> Result<Acquisition> {
        let link = self
            .link
            .ok_or_else(|| eyre::Report::new(BuildError::MissingLink))?;
        let chamber = self
            .chamber
            .ok_or_else(|| eyre::Report::new(BuildError::MissingChamber))?;
        let trajectory = self
            .trajectory
            .ok_or_else(|| eyre::Report::new(BuildError::MissingTrajectory))?;
        let timing = self.timing.unwrap_or_default();
        let run = self.run.unwrap_or_default();
        validate_timing(&timing).map_err(eyre::Report::new)?;
        validate_run(&run).map_err(eyre::Report::new)?;
        let pid = PidController::new(self.pid.unwrap_or_default()).map_err(eyre::Report::new)?;
        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(b) => Arc::from(b),
            None => Arc::new(MonotonicClock::new()),
        };

        Ok(AcquisitionCore::new(
            link,
            chamber,
            timing,
            pid,
            trajectory,
            run,
            clock,
            self.stop_check,
        ))
    }
}

// Setters that advance type-state when providing mandatory components
impl<C, T> AcquisitionBuilder<Missing, C, T> {
    pub fn with_link(mut self, link: impl ByteLink + 'static) -> AcquisitionBuilder<Set, C, T> {
        self.link = Some(Box::new(link));
        self.retag()
    }
}

impl<L, T> AcquisitionBuilder<L, Missing, T> {
    pub fn with_chamber(
        mut self,
        chamber: impl Chamber + 'static,
    ) -> AcquisitionBuilder<L, Set, T> {
        self.chamber = Some(Box::new(chamber));
        self.retag()
    }
}

impl<L, C> AcquisitionBuilder<L, C, Missing> {
    pub fn with_trajectory(mut self, trajectory: Trajectory) -> AcquisitionBuilder<L, C, Set> {
        self.trajectory = Some(trajectory);
        self.retag()
    }
}

impl AcquisitionBuilder<Set, Set, Set> {
    /// Validate and build. Only available once link, chamber and trajectory are set.
    pub fn build(self) -> Result<Acquisition> {
        self.try_build()
    }
}

/// Build a statically-dispatched core from concrete devices and a plan.
pub fn build_acquisition<L, C>(
    link: L,
    chamber: C,
    plan: RunPlan,
    clock: Arc<dyn Clock + Send + Sync>,
    stop_check: Option<Box<dyn Fn() -> bool>>,
) -> Result<AcquisitionCore<L, C>>
where
    L: ByteLink,
    C: Chamber,
{
    validate_timing(&plan.timing).map_err(eyre::Report::new)?;
    validate_run(&plan.run).map_err(eyre::Report::new)?;
    let pid = PidController::new(plan.pid).map_err(eyre::Report::new)?;
    Ok(AcquisitionCore::new(
        link,
        chamber,
        plan.timing,
        pid,
        plan.trajectory,
        plan.run,
        clock,
        stop_check,
    ))
}

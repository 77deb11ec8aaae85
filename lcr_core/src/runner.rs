//! Drive an acquisition to its outcome and hand the record to a sink exactly once.

use std::sync::Arc;

use eyre::WrapErr;
use lcr_traits::{ByteLink, Chamber, Clock, MonotonicClock};

use crate::builder::build_acquisition;
use crate::config::RunPlan;
use crate::core::AcquisitionCore;
use crate::error::Result;
use crate::record::{RunRecord, RunSink};
use crate::status::{RunOutcome, RunStatus};

/// Owns a running core and finalizes its record on every exit path.
///
/// Dropping an unfinished session (early `?` return or panic unwinding) still
/// delivers the record, marked [`RunOutcome::Interrupted`] unless an outcome
/// was already reached.
pub struct Session<'a, L: ByteLink, C: Chamber> {
    core: AcquisitionCore<L, C>,
    sink: &'a mut dyn RunSink,
    finalized: bool,
}

impl<'a, L: ByteLink, C: Chamber> Session<'a, L, C> {
    pub fn new(core: AcquisitionCore<L, C>, sink: &'a mut dyn RunSink) -> Self {
        Self {
            core,
            sink,
            finalized: false,
        }
    }

    pub fn core(&self) -> &AcquisitionCore<L, C> {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut AcquisitionCore<L, C> {
        &mut self.core
    }

    /// Hand the record to the sink and return it.
    pub fn finalize(mut self) -> Result<RunRecord> {
        self.finalized = true;
        let record = self.core.record().clone();
        self.sink.finish(&record).wrap_err("saving run data")?;
        Ok(record)
    }
}

impl<L: ByteLink, C: Chamber> Drop for Session<'_, L, C> {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        let record = self.core.record_mut();
        record.outcome.get_or_insert(RunOutcome::Interrupted);
        if let Err(e) = self.sink.finish(self.core.record()) {
            tracing::error!(error = %e, "saving run data failed");
        }
    }
}

/// Run until an outcome is reached, using the real monotonic clock.
pub fn run<L, C>(
    link: L,
    chamber: C,
    plan: RunPlan,
    sink: &mut dyn RunSink,
    stop_check: Option<Box<dyn Fn() -> bool>>,
) -> Result<RunRecord>
where
    L: ByteLink,
    C: Chamber,
{
    run_with_clock(
        link,
        chamber,
        plan,
        sink,
        stop_check,
        Arc::new(MonotonicClock::new()),
    )
}

/// Run until an outcome is reached.
///
/// Faults and cancellation are outcomes recorded in the returned record.
/// `Err` means a device call failed; the sink has still received the record.
pub fn run_with_clock<L, C>(
    link: L,
    chamber: C,
    plan: RunPlan,
    sink: &mut dyn RunSink,
    stop_check: Option<Box<dyn Fn() -> bool>>,
    clock: Arc<dyn Clock + Send + Sync>,
) -> Result<RunRecord>
where
    L: ByteLink,
    C: Chamber,
{
    let core = build_acquisition(link, chamber, plan, clock, stop_check)?;
    let mut session = Session::new(core, sink);
    session.core_mut().begin();

    loop {
        match session.core_mut().step()? {
            RunStatus::Running => continue,
            RunStatus::Complete | RunStatus::Aborted(_) => break,
        }
    }
    session.finalize()
}

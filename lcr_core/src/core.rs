//! The acquisition/control tick: poll both devices, enforce link health and
//! constant meter settings, drive the chamber, and record the series.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use eyre::WrapErr;
use lcr_protocol::Configuration;
use lcr_traits::{ByteLink, Chamber, Clock};

use crate::config::RunCfg;
use crate::error::{AbortReason, AcqError, Result};
use crate::frame::FrameDecoder;
use crate::hw_error::map_hw_error;
use crate::pid::PidController;
use crate::record::RunRecord;
use crate::setpoint::Trajectory;
use crate::status::{RunOutcome, RunStatus};

/// Minimum spacing of the `info` status line while a run is in progress.
const STATUS_INTERVAL_S: f64 = 10.0;

/// Acquisition loop state over a concrete LCR link and chamber.
pub struct AcquisitionCore<L: ByteLink, C: Chamber> {
    link: L,
    chamber: C,
    decoder: FrameDecoder,
    pid: PidController,
    trajectory: Trajectory,
    run: RunCfg,
    clock: Arc<dyn Clock + Send + Sync>,
    // All link and trajectory times are seconds since this instant.
    epoch: Instant,
    start_s: f64,
    stop_check: Option<Box<dyn Fn() -> bool>>,
    reference: Option<Configuration>,
    record: RunRecord,
    // Reused receive buffer for one tick's worth of link bytes.
    rx: Vec<u8>,
    latched: Option<Latched>,
    last_status_s: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
enum Latched {
    Complete,
    Aborted(AbortReason),
}

impl<L: ByteLink, C: Chamber> std::fmt::Debug for AcquisitionCore<L, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquisitionCore")
            .field("synchronized", &self.decoder.is_synchronized())
            .field("fault", &self.decoder.fault())
            .field("reference", &self.reference)
            .field("outcome", &self.record.outcome)
            .finish_non_exhaustive()
    }
}

impl<L: ByteLink, C: Chamber> AcquisitionCore<L, C> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        link: L,
        chamber: C,
        decoder_timing: crate::link::LinkTiming,
        pid: PidController,
        trajectory: Trajectory,
        run: RunCfg,
        clock: Arc<dyn Clock + Send + Sync>,
        stop_check: Option<Box<dyn Fn() -> bool>>,
    ) -> Self {
        let epoch = clock.now();
        Self {
            link,
            chamber,
            decoder: FrameDecoder::new(decoder_timing, 0.0),
            pid,
            trajectory,
            run,
            clock,
            epoch,
            start_s: 0.0,
            stop_check,
            reference: None,
            record: RunRecord::new(SystemTime::now()),
            rx: Vec::with_capacity(256),
            latched: None,
            last_status_s: None,
        }
    }

    /// Mark the start of the run; the trajectory clock starts here.
    pub fn begin(&mut self) {
        self.start_s = self.now_s();
        self.record = RunRecord::new(SystemTime::now());
        self.reference = None;
        self.latched = None;
        self.last_status_s = None;
        tracing::info!(
            period_s = self.trajectory.period(),
            iterations = self.run.iterations,
            "acquisition start"
        );
    }

    pub fn record(&self) -> &RunRecord {
        &self.record
    }

    pub(crate) fn record_mut(&mut self) -> &mut RunRecord {
        &mut self.record
    }

    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    /// Meter settings every frame of this run must match.
    pub fn reference(&self) -> Option<&Configuration> {
        self.reference.as_ref()
    }

    /// Terminal outcome, once reached.
    pub fn outcome(&self) -> Option<RunOutcome> {
        self.record.outcome
    }

    fn now_s(&self) -> f64 {
        self.clock.secs_since(self.epoch)
    }

    fn report_status(&mut self, elapsed_s: f64) {
        if self
            .last_status_s
            .is_some_and(|t| elapsed_s - t < STATUS_INTERVAL_S)
        {
            return;
        }
        self.last_status_s = Some(elapsed_s);
        let r = &self.record;
        let quantity = |q: Option<&'static str>| q.unwrap_or("-");
        tracing::info!(
            elapsed_s,
            setpoint = ?r.setpoint.last(),
            temperature = ?r.temperature.last(),
            power = ?r.power.last(),
            quantity1 = quantity(r.configuration.and_then(|c| c.quantity1).map(|q| q.symbol())),
            measurement1 = ?r.measurement1.last(),
            quantity2 = quantity(r.configuration.and_then(|c| c.quantity2).map(|q| q.symbol())),
            measurement2 = ?r.measurement2.last(),
            "status"
        );
    }

    fn latch(&mut self, latched: Latched) -> RunStatus {
        let outcome = match latched {
            Latched::Complete => RunOutcome::NormalCompletion,
            Latched::Aborted(reason) => RunOutcome::from_reason(reason),
        };
        if self.latched.is_none() {
            match latched {
                Latched::Complete => tracing::info!(
                    duration_s = self.record.duration_s,
                    frames = self.record.measurement1.len(),
                    samples = self.record.temperature.len(),
                    "acquisition complete"
                ),
                Latched::Aborted(reason) => {
                    tracing::warn!(%reason, outcome = %outcome, "acquisition aborted");
                }
            }
        }
        self.latched = Some(latched);
        self.record.outcome = Some(outcome);
        self.record.lcr_fault = self.decoder.fault();
        match latched {
            Latched::Complete => RunStatus::Complete,
            Latched::Aborted(reason) => RunStatus::Aborted(AcqError::Abort(reason)),
        }
    }

    /// One iteration of the acquisition loop.
    pub fn step(&mut self) -> Result<RunStatus> {
        if let Some(latched) = self.latched {
            return Ok(self.latch(latched));
        }

        if self.stop_check.as_ref().is_some_and(|f| f()) {
            return Ok(self.latch(Latched::Aborted(AbortReason::Cancelled)));
        }

        // 1) poll both devices
        let samples = self
            .chamber
            .read()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("reading chamber")?;
        self.rx.clear();
        self.link
            .read_available(&mut self.rx)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("reading LCR link")?;
        let now = self.now_s();
        let records = self.decoder.poll(&self.rx, now);

        // 2) link health
        if self.chamber.error() {
            return Ok(self.latch(Latched::Aborted(AbortReason::ChamberLink)));
        }
        if let Some(kind) = self.decoder.fault() {
            return Ok(self.latch(Latched::Aborted(AbortReason::LcrLink(kind))));
        }

        // 3) meter settings must not change mid-run; until the reference is
        // locked the first record of this poll stands in for it
        let reference = self
            .reference
            .or_else(|| records.first().map(|r| r.configuration()));
        let changed = reference.and_then(|reference| {
            records
                .iter()
                .map(|r| r.configuration())
                .find(|cfg| *cfg != reference)
                .map(|observed| (reference, observed))
        });
        if let Some((reference, observed)) = changed {
            tracing::warn!(?reference, ?observed, "LCR configuration changed");
            return Ok(self.latch(Latched::Aborted(AbortReason::ConfigurationChanged)));
        }

        // 4) trajectory finished?
        let elapsed = now - self.start_s;
        self.record.duration_s = elapsed;
        if self.trajectory.iteration(elapsed) >= self.run.iterations {
            return Ok(self.latch(Latched::Complete));
        }

        // 5) control on the newest chamber sample
        if let Some(&latest) = samples.last() {
            let setpoint = self.trajectory.value(elapsed);
            let power = self.pid.update(setpoint, latest);
            self.chamber
                .write(power)
                .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
                .wrap_err("writing chamber power")?;
            self.record.push_chamber(&samples, setpoint, power);
            tracing::debug!(
                elapsed_s = elapsed,
                setpoint,
                temperature = latest,
                power,
                saturated = self.pid.saturated(),
                "chamber update"
            );
        }

        // 6) measurements
        if let (None, Some(cfg)) = (self.reference, reference) {
            tracing::info!(
                frequency_hz = ?cfg.frequency.hz(),
                quantity1 = cfg.quantity1.map_or("-", |q| q.symbol()),
                quantity2 = cfg.quantity2.map_or("-", |q| q.symbol()),
                "LCR configuration locked"
            );
            self.reference = Some(cfg);
            self.record.configuration = Some(cfg);
        }
        for rec in &records {
            self.record.push_measurement(rec);
        }
        if let Some(last) = records.last() {
            tracing::debug!(
                elapsed_s = elapsed,
                m1 = last.measurement1,
                m2 = ?last.measurement2,
                frames = records.len(),
                "LCR update"
            );
        }
        self.report_status(elapsed);

        tracing::trace!(elapsed_s = elapsed, "tick");
        self.clock.sleep(Duration::from_millis(self.run.poll_ms));
        Ok(RunStatus::Running)
    }
}

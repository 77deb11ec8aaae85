//! Time series accumulated over a run and the sink that persists them.

use std::time::SystemTime;

use lcr_protocol::{Configuration, MeasurementRecord};

use crate::error::{AbortReason, Result};
use crate::link::FaultKind;
use crate::status::RunOutcome;

/// Everything recorded during one run.
///
/// Chamber series (`setpoint`, `temperature`, `power`) always have equal
/// length. `measurement2` is filled only when the run's configuration has a
/// secondary quantity.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub started_at: SystemTime,
    /// Seconds from run start to the last tick.
    pub duration_s: f64,
    /// Meter settings of the first decoded frame.
    pub configuration: Option<Configuration>,
    pub setpoint: Vec<f64>,
    pub temperature: Vec<f64>,
    pub power: Vec<f64>,
    pub measurement1: Vec<f64>,
    pub measurement2: Vec<f64>,
    pub outcome: Option<RunOutcome>,
    pub lcr_fault: Option<FaultKind>,
}

impl RunRecord {
    pub fn new(started_at: SystemTime) -> Self {
        Self {
            started_at,
            duration_s: 0.0,
            configuration: None,
            setpoint: Vec::new(),
            temperature: Vec::new(),
            power: Vec::new(),
            measurement1: Vec::new(),
            measurement2: Vec::new(),
            outcome: None,
            lcr_fault: None,
        }
    }

    /// Append a batch of chamber samples controlled with `(setpoint, power)`.
    ///
    /// Only the newest sample drove the controller; older ones in the batch
    /// repeat the previous pair (zeros before the first).
    pub fn push_chamber(&mut self, samples: &[f64], setpoint: f64, power: f64) {
        if samples.is_empty() {
            return;
        }
        let last_sp = self.setpoint.last().copied().unwrap_or(0.0);
        let last_p = self.power.last().copied().unwrap_or(0.0);
        for _ in 1..samples.len() {
            self.setpoint.push(last_sp);
            self.power.push(last_p);
        }
        self.setpoint.push(setpoint);
        self.power.push(power);
        self.temperature.extend_from_slice(samples);
    }

    pub fn push_measurement(&mut self, rec: &MeasurementRecord) {
        self.measurement1.push(rec.measurement1);
        if let Some(m2) = rec.measurement2 {
            self.measurement2.push(m2);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.temperature.is_empty() && self.measurement1.is_empty()
    }

    /// Why the run stopped early, if it did. `None` for a normal completion,
    /// an unfinished run, or an interrupted one.
    pub fn abort_reason(&self) -> Option<AbortReason> {
        match self.outcome? {
            RunOutcome::ChamberLinkFault => Some(AbortReason::ChamberLink),
            RunOutcome::LcrLinkFault => self.lcr_fault.map(AbortReason::LcrLink),
            RunOutcome::ConfigurationChanged => Some(AbortReason::ConfigurationChanged),
            RunOutcome::Cancelled => Some(AbortReason::Cancelled),
            RunOutcome::NormalCompletion | RunOutcome::Interrupted => None,
        }
    }
}

/// Destination for a finished run. Called exactly once per run.
pub trait RunSink {
    fn finish(&mut self, record: &RunRecord) -> Result<()>;
}

impl<T: RunSink + ?Sized> RunSink for &mut T {
    fn finish(&mut self, record: &RunRecord) -> Result<()> {
        (**self).finish(record)
    }
}

/// Sink that discards the record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RunSink for NullSink {
    fn finish(&mut self, _record: &RunRecord) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batched_samples_repeat_previous_control_pair() {
        let mut r = RunRecord::new(SystemTime::UNIX_EPOCH);
        r.push_chamber(&[20.0, 20.5], 25.0, 0.4);
        assert_eq!(r.setpoint, vec![0.0, 25.0]);
        assert_eq!(r.power, vec![0.0, 0.4]);
        r.push_chamber(&[21.0, 21.2, 21.4], 26.0, 0.6);
        assert_eq!(r.setpoint, vec![0.0, 25.0, 25.0, 25.0, 26.0]);
        assert_eq!(r.power, vec![0.0, 0.4, 0.4, 0.4, 0.6]);
        assert_eq!(r.temperature.len(), r.setpoint.len());
    }

    #[test]
    fn empty_batch_is_ignored() {
        let mut r = RunRecord::new(SystemTime::UNIX_EPOCH);
        r.push_chamber(&[], 25.0, 0.4);
        assert!(r.is_empty());
    }

    #[test]
    fn abort_reason_follows_outcome() {
        let mut r = RunRecord::new(SystemTime::UNIX_EPOCH);
        assert_eq!(r.abort_reason(), None);
        r.outcome = Some(RunOutcome::LcrLinkFault);
        r.lcr_fault = Some(FaultKind::Desync);
        assert_eq!(r.abort_reason(), Some(AbortReason::LcrLink(FaultKind::Desync)));
        r.outcome = Some(RunOutcome::NormalCompletion);
        assert_eq!(r.abort_reason(), None);
        r.outcome = Some(RunOutcome::Cancelled);
        assert_eq!(r.abort_reason(), Some(AbortReason::Cancelled));
    }
}

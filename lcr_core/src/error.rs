use thiserror::Error;

use crate::link::FaultKind;

/// Why a run stopped before its trajectory completed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    #[error("temperature chamber data link error")]
    ChamberLink,
    #[error("LCR data link error ({0})")]
    LcrLink(FaultKind),
    #[error("LCR settings changed during the run")]
    ConfigurationChanged,
    #[error("cancelled by operator")]
    Cancelled,
}

#[derive(Debug, Error, Clone)]
pub enum AcqError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for device")]
    Timeout,
    #[error("aborted: {0}")]
    Abort(AbortReason),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing LCR link")]
    MissingLink,
    #[error("missing chamber")]
    MissingChamber,
    #[error("missing setpoint trajectory")]
    MissingTrajectory,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

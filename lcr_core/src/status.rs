//! Status returned from each acquisition tick and the terminal run outcome.

use crate::error::{AbortReason, AcqError};

/// Public status of a single step of the acquisition loop.
#[derive(Debug)]
pub enum RunStatus {
    /// Keep going; trajectory not finished.
    Running,
    /// Iteration limit reached.
    Complete,
    /// Stopped with a typed error; no further ticks should be issued.
    Aborted(AcqError),
}

/// Terminal result of a run, fixed once reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    NormalCompletion,
    ChamberLinkFault,
    LcrLinkFault,
    ConfigurationChanged,
    Cancelled,
    /// The loop exited through an unexpected error before reaching an outcome.
    Interrupted,
}

impl RunOutcome {
    pub fn from_reason(reason: AbortReason) -> Self {
        match reason {
            AbortReason::ChamberLink => Self::ChamberLinkFault,
            AbortReason::LcrLink(_) => Self::LcrLinkFault,
            AbortReason::ConfigurationChanged => Self::ConfigurationChanged,
            AbortReason::Cancelled => Self::Cancelled,
        }
    }

    /// Stable snake_case name for logs and persisted metadata.
    pub fn name(self) -> &'static str {
        match self {
            Self::NormalCompletion => "normal_completion",
            Self::ChamberLinkFault => "chamber_link_fault",
            Self::LcrLinkFault => "lcr_link_fault",
            Self::ConfigurationChanged => "configuration_changed",
            Self::Cancelled => "cancelled",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::NormalCompletion)
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

//! Timing-based health accounting for the LCR byte link.
//!
//! The meter streams frames at a fixed cadence and the link carries bytes at a
//! fixed rate, so the arrival time of the partial frame at the tail of the
//! buffer tells us when that frame started. Comparing consecutive frame starts
//! against the number of frames extracted in between reveals silently lost
//! frames. A link that delivers nothing for too long is declared stale.

use lcr_protocol::FRAME_LEN;

/// Timing constants of the meter's stream, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkTiming {
    /// Nominal interval between frame starts.
    pub frame_period_s: f64,
    /// Transmission time of a single byte.
    pub byte_time_s: f64,
    /// Allowed excess of observed over expected frame-start spacing.
    pub drift_tolerance_s: f64,
    /// Silence after which the link is considered dead.
    pub stale_timeout_s: f64,
}

impl Default for LinkTiming {
    fn default() -> Self {
        Self {
            frame_period_s: 0.5024,
            byte_time_s: 0.0177,
            drift_tolerance_s: 0.3,
            stale_timeout_s: 5.0,
        }
    }
}

/// First reason the link was declared faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Frame markers were wrong where a frame was expected.
    Desync,
    /// Frame starts drifted further apart than the extracted frames explain.
    FrameLoss,
    /// No bytes arrived within the stale timeout.
    Stale,
}

impl FaultKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Desync => "desync",
            Self::FrameLoss => "frame_loss",
            Self::Stale => "stale",
        }
    }
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Sticky fault latch plus the drift and staleness bookkeeping behind it.
#[derive(Debug, Clone)]
pub struct LinkMonitor {
    timing: LinkTiming,
    last_receive_s: f64,
    last_frame_start_s: Option<f64>,
    frames_since_check: u64,
    fault: Option<FaultKind>,
}

impl LinkMonitor {
    /// Start monitoring a link opened at `opened_at_s`; the stale timer runs from there.
    pub fn new(timing: LinkTiming, opened_at_s: f64) -> Self {
        Self {
            timing,
            last_receive_s: opened_at_s,
            last_frame_start_s: None,
            frames_since_check: 0,
            fault: None,
        }
    }

    pub fn timing(&self) -> &LinkTiming {
        &self.timing
    }

    pub fn fault(&self) -> Option<FaultKind> {
        self.fault
    }

    pub fn is_faulted(&self) -> bool {
        self.fault.is_some()
    }

    pub fn last_receive_s(&self) -> f64 {
        self.last_receive_s
    }

    pub fn note_arrival(&mut self, now_s: f64) {
        self.last_receive_s = now_s;
    }

    /// Latch `kind` unless a fault is already recorded.
    pub fn trip(&mut self, kind: FaultKind) {
        if self.fault.is_none() {
            tracing::warn!(fault = %kind, "LCR link faulted");
            self.fault = Some(kind);
        }
    }

    pub fn count_frame(&mut self) {
        self.frames_since_check += 1;
    }

    /// Compare the start time of the partial frame at the tail of a synchronised
    /// buffer of `buffered` bytes against the previous one.
    ///
    /// Runs only after at least one frame was extracted since the last passing
    /// check, or before any reference exists.
    pub fn check_drift(&mut self, buffered: usize, now_s: f64) {
        if self.is_faulted()
            || (self.frames_since_check == 0 && self.last_frame_start_s.is_some())
        {
            return;
        }
        let section = buffered % FRAME_LEN;
        if section == 0 {
            return;
        }
        let frame_start = now_s - section as f64 * self.timing.byte_time_s;
        if let Some(previous) = self.last_frame_start_s {
            let frames = self.frames_since_check + (buffered / FRAME_LEN) as u64;
            let expected = frames as f64 * self.timing.frame_period_s;
            let excess = (frame_start - previous) - expected;
            if excess < self.timing.drift_tolerance_s {
                self.frames_since_check = 0;
            } else {
                tracing::debug!(excess, frames, "frame start drift exceeds tolerance");
                self.trip(FaultKind::FrameLoss);
            }
        }
        self.last_frame_start_s = Some(frame_start);
    }

    pub fn check_stale(&mut self, now_s: f64) {
        if now_s - self.last_receive_s > self.timing.stale_timeout_s {
            self.trip(FaultKind::Stale);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_after_timeout_only() {
        let mut m = LinkMonitor::new(LinkTiming::default(), 10.0);
        m.check_stale(15.0);
        assert!(!m.is_faulted());
        m.check_stale(15.01);
        assert_eq!(m.fault(), Some(FaultKind::Stale));
    }

    #[test]
    fn first_fault_reason_sticks() {
        let mut m = LinkMonitor::new(LinkTiming::default(), 0.0);
        m.trip(FaultKind::Desync);
        m.trip(FaultKind::Stale);
        assert_eq!(m.fault(), Some(FaultKind::Desync));
    }

    #[test]
    fn drift_check_needs_a_reference() {
        let t = LinkTiming::default();
        let mut m = LinkMonitor::new(t, 0.0);
        // First partial frame only records its start.
        m.check_drift(1, t.byte_time_s);
        assert!(!m.is_faulted());
        // No frame extracted since: skipped entirely, even if far in the future.
        m.check_drift(2, 100.0);
        assert!(!m.is_faulted());
        // One frame later and one period after the first start: fine.
        m.count_frame();
        m.check_drift(1, t.frame_period_s + t.byte_time_s);
        assert!(!m.is_faulted());
    }

    #[test]
    fn missing_period_trips_frame_loss() {
        let t = LinkTiming::default();
        let mut m = LinkMonitor::new(t, 0.0);
        m.count_frame();
        m.check_drift(1, t.byte_time_s);
        // Two periods elapsed but only one frame was seen.
        m.check_drift(1, 2.0 * t.frame_period_s + t.byte_time_s);
        assert_eq!(m.fault(), Some(FaultKind::FrameLoss));
    }

    #[test]
    fn aligned_buffer_is_not_checked() {
        let mut m = LinkMonitor::new(LinkTiming::default(), 0.0);
        m.check_drift(FRAME_LEN * 3, 1.0);
        m.count_frame();
        m.check_drift(FRAME_LEN, 50.0);
        assert!(!m.is_faulted());
    }
}

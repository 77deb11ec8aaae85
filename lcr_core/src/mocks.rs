//! Test and helper mocks for lcr_core: a manual clock and scripted devices
//! that follow it.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use lcr_protocol::FRAME_LEN;
use lcr_traits::{ByteLink, Chamber, Clock, DeviceError};

use crate::error::Result;
use crate::link::LinkTiming;
use crate::record::{RunRecord, RunSink};

/// Clock that only moves when slept on or advanced explicitly.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off += d;
        }
    }

    /// Seconds since the clock was created.
    pub fn elapsed_s(&self) -> f64 {
        self.offset.lock().map_or(0.0, |off| off.as_secs_f64())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let off = self.offset.lock().map_or(Duration::ZERO, |off| *off);
        self.base + off
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

/// Arrival schedule for `frames` sent back to back: byte `j` of frame `n`
/// lands at `start + n * frame_period + (j + 1) * byte_time`.
pub fn frame_schedule(
    frames: &[[u8; FRAME_LEN]],
    start_s: f64,
    timing: &LinkTiming,
) -> Vec<(f64, u8)> {
    let (period, byte_time) = (timing.frame_period_s, timing.byte_time_s);
    frames
        .iter()
        .enumerate()
        .flat_map(|(n, frame)| {
            frame.iter().enumerate().map(move |(j, &b)| {
                let at = start_s + n as f64 * period + (j + 1) as f64 * byte_time;
                (at, b)
            })
        })
        .collect()
}

/// LCR link that releases scheduled bytes once the shared clock passes their time.
#[derive(Debug)]
pub struct TimedLink {
    clock: ManualClock,
    bytes: VecDeque<(f64, u8)>,
}

impl TimedLink {
    pub fn new(clock: ManualClock, schedule: Vec<(f64, u8)>) -> Self {
        Self {
            clock,
            bytes: schedule.into(),
        }
    }
}

impl ByteLink for TimedLink {
    fn read_available(&mut self, buf: &mut Vec<u8>) -> std::result::Result<usize, DeviceError> {
        let now = self.clock.elapsed_s();
        let mut n = 0;
        while let Some(&(at, b)) = self.bytes.front() {
            if at > now {
                break;
            }
            buf.push(b);
            self.bytes.pop_front();
            n += 1;
        }
        Ok(n)
    }
}

/// Chamber that returns one scripted batch per read and records every write.
#[derive(Debug, Default)]
pub struct ScriptedChamber {
    batches: VecDeque<Vec<f64>>,
    writes: Arc<Mutex<Vec<f64>>>,
    fail_after: Option<usize>,
    reads: usize,
}

impl ScriptedChamber {
    pub fn new(batches: Vec<Vec<f64>>) -> Self {
        Self {
            batches: batches.into(),
            ..Self::default()
        }
    }

    /// Report a link error once this many reads have happened.
    pub fn failing_after(mut self, reads: usize) -> Self {
        self.fail_after = Some(reads);
        self
    }

    /// Shared handle to the power commands written so far.
    pub fn writes(&self) -> Arc<Mutex<Vec<f64>>> {
        Arc::clone(&self.writes)
    }
}

impl Chamber for ScriptedChamber {
    fn read(&mut self) -> std::result::Result<Vec<f64>, DeviceError> {
        self.reads += 1;
        Ok(self.batches.pop_front().unwrap_or_default())
    }

    fn write(&mut self, power: f64) -> std::result::Result<(), DeviceError> {
        if let Ok(mut w) = self.writes.lock() {
            w.push(power);
        }
        Ok(())
    }

    fn error(&self) -> bool {
        self.fail_after.is_some_and(|n| self.reads >= n)
    }
}

/// Sink that keeps every record it receives.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<RunRecord>>>,
}

impl MemorySink {
    pub fn records(&self) -> Vec<RunRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl RunSink for MemorySink {
    fn finish(&mut self, record: &RunRecord) -> Result<()> {
        if let Ok(mut r) = self.records.lock() {
            r.push(record.clone());
        }
        Ok(())
    }
}

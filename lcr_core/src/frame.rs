//! Stateful frame extraction from the LCR byte stream.

use std::collections::VecDeque;

use lcr_protocol::{FRAME_LEN, MeasurementRecord, decode_frame, has_markers};

use crate::link::{FaultKind, LinkMonitor, LinkTiming};

/// Buffers link bytes, keeps frame alignment, and decodes complete frames.
///
/// One decoder lives for one link session. Once faulted it stays faulted; the
/// caller is expected to stop acquisition.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    buf: VecDeque<u8>,
    synchronized: bool,
    monitor: LinkMonitor,
}

impl FrameDecoder {
    /// Decoder for a link opened at `opened_at_s` (seconds on the caller's clock).
    pub fn new(timing: LinkTiming, opened_at_s: f64) -> Self {
        Self {
            buf: VecDeque::with_capacity(FRAME_LEN * 4),
            synchronized: false,
            monitor: LinkMonitor::new(timing, opened_at_s),
        }
    }

    pub fn is_synchronized(&self) -> bool {
        self.synchronized
    }

    pub fn is_faulted(&self) -> bool {
        self.monitor.is_faulted()
    }

    pub fn fault(&self) -> Option<FaultKind> {
        self.monitor.fault()
    }

    /// Bytes held back waiting for sync or for the rest of a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn monitor(&self) -> &LinkMonitor {
        &self.monitor
    }

    /// Feed the bytes that arrived since the previous poll and collect every
    /// complete frame now available. Never blocks.
    pub fn poll(&mut self, bytes: &[u8], now_s: f64) -> Vec<MeasurementRecord> {
        let mut records = Vec::new();

        if !bytes.is_empty() {
            self.monitor.note_arrival(now_s);
            self.buf.extend(bytes);

            if !self.synchronized {
                self.acquire_sync();
            }

            if self.synchronized {
                self.monitor.check_drift(self.buf.len(), now_s);
                self.extract(&mut records);
            }
        }

        self.monitor.check_stale(now_s);
        records
    }

    fn acquire_sync(&mut self) {
        if self.buf.len() < FRAME_LEN {
            return;
        }
        let bytes = self.buf.make_contiguous();
        if let Some(offset) = lcr_protocol::find_sync(bytes) {
            if offset > 0 {
                tracing::debug!(skipped = offset, "LCR stream synchronised");
            }
            self.buf.drain(..offset);
            self.synchronized = true;
        }
    }

    fn extract(&mut self, records: &mut Vec<MeasurementRecord>) {
        while self.buf.len() >= FRAME_LEN {
            let mut frame = [0u8; FRAME_LEN];
            for (dst, src) in frame.iter_mut().zip(self.buf.iter()) {
                *dst = *src;
            }
            if !has_markers(&frame) {
                tracing::debug!(buffered = self.buf.len(), "frame markers lost");
                self.synchronized = false;
                self.monitor.trip(FaultKind::Desync);
                break;
            }
            self.buf.drain(..FRAME_LEN);
            self.monitor.count_frame();
            let record = decode_frame(&frame);
            tracing::trace!(m1 = record.measurement1, m2 = ?record.measurement2, "frame decoded");
            records.push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lcr_protocol::{
        Circuit, FrameFields, Frequency, PrimaryQuantity, Reading, SecondaryQuantity,
        encode_frame,
    };

    fn frame(mantissa: u16) -> [u8; FRAME_LEN] {
        encode_frame(&FrameFields::new(
            Frequency::Hz10k,
            PrimaryQuantity::Capacitance(Circuit::Series),
            Reading {
                mantissa,
                exponent: 1,
                scale: 10,
            },
            Some(SecondaryQuantity::QualityFactor),
            Reading {
                mantissa: 412,
                exponent: 1,
                scale: 0,
            },
        ))
    }

    #[test]
    fn waits_for_a_full_window_before_syncing() {
        let mut d = FrameDecoder::new(LinkTiming::default(), 0.0);
        let f = frame(1000);
        assert!(d.poll(&f[..10], 0.2).is_empty());
        assert!(!d.is_synchronized());
        assert_eq!(d.buffered(), 10);
        let out = d.poll(&f[10..], 0.4);
        assert_eq!(out.len(), 1);
        assert!(d.is_synchronized());
        assert_eq!(d.buffered(), 0);
    }

    #[test]
    fn junk_before_first_frame_is_discarded() {
        let mut d = FrameDecoder::new(LinkTiming::default(), 0.0);
        let mut bytes = vec![0x41, 0x0A, 0x0D];
        bytes.extend_from_slice(&frame(1200));
        let out = d.poll(&bytes, 0.5);
        assert_eq!(out.len(), 1);
        assert!((out[0].measurement1 - 120.0e-9).abs() < 1e-15);
        assert!(!d.is_faulted());
    }

    #[test]
    fn corruption_after_sync_faults_and_drops_sync() {
        let mut d = FrameDecoder::new(LinkTiming::default(), 0.0);
        let mut bytes = frame(1).to_vec();
        let mut bad = frame(2);
        bad[0] = 0x55;
        bytes.extend_from_slice(&bad);
        let out = d.poll(&bytes, 0.5);
        assert_eq!(out.len(), 1);
        assert!(!d.is_synchronized());
        assert_eq!(d.fault(), Some(FaultKind::Desync));
        // The unconsumed bytes are kept for the next scan.
        assert_eq!(d.buffered(), FRAME_LEN);
    }

    #[test]
    fn empty_polls_only_age_the_link() {
        let mut d = FrameDecoder::new(LinkTiming::default(), 0.0);
        assert_eq!(d.poll(&frame(5), 0.3).len(), 1);
        assert!(d.poll(&[], 5.2).is_empty());
        assert!(!d.is_faulted());
        assert!(d.poll(&[], 5.4).is_empty());
        assert_eq!(d.fault(), Some(FaultKind::Stale));
    }

    #[test]
    fn silence_from_open_counts_as_stale() {
        let mut d = FrameDecoder::new(LinkTiming::default(), 2.0);
        d.poll(&[], 7.5);
        assert_eq!(d.fault(), Some(FaultKind::Stale));
    }
}

#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Wire format of the LCR meter's measurement stream.
//!
//! The meter emits one fixed-size frame roughly every half second:
//!
//! ```text
//! byte  0    1    2      3        4   5    6..7  8         9   10   11..12 13  14        15   16
//!      0x00 0x0D flags  freq<<5   -   q1   m1    exp|scl   -   q2   m2     -   exp|scl   0x0D 0x0A
//! ```
//!
//! `flags` bit 7 selects the parallel equivalent circuit (series otherwise).
//! Each mantissa is big-endian; its decimal exponent sits in bits 2..0 and the
//! scale code in bits 7..3 of the exponent byte.
//!
//! This crate is stateless. Synchronisation, loss detection and staleness are
//! handled by the stateful decoder in `lcr_core`.

use serde::{Serialize, Serializer};

/// Fixed frame length in bytes.
pub const FRAME_LEN: usize = 17;
/// Header bytes at offsets 0 and 1.
pub const HEADER: [u8; 2] = [0x00, 0x0D];
/// Trailer bytes at offsets 15 and 16.
pub const TRAILER: [u8; 2] = [0x0D, 0x0A];

const FLAGS: usize = 2;
const FREQUENCY: usize = 3;
const QUANTITY_1: usize = 5;
const MANTISSA_1: usize = 6;
const EXPONENT_1: usize = 8;
const QUANTITY_2: usize = 10;
const MANTISSA_2: usize = 11;
const EXPONENT_2: usize = 14;

const PARALLEL_BIT: u8 = 0x80;

/// True when the first [`FRAME_LEN`] bytes of `window` carry valid header and trailer markers.
/// Shorter windows never match.
#[inline]
pub fn has_markers(window: &[u8]) -> bool {
    window.len() >= FRAME_LEN
        && window[0] == HEADER[0]
        && window[1] == HEADER[1]
        && window[15] == TRAILER[0]
        && window[16] == TRAILER[1]
}

/// First offset at which a marker-valid frame starts, if any.
pub fn find_sync(buf: &[u8]) -> Option<usize> {
    if buf.len() < FRAME_LEN {
        return None;
    }
    (0..=buf.len() - FRAME_LEN).find(|&i| has_markers(&buf[i..]))
}

/// Test-signal frequency selected on the meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Hz100,
    Hz120,
    Hz1k,
    Hz10k,
    Hz100k,
    /// DC measurement (reported as 0 Hz).
    Dc,
    Unknown,
}

impl Frequency {
    pub fn from_code(code: u8) -> Self {
        match code & 0x07 {
            0 => Self::Hz100,
            1 => Self::Hz120,
            2 => Self::Hz1k,
            3 => Self::Hz10k,
            4 => Self::Hz100k,
            5 => Self::Dc,
            _ => Self::Unknown,
        }
    }

    /// Frequency in hertz; `None` when the selector is not recognised.
    pub fn hz(self) -> Option<u32> {
        match self {
            Self::Hz100 => Some(100),
            Self::Hz120 => Some(120),
            Self::Hz1k => Some(1_000),
            Self::Hz10k => Some(10_000),
            Self::Hz100k => Some(100_000),
            Self::Dc => Some(0),
            Self::Unknown => None,
        }
    }
}

impl Serialize for Frequency {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self.hz() {
            Some(hz) => s.serialize_u32(hz),
            None => s.serialize_none(),
        }
    }
}

/// Equivalent circuit model the meter uses for the reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Circuit {
    Series,
    Parallel,
}

/// Quantity shown on the primary display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimaryQuantity {
    Inductance(Circuit),
    Capacitance(Circuit),
    Resistance(Circuit),
    DcResistance,
}

impl PrimaryQuantity {
    pub fn from_code(code: u8, circuit: Circuit) -> Option<Self> {
        match code {
            1 => Some(Self::Inductance(circuit)),
            2 => Some(Self::Capacitance(circuit)),
            3 => Some(Self::Resistance(circuit)),
            4 => Some(Self::DcResistance),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Inductance(_) => 1,
            Self::Capacitance(_) => 2,
            Self::Resistance(_) => 3,
            Self::DcResistance => 4,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Inductance(Circuit::Series) => "Ls",
            Self::Inductance(Circuit::Parallel) => "Lp",
            Self::Capacitance(Circuit::Series) => "Cs",
            Self::Capacitance(Circuit::Parallel) => "Cp",
            Self::Resistance(Circuit::Series) => "Rs",
            Self::Resistance(Circuit::Parallel) => "Rp",
            Self::DcResistance => "R",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Self::Inductance(_) => "H",
            Self::Capacitance(_) => "F",
            Self::Resistance(_) | Self::DcResistance => "\u{03A9}",
        }
    }
}

impl Serialize for PrimaryQuantity {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.symbol())
    }
}

/// Quantity shown on the secondary display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecondaryQuantity {
    DissipationFactor,
    QualityFactor,
    Resistance(Circuit),
    PhaseAngle,
}

impl SecondaryQuantity {
    pub fn from_code(code: u8, circuit: Circuit) -> Option<Self> {
        match code {
            1 => Some(Self::DissipationFactor),
            2 => Some(Self::QualityFactor),
            3 => Some(Self::Resistance(circuit)),
            4 => Some(Self::PhaseAngle),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::DissipationFactor => 1,
            Self::QualityFactor => 2,
            Self::Resistance(_) => 3,
            Self::PhaseAngle => 4,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::DissipationFactor => "DF",
            Self::QualityFactor => "Q",
            Self::Resistance(Circuit::Series) => "Rs",
            Self::Resistance(Circuit::Parallel) => "Rp",
            Self::PhaseAngle => "\u{03B8}",
        }
    }

    /// Display unit; dimensionless quantities return an empty string.
    pub fn unit(self) -> &'static str {
        match self {
            Self::Resistance(_) => "\u{03A9}",
            Self::PhaseAngle => "\u{00B0}",
            Self::DissipationFactor | Self::QualityFactor => "",
        }
    }
}

impl Serialize for SecondaryQuantity {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.symbol())
    }
}

/// Multiplier selected by the 5-bit scale code.
pub fn scale_factor(code: u8) -> f64 {
    match code {
        9 => 1e-12,
        10 => 1e-9,
        5 | 11 => 1e-6,
        6 | 12 => 1e-3,
        2 | 8 => 1e3,
        3 => 1e6,
        _ => 1.0,
    }
}

/// One raw display reading: mantissa, decimal exponent and scale code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reading {
    pub mantissa: u16,
    /// Number of decimal places, 0..=7.
    pub exponent: u8,
    /// Scale code, 0..=31.
    pub scale: u8,
}

impl Reading {
    fn from_bytes(hi: u8, lo: u8, exp_scale: u8) -> Self {
        Self {
            mantissa: u16::from_be_bytes([hi, lo]),
            exponent: exp_scale & 0x07,
            scale: exp_scale >> 3,
        }
    }

    fn exp_scale_byte(self) -> u8 {
        (self.scale << 3) | (self.exponent & 0x07)
    }

    /// Reconstructed magnitude in SI units.
    pub fn value(self) -> f64 {
        f64::from(self.mantissa) * 10f64.powi(-i32::from(self.exponent)) * scale_factor(self.scale)
    }
}

/// The part of a record that must stay constant across a characterization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Configuration {
    pub frequency: Frequency,
    pub quantity1: Option<PrimaryQuantity>,
    pub quantity2: Option<SecondaryQuantity>,
}

/// One decoded measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeasurementRecord {
    pub frequency: Frequency,
    pub quantity1: Option<PrimaryQuantity>,
    pub measurement1: f64,
    pub quantity2: Option<SecondaryQuantity>,
    /// Present exactly when `quantity2` is.
    pub measurement2: Option<f64>,
}

impl MeasurementRecord {
    pub fn configuration(&self) -> Configuration {
        Configuration {
            frequency: self.frequency,
            quantity1: self.quantity1,
            quantity2: self.quantity2,
        }
    }
}

/// Decode one frame. Markers are not checked here; callers establish sync first.
pub fn decode_frame(frame: &[u8; FRAME_LEN]) -> MeasurementRecord {
    let circuit = if frame[FLAGS] & PARALLEL_BIT != 0 {
        Circuit::Parallel
    } else {
        Circuit::Series
    };
    let frequency = Frequency::from_code(frame[FREQUENCY] >> 5);
    let quantity1 = PrimaryQuantity::from_code(frame[QUANTITY_1], circuit);
    let primary = Reading::from_bytes(
        frame[MANTISSA_1],
        frame[MANTISSA_1 + 1],
        frame[EXPONENT_1],
    );
    let quantity2 = SecondaryQuantity::from_code(frame[QUANTITY_2], circuit);
    let measurement2 = quantity2.map(|_| {
        Reading::from_bytes(
            frame[MANTISSA_2],
            frame[MANTISSA_2 + 1],
            frame[EXPONENT_2],
        )
        .value()
    });

    MeasurementRecord {
        frequency,
        quantity1,
        measurement1: primary.value(),
        quantity2,
        measurement2,
    }
}

/// Raw field values for building a frame (simulators, tests, fuzzing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameFields {
    /// 3-bit frequency selector.
    pub frequency: u8,
    pub parallel: bool,
    pub quantity1: u8,
    pub primary: Reading,
    pub quantity2: u8,
    pub secondary: Reading,
}

impl FrameFields {
    /// Fields that decode to the given configuration and readings.
    pub fn new(
        frequency: Frequency,
        quantity1: PrimaryQuantity,
        primary: Reading,
        quantity2: Option<SecondaryQuantity>,
        secondary: Reading,
    ) -> Self {
        let frequency = match frequency {
            Frequency::Hz100 => 0,
            Frequency::Hz120 => 1,
            Frequency::Hz1k => 2,
            Frequency::Hz10k => 3,
            Frequency::Hz100k => 4,
            Frequency::Dc => 5,
            Frequency::Unknown => 7,
        };
        let parallel = matches!(
            quantity1,
            PrimaryQuantity::Inductance(Circuit::Parallel)
                | PrimaryQuantity::Capacitance(Circuit::Parallel)
                | PrimaryQuantity::Resistance(Circuit::Parallel)
        ) || matches!(quantity2, Some(SecondaryQuantity::Resistance(Circuit::Parallel)));
        Self {
            frequency,
            parallel,
            quantity1: quantity1.code(),
            primary,
            quantity2: quantity2.map_or(0, SecondaryQuantity::code),
            secondary,
        }
    }
}

/// Build a marker-valid frame from raw fields.
pub fn encode_frame(fields: &FrameFields) -> [u8; FRAME_LEN] {
    let mut f = [0u8; FRAME_LEN];
    f[0] = HEADER[0];
    f[1] = HEADER[1];
    if fields.parallel {
        f[FLAGS] |= PARALLEL_BIT;
    }
    f[FREQUENCY] = (fields.frequency & 0x07) << 5;
    f[QUANTITY_1] = fields.quantity1;
    let [hi, lo] = fields.primary.mantissa.to_be_bytes();
    f[MANTISSA_1] = hi;
    f[MANTISSA_1 + 1] = lo;
    f[EXPONENT_1] = fields.primary.exp_scale_byte();
    f[QUANTITY_2] = fields.quantity2;
    let [hi, lo] = fields.secondary.mantissa.to_be_bytes();
    f[MANTISSA_2] = hi;
    f[MANTISSA_2 + 1] = lo;
    f[EXPONENT_2] = fields.secondary.exp_scale_byte();
    f[15] = TRAILER[0];
    f[16] = TRAILER[1];
    f
}

/// Result of decoding an offline capture.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub records: Vec<MeasurementRecord>,
    /// Bytes skipped while searching for sync, including unterminated tail bytes.
    pub skipped: usize,
    /// Times the stream lost sync after a frame had been accepted.
    pub resyncs: usize,
}

/// Decode every frame in a complete capture, re-synchronising after corruption.
/// No timing checks are applied.
pub fn scan_frames(bytes: &[u8]) -> ScanReport {
    let mut report = ScanReport::default();
    let mut pos = 0;
    let mut synced = false;
    while pos < bytes.len() {
        if !synced {
            match find_sync(&bytes[pos..]) {
                Some(offset) => {
                    report.skipped += offset;
                    pos += offset;
                    synced = true;
                }
                None => {
                    report.skipped += bytes.len() - pos;
                    break;
                }
            }
        }
        let rest = &bytes[pos..];
        if rest.len() < FRAME_LEN {
            report.skipped += rest.len();
            break;
        }
        if !has_markers(rest) {
            synced = false;
            report.resyncs += 1;
            report.skipped += 1;
            pos += 1;
            continue;
        }
        let mut frame = [0u8; FRAME_LEN];
        frame.copy_from_slice(&rest[..FRAME_LEN]);
        report.records.push(decode_frame(&frame));
        pos += FRAME_LEN;
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn capacitance_frame() -> [u8; FRAME_LEN] {
        encode_frame(&FrameFields::new(
            Frequency::Hz1k,
            PrimaryQuantity::Capacitance(Circuit::Parallel),
            Reading {
                mantissa: 4_700,
                exponent: 2,
                scale: 10,
            },
            Some(SecondaryQuantity::DissipationFactor),
            Reading {
                mantissa: 125,
                exponent: 4,
                scale: 0,
            },
        ))
    }

    #[test]
    fn decodes_primary_and_secondary() {
        let rec = decode_frame(&capacitance_frame());
        assert_eq!(rec.frequency, Frequency::Hz1k);
        assert_eq!(
            rec.quantity1,
            Some(PrimaryQuantity::Capacitance(Circuit::Parallel))
        );
        assert!((rec.measurement1 - 47.0e-9).abs() < 1e-18);
        assert_eq!(rec.quantity2, Some(SecondaryQuantity::DissipationFactor));
        let m2 = rec.measurement2.unwrap_or(f64::NAN);
        assert!((m2 - 0.0125).abs() < 1e-12);
    }

    #[test]
    fn unknown_secondary_drops_measurement2() {
        let mut frame = capacitance_frame();
        frame[QUANTITY_2] = 9;
        let rec = decode_frame(&frame);
        assert_eq!(rec.quantity2, None);
        assert_eq!(rec.measurement2, None);
    }

    #[test]
    fn unknown_primary_keeps_measurement1() {
        let mut frame = capacitance_frame();
        frame[QUANTITY_1] = 0;
        let rec = decode_frame(&frame);
        assert_eq!(rec.quantity1, None);
        assert!(rec.measurement1 > 0.0);
    }

    #[rstest]
    #[case(0, Some(100))]
    #[case(1, Some(120))]
    #[case(2, Some(1_000))]
    #[case(3, Some(10_000))]
    #[case(4, Some(100_000))]
    #[case(5, Some(0))]
    #[case(6, None)]
    #[case(7, None)]
    fn frequency_selector(#[case] code: u8, #[case] hz: Option<u32>) {
        let mut frame = capacitance_frame();
        frame[FREQUENCY] = code << 5 | 0x1F;
        assert_eq!(decode_frame(&frame).frequency.hz(), hz);
    }

    #[rstest]
    #[case(9, 1e-12)]
    #[case(10, 1e-9)]
    #[case(5, 1e-6)]
    #[case(11, 1e-6)]
    #[case(6, 1e-3)]
    #[case(12, 1e-3)]
    #[case(2, 1e3)]
    #[case(8, 1e3)]
    #[case(3, 1e6)]
    #[case(0, 1.0)]
    #[case(31, 1.0)]
    fn scale_codes(#[case] code: u8, #[case] factor: f64) {
        assert_eq!(scale_factor(code), factor);
    }

    #[test]
    fn series_suffix_when_flag_clear() {
        let mut frame = capacitance_frame();
        frame[FLAGS] = 0;
        frame[QUANTITY_2] = 3;
        let rec = decode_frame(&frame);
        assert_eq!(
            rec.quantity1,
            Some(PrimaryQuantity::Capacitance(Circuit::Series))
        );
        assert_eq!(
            rec.quantity2,
            Some(SecondaryQuantity::Resistance(Circuit::Series))
        );
        assert_eq!(rec.quantity2.map(SecondaryQuantity::symbol), Some("Rs"));
    }

    #[test]
    fn find_sync_skips_junk() {
        let mut buf = vec![0x0D, 0x0A, 0x55, 0x00];
        buf.extend_from_slice(&capacitance_frame());
        assert_eq!(find_sync(&buf), Some(4));
        assert_eq!(find_sync(&buf[..FRAME_LEN]), None);
    }

    #[test]
    fn scan_recovers_after_corrupted_frame() {
        let good = capacitance_frame();
        let mut bad = good;
        bad[16] = 0xFF;
        let mut capture = vec![0xAA, 0xBB];
        capture.extend_from_slice(&good);
        capture.extend_from_slice(&bad);
        capture.extend_from_slice(&good);
        capture.extend_from_slice(&good[..5]);

        let report = scan_frames(&capture);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.resyncs, 1);
        assert_eq!(report.skipped, 2 + FRAME_LEN + 5);
    }

    #[test]
    fn configuration_serializes_as_symbols_and_hz() {
        let cfg = decode_frame(&capacitance_frame()).configuration();
        let json = serde_json::to_value(cfg).unwrap_or_default();
        assert_eq!(json["frequency"], 1_000);
        assert_eq!(json["quantity1"], "Cp");
        assert_eq!(json["quantity2"], "DF");
    }
}

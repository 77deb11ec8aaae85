use lcr_core::mocks::frame_schedule;
use lcr_core::{FRAME_LEN, FaultKind, FrameDecoder, LinkTiming, MeasurementRecord, scan_frames};
use lcr_protocol::{
    Circuit, FrameFields, Frequency, PrimaryQuantity, Reading, SecondaryQuantity, encode_frame,
};
use proptest::prelude::*;
use rstest::rstest;

fn frame(mantissa: u16) -> [u8; FRAME_LEN] {
    encode_frame(&FrameFields::new(
        Frequency::Hz1k,
        PrimaryQuantity::Inductance(Circuit::Series),
        Reading {
            mantissa,
            exponent: 3,
            scale: 6,
        },
        Some(SecondaryQuantity::QualityFactor),
        Reading {
            mantissa: 321,
            exponent: 1,
            scale: 0,
        },
    ))
}

fn frames(n: usize) -> Vec<[u8; FRAME_LEN]> {
    (0..n).map(|i| frame(1_000 + i as u16)).collect()
}

/// Feed the schedule in consecutive chunks, polling at the arrival time of
/// each chunk's last byte.
fn feed_chunked(
    decoder: &mut FrameDecoder,
    schedule: &[(f64, u8)],
    sizes: &[usize],
) -> Vec<MeasurementRecord> {
    let mut out = Vec::new();
    let mut pos = 0;
    let mut k = 0;
    while pos < schedule.len() {
        let size = sizes[k % sizes.len()].max(1);
        let end = (pos + size).min(schedule.len());
        let bytes: Vec<u8> = schedule[pos..end].iter().map(|&(_, b)| b).collect();
        let now = schedule[end - 1].0;
        out.extend(decoder.poll(&bytes, now));
        pos = end;
        k += 1;
    }
    out
}

#[rstest]
#[case::byte_by_byte(vec![1])]
#[case::all_at_once(vec![usize::MAX])]
#[case::whole_frames(vec![FRAME_LEN])]
#[case::ragged(vec![3, 20, 1, 7])]
fn five_frames_decode_without_fault(#[case] sizes: Vec<usize>) {
    let timing = LinkTiming::default();
    let fs = frames(5);
    let schedule = frame_schedule(&fs, 0.0, &timing);
    let mut d = FrameDecoder::new(timing, 0.0);
    let records = feed_chunked(&mut d, &schedule, &sizes);
    assert_eq!(records.len(), 5);
    assert!(!d.is_faulted(), "fault: {:?}", d.fault());
    assert!(d.is_synchronized());
    assert_eq!(d.buffered(), 0);
}

#[test]
fn dropped_frame_trips_frame_loss() {
    let timing = LinkTiming::default();
    let fs = frames(6);
    let schedule: Vec<(f64, u8)> = frame_schedule(&fs, 0.0, &timing)
        .into_iter()
        .enumerate()
        .filter(|(i, _)| i / FRAME_LEN != 3)
        .map(|(_, e)| e)
        .collect();
    let mut d = FrameDecoder::new(timing, 0.0);
    let records = feed_chunked(&mut d, &schedule, &[1]);
    assert_eq!(d.fault(), Some(FaultKind::FrameLoss));
    // Frames up to the gap were still delivered.
    assert!(records.len() >= 3);
}

#[test]
fn silence_after_traffic_goes_stale() {
    let timing = LinkTiming::default();
    let schedule = frame_schedule(&frames(2), 0.0, &timing);
    let mut d = FrameDecoder::new(timing, 0.0);
    feed_chunked(&mut d, &schedule, &[4]);
    let last = schedule[schedule.len() - 1].0;
    assert_eq!(d.monitor().last_receive_s(), last);
    assert!(d.poll(&[], last + 4.9).is_empty());
    // Empty polls do not count as traffic.
    assert_eq!(d.monitor().last_receive_s(), last);
    assert!(!d.is_faulted());
    d.poll(&[], last + 5.1);
    assert_eq!(d.fault(), Some(FaultKind::Stale));
}

#[test]
fn fault_is_sticky_even_when_frames_resume() {
    let timing = LinkTiming::default();
    let mut d = FrameDecoder::new(timing, 0.0);
    d.poll(&[], 6.0);
    assert!(d.is_faulted());
    let out = d.poll(&frame(7), 6.5);
    assert_eq!(out.len(), 1);
    assert_eq!(d.fault(), Some(FaultKind::Stale));
}

proptest! {
    #[test]
    fn chunking_does_not_change_records(
        n in 1usize..8,
        sizes in proptest::collection::vec(1usize..40, 1..6),
    ) {
        let timing = LinkTiming::default();
        let fs = frames(n);
        let schedule = frame_schedule(&fs, 0.0, &timing);
        let bytes: Vec<u8> = schedule.iter().map(|&(_, b)| b).collect();
        let expected = scan_frames(&bytes).records;

        let mut d = FrameDecoder::new(timing, 0.0);
        let got = feed_chunked(&mut d, &schedule, &sizes);
        prop_assert_eq!(got, expected);
        prop_assert!(!d.is_faulted());
    }

    #[test]
    fn junk_before_first_frame_is_dropped(
        junk in proptest::collection::vec(1u8..=255, 0..40),
        m in any::<u16>(),
    ) {
        let mut bytes = junk;
        bytes.extend_from_slice(&frame(m));
        let mut d = FrameDecoder::new(LinkTiming::default(), 0.0);
        let got = d.poll(&bytes, 0.4);
        prop_assert_eq!(got.len(), 1);
        prop_assert_eq!(d.buffered(), 0);
        prop_assert!(d.is_synchronized());
    }
}

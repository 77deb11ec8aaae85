use lcr_protocol::{
    FRAME_LEN, FrameFields, Reading, decode_frame, encode_frame, find_sync, has_markers,
    scan_frames,
};
use proptest::prelude::*;

prop_compose! {
    fn fields_strategy()(
        frequency in 0u8..8,
        parallel in any::<bool>(),
        quantity1 in 0u8..6,
        quantity2 in 0u8..6,
        m1 in any::<u16>(),
        e1 in 0u8..8,
        s1 in 0u8..32,
        m2 in any::<u16>(),
        e2 in 0u8..8,
        s2 in 0u8..32,
    ) -> FrameFields {
        FrameFields {
            frequency,
            parallel,
            quantity1,
            primary: Reading { mantissa: m1, exponent: e1, scale: s1 },
            quantity2,
            secondary: Reading { mantissa: m2, exponent: e2, scale: s2 },
        }
    }
}

proptest! {
    #[test]
    fn decoding_is_deterministic(fields in fields_strategy()) {
        let frame = encode_frame(&fields);
        prop_assert!(has_markers(&frame));
        let a = decode_frame(&frame);
        let b = decode_frame(&frame);
        // NaN never appears: mantissa and factors are finite.
        prop_assert_eq!(a, b);
        prop_assert_eq!(a.quantity2.is_some(), a.measurement2.is_some());
    }

    #[test]
    fn sync_lands_on_injected_offset(
        fields in fields_strategy(),
        // 0x00 never appears in the junk, so no header can start inside it.
        junk in proptest::collection::vec(1u8..=255, 0..64),
    ) {
        let frame = encode_frame(&fields);
        let mut buf = junk.clone();
        buf.extend_from_slice(&frame);
        prop_assert_eq!(find_sync(&buf), Some(junk.len()));

        let report = scan_frames(&buf);
        prop_assert_eq!(report.records.len(), 1);
        prop_assert_eq!(report.skipped, junk.len());
    }
}

#[test]
fn short_buffers_never_sync() {
    let frame = encode_frame(&FrameFields::default());
    for len in 0..FRAME_LEN {
        assert_eq!(find_sync(&frame[..len]), None);
    }
}

#![no_main]
use libfuzzer_sys::fuzz_target;
use lcr_core::{FRAME_LEN, FrameDecoder, LinkTiming, scan_frames};

fuzz_target!(|data: &[u8]| {
    let Some((&chunk, stream)) = data.split_first() else {
        return;
    };
    let chunk = usize::from(chunk).max(1);

    // Offline scan and live decoding both take arbitrary bytes.
    let report = scan_frames(stream);
    assert!(report.records.len() <= stream.len() / FRAME_LEN);

    let timing = LinkTiming::default();
    let mut decoder = FrameDecoder::new(timing, 0.0);
    let mut decoded = 0;
    for (i, part) in stream.chunks(chunk).enumerate() {
        let now = i as f64 * timing.byte_time_s * chunk as f64;
        decoded += decoder.poll(part, now).len();
        assert!(decoder.buffered() < FRAME_LEN || !decoder.is_synchronized() || decoder.is_faulted());
    }
    assert!(decoded <= stream.len() / FRAME_LEN);
});

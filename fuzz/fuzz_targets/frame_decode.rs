//! Arbitrary bytes never panic the decoder, and anything that decodes
//! re-encodes to the same frame.

#![no_main]

use libfuzzer_sys::fuzz_target;
use trafficlink_proto::{ChecksumMode, build_frame, decode_frame};

fuzz_target!(|data: &[u8]| {
    let Some((&selector, frame)) = data.split_first() else {
        return;
    };
    let wrap = selector & 1 == 1;
    let mode = match (selector >> 1) % 3 {
        0 => ChecksumMode::None,
        1 => ChecksumMode::Xor7,
        _ => ChecksumMode::Sum8,
    };

    if let Ok(payload) = decode_frame(frame, wrap, mode) {
        assert_eq!(build_frame(payload, wrap, mode), frame);
    }
});

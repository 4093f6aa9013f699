#![no_main]

use libfuzzer_sys::fuzz_target;
use proofa_realtime::protocol::decode_frame;

fuzz_target!(|data: &[u8]| {
    // Must never panic, with or without a size limit.
    let _ = decode_frame(data, None);
    let _ = decode_frame(data, Some(64));
});

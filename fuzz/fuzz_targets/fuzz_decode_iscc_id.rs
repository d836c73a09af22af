#![no_main]
#![forbid(unsafe_code)]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Best-effort: decoding arbitrary strings must never panic, only error.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = iscc_hub::core::codec::decode_iscc_id(s);
        let _ = iscc_hub::core::codec::parse_iscc_code(s);
    }
});

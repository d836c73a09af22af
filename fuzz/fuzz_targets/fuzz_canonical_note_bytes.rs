#![no_main]
#![forbid(unsafe_code)]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary JSON (or garbage) must never panic the canonicalizer, only error.
    let _ = iscc_hub::core::canonical::canonical_note_bytes(data);
});

#![no_main]
#![forbid(unsafe_code)]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use iscc_hub::core::types::{IsccNote, NoteSignature};
use iscc_hub::core::validator::validate_note;

#[derive(Clone, Debug, Arbitrary)]
struct Input {
    iscc_code: String,
    datahash: String,
    nonce: String,
    timestamp: String,
    pubkey: String,
    proof: String,
    gateway: Option<String>,
    server_id: u16,
}

fuzz_target!(|inp: Input| {
    let note = IsccNote {
        iscc_code: inp.iscc_code,
        datahash: inp.datahash,
        nonce: inp.nonce,
        timestamp: inp.timestamp,
        gateway: inp.gateway,
        units: None,
        metahash: None,
        signature: NoteSignature {
            version: 1,
            pubkey: inp.pubkey,
            proof: inp.proof,
            controller: None,
            keyid: None,
        },
    };
    let Ok(bytes) = serde_json::to_vec(&note) else {
        return;
    };
    // No well-formed input here can ever produce a valid signature; this
    // target only checks that malformed/adversarial field content is
    // always rejected cleanly rather than panicking.
    let _ = validate_note(&note, &bytes, inp.server_id, 600);
});

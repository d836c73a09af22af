// Copyright (c) 2026 ISCC HUB Contributors
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]

//! End-to-end scenarios against the full Validator -> Sequencer -> Receipt
//! Issuer pipeline, one test per declared scenario plus a concurrency
//! invariant sweep.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use iscc_hub::core::canonical::canonical_note_bytes;
use iscc_hub::core::error::DeclareError;
use iscc_hub::core::ingress::IngressFacade;
use iscc_hub::core::receipt::ReceiptIssuer;
use iscc_hub::core::security::keystore::{FileEd25519Backend, Keystore};
use iscc_hub::core::sequencer::Sequencer;
use iscc_hub::core::store::{EventStore, SledEventStore};
use iscc_hub::core::types::{IsccNote, NoteSignature};
use iscc_hub::monitoring::Metrics;

use ring::signature::{Ed25519KeyPair, KeyPair};

/// Builds nonce bytes whose first 12 bits encode `server_id`, matching the
/// gateway's nonce-prefix convention.
fn nonce_for(server_id: u16, salt: u8) -> [u8; 16] {
    let mut nonce = [0u8; 16];
    nonce[0] = (server_id >> 4) as u8;
    nonce[1] = (((server_id & 0x0F) << 4) as u8) | (salt >> 4);
    nonce[2] = salt;
    nonce
}

/// Signs a fresh note addressed at `server_id`, with caller-controlled
/// timestamp and nonce salt, returning the verbatim bytes a client would send.
fn build_note(server_id: u16, salt: u8, timestamp: &str) -> Vec<u8> {
    let rng = ring::rand::SystemRandom::new();
    let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
    let keypair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap();
    let pubkey_hex = hex::encode(keypair.public_key().as_ref());
    let nonce_hex = hex::encode(nonce_for(server_id, salt));

    let unsigned = serde_json::json!({
        "iscc_code": "ISCC:AAAQAAFH3BQ4U",
        "datahash": format!("1e20{}", "00".repeat(32)),
        "nonce": nonce_hex,
        "timestamp": timestamp,
        "signature": { "version": 1, "pubkey": pubkey_hex, "proof": "00".repeat(64) }
    });
    let unsigned_bytes = serde_json::to_vec(&unsigned).unwrap();
    let signing_bytes = canonical_note_bytes(&unsigned_bytes).unwrap();
    let sig = keypair.sign(&signing_bytes);

    let note = IsccNote {
        iscc_code: "ISCC:AAAQAAFH3BQ4U".to_string(),
        datahash: format!("1e20{}", "00".repeat(32)),
        nonce: nonce_hex,
        timestamp: timestamp.to_string(),
        gateway: None,
        units: None,
        metahash: None,
        signature: NoteSignature {
            version: 1,
            pubkey: pubkey_hex,
            proof: hex::encode(sig.as_ref()),
            controller: None,
            keyid: None,
        },
    };
    serde_json::to_vec(&note).unwrap()
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn facade_with_clock(
    server_id: u16,
    clock: iscc_hub::core::sequencer::ClockFn,
) -> (tempfile::TempDir, IngressFacade<FileEd25519Backend>) {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn EventStore> =
        Arc::new(SledEventStore::open(dir.path().join("db").to_str().unwrap()).unwrap());
    let sequencer = Sequencer::spawn_with_clock(store.clone(), server_id, 64, clock);
    let ks = Keystore::open(dir.path().join("hub.key").to_str().unwrap()).unwrap();
    let receipts = ReceiptIssuer::new(ks, "hub.example".to_string());
    let metrics = Metrics::new().unwrap();
    let facade = IngressFacade::new(store, sequencer, receipts, server_id, 600, metrics);
    (dir, facade)
}

fn facade(server_id: u16) -> (tempfile::TempDir, IngressFacade<FileEd25519Backend>) {
    facade_with_clock(server_id, iscc_hub::core::sequencer::system_now_us)
}

/// Scenario 1: a well-formed note addressed at this HUB's `server_id` is
/// admitted, minted `seq == 1`, and comes back with a receipt that verifies
/// under the HUB's own public key.
#[tokio::test]
async fn scenario_happy_path() {
    let (_dir, facade) = facade(1);
    let note_bytes = build_note(1, 0x0F, &now_rfc3339());

    let receipt = facade.declare(note_bytes).await.unwrap();

    assert_eq!(receipt.credential_subject.seq, 1);
    let event = facade.get_by_seq(1).unwrap().unwrap();
    assert_eq!(event.iscc_id & 0xFFF, 1);
    assert_eq!(event.iscc_id >> 12, event.ts_us);

    let mut pubkey = [0u8; 32];
    pubkey.copy_from_slice(&hex::decode(facade.public_key_hex()).unwrap());
    receipt.verify(&pubkey).unwrap();
}

/// Scenario 2: a note whose nonce prefix targets a different `server_id`
/// than the receiving HUB is rejected before it ever reaches the sequencer.
#[tokio::test]
async fn scenario_wrong_hub() {
    let (_dir, facade) = facade(1);
    let note_bytes = build_note(2, 0x0A, &now_rfc3339());

    let err = facade.declare(note_bytes).await.unwrap_err();
    assert!(matches!(err, DeclareError::WrongHub));
    assert_eq!(err.status_hint(), 422);
    assert_eq!(facade.get_by_seq(1).unwrap(), None);
}

/// Scenario 3: a note timestamped well outside the admitted clock-skew
/// window in the past is rejected as stale, never sequenced.
#[tokio::test]
async fn scenario_stale_timestamp() {
    let (_dir, facade) = facade(1);
    let stale = "2020-01-01T00:00:00.000Z";
    let note_bytes = build_note(1, 0x01, stale);

    let err = facade.declare(note_bytes).await.unwrap_err();
    assert!(matches!(err, DeclareError::Stale));
    assert_eq!(err.status_hint(), 410);
    assert_eq!(facade.get_by_seq(1).unwrap(), None);
}

/// Scenario 4: resubmitting byte-identical note content (same nonce) after
/// the first declaration succeeded returns the original receipt rather than
/// minting a second event or erroring.
#[tokio::test]
async fn scenario_replay_is_idempotent() {
    let (_dir, facade) = facade(1);
    let note_bytes = build_note(1, 0x02, &now_rfc3339());

    let r1 = facade.declare(note_bytes.clone()).await.unwrap();
    let r2 = facade.declare(note_bytes).await.unwrap();

    assert_eq!(r1.credential_subject.seq, r2.credential_subject.seq);
    assert_eq!(r1.credential_subject.ts_us, r2.credential_subject.ts_us);
    assert_eq!(facade.scan(1, 16).unwrap().len(), 1);
}

/// Scenario 5: a burst of concurrently-submitted, distinct-nonce notes all
/// land with a gapless, strictly-monotone sequence and no two events share
/// a nonce or an `ISCC-ID`.
#[tokio::test]
async fn scenario_concurrent_burst() {
    const N: u64 = 200;
    let (_dir, facade) = facade(3);
    let facade = Arc::new(facade);

    let mut set = tokio::task::JoinSet::new();
    for i in 0..N {
        let facade = facade.clone();
        let note_bytes = build_note(3, i as u8, &now_rfc3339());
        set.spawn(async move { facade.declare(note_bytes).await });
    }

    let mut receipts = Vec::new();
    while let Some(res) = set.join_next().await {
        receipts.push(res.unwrap().unwrap());
    }

    let mut seqs: Vec<u64> = receipts.iter().map(|r| r.credential_subject.seq).collect();
    seqs.sort_unstable();
    let expected: Vec<u64> = (1..=N).collect();
    assert_eq!(seqs, expected);

    let events = facade.scan(1, N as usize).unwrap();
    assert_eq!(events.len(), N as usize);
    for w in events.windows(2) {
        assert!(w[1].ts_us >= w[0].ts_us);
        assert!(w[1].seq == w[0].seq + 1);
    }

    let nonce_set: std::collections::HashSet<_> = events.iter().map(|e| e.nonce.clone()).collect();
    assert_eq!(nonce_set.len(), N as usize);
    let id_set: std::collections::HashSet<_> = events.iter().map(|e| e.iscc_id).collect();
    assert_eq!(id_set.len(), N as usize);
}

/// Scenario 6: forcing the wall clock backwards between two commits still
/// yields a strictly-increasing `ts_us` by falling back to `last_ts_us + 1`,
/// staying inside the 52-bit field.
#[tokio::test]
async fn scenario_clock_regression() {
    static CALL: AtomicU64 = AtomicU64::new(0);
    const BASE: u64 = 1_800_000_000_000_000;

    fn regressing_clock() -> u64 {
        match CALL.fetch_add(1, Ordering::SeqCst) {
            0 => BASE,
            _ => BASE - 1_000_000,
        }
    }

    let (_dir, facade) = facade_with_clock(1, regressing_clock);

    let n1 = build_note(1, 0x05, &now_rfc3339());
    let r1 = facade.declare(n1).await.unwrap();
    let n2 = build_note(1, 0x06, &now_rfc3339());
    let r2 = facade.declare(n2).await.unwrap();

    assert_eq!(r1.credential_subject.ts_us, BASE);
    assert_eq!(r2.credential_subject.ts_us, BASE + 1);
    assert!(r2.credential_subject.ts_us < (1u64 << 52));
}

/// Concurrency property: `K` submitters each sending `M` distinct-nonce
/// notes still yields `K*M` events, a gapless `1..=K*M` sequence, and
/// strictly-increasing timestamps, regardless of interleaving.
#[tokio::test]
async fn concurrent_multi_submitter_invariants() {
    const K: u64 = 8;
    const M: u64 = 25;
    let (_dir, facade) = facade(5);
    let facade = Arc::new(facade);

    let mut set = tokio::task::JoinSet::new();
    for k in 0..K {
        let facade = facade.clone();
        set.spawn(async move {
            let mut receipts = Vec::new();
            for m in 0..M {
                let salt = (k * M + m) as u8;
                let note_bytes = build_note(5, salt, &now_rfc3339());
                receipts.push(facade.declare(note_bytes).await.unwrap());
            }
            receipts
        });
    }

    let mut all_seqs = Vec::new();
    while let Some(res) = set.join_next().await {
        for r in res.unwrap() {
            all_seqs.push(r.credential_subject.seq);
        }
    }

    all_seqs.sort_unstable();
    let expected: Vec<u64> = (1..=(K * M)).collect();
    assert_eq!(all_seqs, expected);

    let events = facade.scan(1, (K * M) as usize).unwrap();
    for w in events.windows(2) {
        assert!(w[1].ts_us >= w[0].ts_us);
    }
}

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
#![warn(missing_docs)]

//! Sequencer: the atomic critical section that mints `(seq, ts_us,
//! iscc_id)` and commits exactly one [`Event`] per admitted note.
//!
//! A single writer lane is mandatory for gapless `seq` and strictly
//! monotone `ts_us`: one dedicated Tokio task owns the event store for
//! writes and drains a bounded mpsc channel, the same shape as this
//! repo's gossip event loop — one task owns mutable state, callers talk to
//! it only through channels, never by sharing the state directly.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::core::store::{EventStore, StoreError};
use crate::core::types::{IsccNote, Event};

/// 52-bit timestamp field ceiling.
const MAX_TS_US: u64 = (1u64 << 52) - 1;

/// Sequencer errors.
#[derive(Debug, Error)]
pub enum SequencerError {
    /// Nonce was already admitted; carries the existing event's `seq`.
    #[error("duplicate nonce at seq {0}")]
    DuplicateNonce(u64),
    /// Writer queue is full.
    #[error("busy")]
    Busy,
    /// 52-bit microsecond timestamp space is exhausted for this `server_id`.
    #[error("clock exhausted")]
    ClockExhausted,
    /// The durable store failed to commit.
    #[error("store: {0}")]
    Store(#[from] StoreError),
    /// The caller's channel was dropped before a result could be delivered.
    #[error("cancelled")]
    Cancelled,
}

struct WriteRequest {
    note: IsccNote,
    note_bytes: Vec<u8>,
    reply: oneshot::Sender<Result<Event, SequencerError>>,
}

/// Handle used by the Ingress Façade to submit admitted notes to the
/// single writer lane. Cloning is cheap; every clone shares one queue.
#[derive(Clone)]
pub struct Sequencer {
    tx: mpsc::Sender<WriteRequest>,
    capacity: usize,
}

/// Wall-clock source for the writer loop, in microseconds since the UNIX
/// epoch. Swappable so tests can force clock regressions deterministically;
/// production code always uses [`system_now_us`].
pub type ClockFn = fn() -> u64;

/// Default clock source: the machine's wall clock.
pub fn system_now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

impl Sequencer {
    /// Spawn the writer task and return a handle to it.
    ///
    /// `server_id` is embedded in every minted `ISCC-ID`; `capacity` bounds
    /// the writer queue (`BUSY` is returned once it fills).
    pub fn spawn(store: Arc<dyn EventStore>, server_id: u16, capacity: usize) -> Self {
        Self::spawn_with_clock(store, server_id, capacity, system_now_us)
    }

    /// Spawn the writer task with an explicit clock source, for deterministic
    /// clock-regression testing.
    pub fn spawn_with_clock(
        store: Arc<dyn EventStore>,
        server_id: u16,
        capacity: usize,
        clock: ClockFn,
    ) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        tokio::spawn(run_writer_loop(store, server_id, clock, rx));
        Self { tx, capacity }
    }

    /// Number of requests currently queued ahead of the writer task, for
    /// the `writer_queue_depth` gauge.
    pub fn queue_depth(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    /// Submit an admitted note for sequencing and durable commit.
    ///
    /// Returns `Busy` immediately if the writer queue is full, rather than
    /// queuing unboundedly.
    pub async fn submit(&self, note: IsccNote, note_bytes: Vec<u8>) -> Result<Event, SequencerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .try_send(WriteRequest {
                note,
                note_bytes,
                reply: reply_tx,
            })
            .map_err(|_| SequencerError::Busy)?;

        reply_rx.await.unwrap_or(Err(SequencerError::Cancelled))
    }
}

async fn run_writer_loop(
    store: Arc<dyn EventStore>,
    server_id: u16,
    clock: ClockFn,
    mut rx: mpsc::Receiver<WriteRequest>,
) {
    while let Some(req) = rx.recv().await {
        let result = commit_one(&*store, server_id, clock, &req.note, req.note_bytes);
        let _ = req.reply.send(result);
    }
}

fn commit_one(
    store: &dyn EventStore,
    server_id: u16,
    clock: ClockFn,
    note: &IsccNote,
    note_bytes: Vec<u8>,
) -> Result<Event, SequencerError> {
    let nonce = hex::decode(&note.nonce).map_err(|_| SequencerError::Store(StoreError::Corrupt))?;

    if let Some(existing) = store.get_by_nonce(&nonce)? {
        return Err(SequencerError::DuplicateNonce(existing.seq));
    }

    let (last_seq, last_ts_us) = store.tail()?;

    let wall_now_us = clock();
    let ts_us = wall_now_us.max(last_ts_us + 1);
    if ts_us > MAX_TS_US {
        return Err(SequencerError::ClockExhausted);
    }

    let seq = last_seq + 1;
    let iscc_id = (ts_us << 12) | (server_id as u64);

    let pubkey = hex::decode(&note.signature.pubkey).map_err(|_| SequencerError::Store(StoreError::Corrupt))?;
    let units = note.units.clone().unwrap_or_default();

    let received_at_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    let event = Event {
        seq,
        iscc_id,
        ts_us,
        server_id,
        note_bytes,
        pubkey,
        nonce,
        datahash: note.datahash.clone(),
        iscc_code: note.iscc_code.clone(),
        units,
        metahash: note.metahash.clone(),
        received_at_ms,
    };

    store.append(&event)?;
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::SledEventStore;
    use crate::core::types::NoteSignature;

    fn note_with_nonce(nonce_hex: &str) -> (IsccNote, Vec<u8>) {
        let note = IsccNote {
            iscc_code: "ISCC:AAAQAAFH3BQ4U".to_string(),
            datahash: format!("1e20{}", "00".repeat(32)),
            nonce: nonce_hex.to_string(),
            timestamp: "2026-07-27T00:00:00.000Z".to_string(),
            gateway: None,
            units: None,
            metahash: None,
            signature: NoteSignature {
                version: 1,
                pubkey: "00".repeat(32),
                proof: "00".repeat(64),
                controller: None,
                keyid: None,
            },
        };
        let bytes = serde_json::to_vec(&note).unwrap();
        (note, bytes)
    }

    #[tokio::test]
    async fn sequential_submits_get_gapless_seq_and_monotone_ts() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn EventStore> =
            Arc::new(SledEventStore::open(dir.path().to_str().unwrap()).unwrap());
        let seq = Sequencer::spawn(store, 7, 16);

        let (n1, b1) = note_with_nonce(&"00".repeat(16));
        let (n2, b2) = note_with_nonce(&"11".repeat(16));

        let e1 = seq.submit(n1, b1).await.unwrap();
        let e2 = seq.submit(n2, b2).await.unwrap();

        assert_eq!(e1.seq, 1);
        assert_eq!(e2.seq, 2);
        assert!(e2.ts_us > e1.ts_us);
    }

    #[tokio::test]
    async fn duplicate_nonce_returns_original_seq() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn EventStore> =
            Arc::new(SledEventStore::open(dir.path().to_str().unwrap()).unwrap());
        let seq = Sequencer::spawn(store, 7, 16);

        let nonce = "22".repeat(16);
        let (n1, b1) = note_with_nonce(&nonce);
        let e1 = seq.submit(n1, b1).await.unwrap();

        let (n2, b2) = note_with_nonce(&nonce);
        let err = seq.submit(n2, b2).await.unwrap_err();
        assert!(matches!(err, SequencerError::DuplicateNonce(seq) if seq == e1.seq));
    }

    #[tokio::test]
    async fn iscc_id_embeds_server_id() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn EventStore> =
            Arc::new(SledEventStore::open(dir.path().to_str().unwrap()).unwrap());
        let seq = Sequencer::spawn(store, 42, 16);

        let (n1, b1) = note_with_nonce(&"33".repeat(16));
        let e1 = seq.submit(n1, b1).await.unwrap();
        assert_eq!(e1.iscc_id & 0xFFF, 42);
    }
}

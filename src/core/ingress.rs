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

//! Ingress Façade: the single `declare()` entry point that walks a raw note
//! through Validator, Sequencer, and Receipt Issuer, plus the read-side
//! lookups an external framing layer would expose.
//!
//! State machine per declaration: `Received -> Validated -> Sequenced ->
//! Receipted -> Returned`, terminal `Rejected` from any pre-terminal state.
//! Once `Sequenced` the event is permanent — a client disconnect before
//! `Returned` never unwinds it, it only means the caller never sees the
//! receipt (idempotent resubmission with the same nonce recovers it).

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::core::error::DeclareError;
use crate::core::receipt::{IsccReceipt, ReceiptIssuer};
use crate::core::security::keystore::SignerBackend;
use crate::core::sequencer::{Sequencer, SequencerError};
use crate::core::store::EventStore;
use crate::core::types::{Event, IsccNote};
use crate::core::validator::validate_note;
use crate::monitoring::Metrics;

/// Ties the three sequencing-path components together behind one operation.
pub struct IngressFacade<B: SignerBackend> {
    store: Arc<dyn EventStore>,
    sequencer: Sequencer,
    receipts: ReceiptIssuer<B>,
    server_id: u16,
    skew_seconds: u64,
    metrics: Metrics,
}

impl<B: SignerBackend> IngressFacade<B> {
    /// Construct a façade over an already-open store, a running sequencer,
    /// and a receipt issuer bound to this HUB's key.
    pub fn new(
        store: Arc<dyn EventStore>,
        sequencer: Sequencer,
        receipts: ReceiptIssuer<B>,
        server_id: u16,
        skew_seconds: u64,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            sequencer,
            receipts,
            server_id,
            skew_seconds,
            metrics,
        }
    }

    /// Parse, validate, sequence, and receipt a raw note submission.
    ///
    /// `note_bytes` must be the verbatim bytes received from the client —
    /// every downstream check re-derives its signing input from these
    /// bytes, never from re-serializing a parsed struct.
    pub async fn declare(&self, note_bytes: Vec<u8>) -> Result<IsccReceipt, DeclareError> {
        let start = Instant::now();
        let result = self.declare_inner(note_bytes).await;

        self.metrics
            .declare_latency_seconds
            .observe(start.elapsed().as_secs_f64());
        self.metrics
            .writer_queue_depth
            .set(self.sequencer.queue_depth() as i64);
        match &result {
            Ok(_) => self.metrics.declarations_accepted_total.inc(),
            Err(e) => self.metrics.record_rejection(e.metric_kind()),
        }

        result
    }

    async fn declare_inner(&self, note_bytes: Vec<u8>) -> Result<IsccReceipt, DeclareError> {
        let note: IsccNote = serde_json::from_slice(&note_bytes)
            .map_err(|e| DeclareError::Malformed(e.to_string()))?;

        validate_note(&note, &note_bytes, self.server_id, self.skew_seconds)?;

        let submitted_bytes = note_bytes.clone();
        let event = match self.sequencer.submit(note, note_bytes).await {
            Ok(event) => event,
            Err(SequencerError::DuplicateNonce(seq)) => {
                // Idempotent resubmission only if the resubmitted bytes match
                // the originally-admitted note; a same-nonce collision on
                // different content is a genuine conflict, not a replay.
                let existing = self
                    .get_by_seq(seq)?
                    .ok_or_else(|| DeclareError::Internal("duplicate nonce pointed at missing event".into()))?;
                if existing.note_bytes == submitted_bytes {
                    self.metrics.duplicate_nonce_total.inc();
                    return Ok(self.receipts.issue(&existing)?);
                }
                return Err(DeclareError::DuplicateNonce(seq));
            }
            Err(e) => return Err(e.into()),
        };

        info!(seq = event.seq, iscc_id = event.iscc_id, "event sequenced");
        self.metrics.store_last_seq.set(event.seq as i64);

        let receipt = self.receipts.issue(&event).map_err(|e| {
            warn!(seq = event.seq, error = %e, "receipt issuance failed after commit");
            e
        })?;

        Ok(receipt)
    }

    /// Fetch a committed event by its sequence number.
    pub fn get_by_seq(&self, seq: u64) -> Result<Option<Event>, DeclareError> {
        Ok(self.store.get_by_seq(seq)?)
    }

    /// Fetch a committed event by its minted `ISCC-ID`.
    pub fn get_by_iscc_id(&self, iscc_id: u64) -> Result<Option<Event>, DeclareError> {
        Ok(self.store.get_by_iscc_id(iscc_id)?)
    }

    /// Contiguous range scan starting at `seq_from`, bounded by `limit`.
    pub fn scan(&self, seq_from: u64, limit: usize) -> Result<Vec<Event>, DeclareError> {
        Ok(self.store.scan(seq_from, limit)?)
    }

    /// Rolling digest over committed events `seq_from..=seq_to`, for anchoring.
    pub fn digest(&self, seq_from: u64, seq_to: u64) -> Result<[u8; 32], DeclareError> {
        Ok(self.store.digest(seq_from, seq_to)?)
    }

    /// This HUB's receipt-signing public key, hex-encoded.
    pub fn public_key_hex(&self) -> String {
        self.receipts.public_key_hex()
    }
}

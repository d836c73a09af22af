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

//! Unified error taxonomy surfaced by [`crate::core::ingress::declare`].
//!
//! Every component error converts into [`DeclareError`] so a caller has one
//! type to match on; [`DeclareError::status_hint`] maps each kind to the
//! HTTP status an external framing layer would use, without this crate ever
//! binding a socket itself.

use thiserror::Error;

use crate::core::receipt::ReceiptError;
use crate::core::security::keystore::KeystoreError;
use crate::core::sequencer::SequencerError;
use crate::core::store::StoreError;
use crate::core::validator::ValidatorError;

/// Top-level outcome of a declaration attempt.
#[derive(Debug, Error)]
pub enum DeclareError {
    /// JSON/shape/format violation.
    #[error("malformed note: {0}")]
    Malformed(String),
    /// Nonce prefix did not match this HUB's `server_id`.
    #[error("wrong hub: nonce does not target this server_id")]
    WrongHub,
    /// Note timestamp is older than the allowed clock skew window.
    #[error("stale: note timestamp too far in the past")]
    Stale,
    /// Note timestamp is further ahead than the allowed clock skew window.
    #[error("future: note timestamp too far ahead of HUB clock")]
    Future,
    /// Ed25519 signature verification failed.
    #[error("bad signature")]
    BadSignature,
    /// Nonce was already admitted under different note content; carries the
    /// conflicting event's sequence number. A resubmission of
    /// byte-identical content instead returns the original receipt (see
    /// [`crate::core::ingress::IngressFacade::declare`]).
    #[error("duplicate nonce, already admitted at seq {0}")]
    DuplicateNonce(u64),
    /// Writer queue is full; caller may retry with backoff.
    #[error("busy: writer queue full")]
    Busy,
    /// 52-bit microsecond timestamp space exhausted. Fatal for this HUB instance.
    #[error("clock exhausted: timestamp space exhausted for this server_id")]
    ClockExhausted,
    /// Durable store commit failed; nonce remains unconsumed and safe to retry.
    #[error("transient store failure")]
    Transient,
    /// Client disconnected before the event committed; no state was written.
    #[error("cancelled")]
    Cancelled,
    /// Unexpected internal failure (e.g. receipt signing). The admitted
    /// event, if any, remains valid and retrievable by nonce.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DeclareError {
    /// HTTP status code an external framing layer should map this to.
    pub fn status_hint(&self) -> u16 {
        match self {
            DeclareError::Malformed(_) => 400,
            DeclareError::WrongHub => 422,
            DeclareError::Stale | DeclareError::Future => 410,
            DeclareError::BadSignature => 401,
            DeclareError::DuplicateNonce(_) => 409,
            DeclareError::Busy => 429,
            DeclareError::ClockExhausted => 503,
            DeclareError::Transient => 500,
            DeclareError::Cancelled => 499,
            DeclareError::Internal(_) => 500,
        }
    }

    /// Stable label used to bucket rejections in the `declarations_rejected_total` metric.
    pub fn metric_kind(&self) -> &'static str {
        match self {
            DeclareError::Malformed(_) => "malformed",
            DeclareError::WrongHub => "wrong_hub",
            DeclareError::Stale => "stale",
            DeclareError::Future => "future",
            DeclareError::BadSignature => "bad_signature",
            DeclareError::DuplicateNonce(_) => "duplicate_nonce",
            DeclareError::Busy => "busy",
            DeclareError::ClockExhausted => "clock_exhausted",
            DeclareError::Transient => "transient",
            DeclareError::Cancelled => "cancelled",
            DeclareError::Internal(_) => "internal",
        }
    }
}

impl From<ValidatorError> for DeclareError {
    fn from(e: ValidatorError) -> Self {
        match e {
            ValidatorError::Malformed(msg) => DeclareError::Malformed(msg),
            ValidatorError::WrongHub => DeclareError::WrongHub,
            ValidatorError::Stale => DeclareError::Stale,
            ValidatorError::Future => DeclareError::Future,
            ValidatorError::BadSignature => DeclareError::BadSignature,
        }
    }
}

impl From<SequencerError> for DeclareError {
    fn from(e: SequencerError) -> Self {
        match e {
            SequencerError::DuplicateNonce(seq) => DeclareError::DuplicateNonce(seq),
            SequencerError::Busy => DeclareError::Busy,
            SequencerError::ClockExhausted => DeclareError::ClockExhausted,
            SequencerError::Store(_) => DeclareError::Transient,
            SequencerError::Cancelled => DeclareError::Cancelled,
        }
    }
}

impl From<StoreError> for DeclareError {
    fn from(_: StoreError) -> Self {
        DeclareError::Transient
    }
}

impl From<ReceiptError> for DeclareError {
    fn from(e: ReceiptError) -> Self {
        DeclareError::Internal(e.to_string())
    }
}

impl From<KeystoreError> for DeclareError {
    fn from(e: KeystoreError) -> Self {
        DeclareError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_hints_match_taxonomy_table() {
        assert_eq!(DeclareError::Malformed("x".into()).status_hint(), 400);
        assert_eq!(DeclareError::WrongHub.status_hint(), 422);
        assert_eq!(DeclareError::Stale.status_hint(), 410);
        assert_eq!(DeclareError::Future.status_hint(), 410);
        assert_eq!(DeclareError::BadSignature.status_hint(), 401);
        assert_eq!(DeclareError::DuplicateNonce(1).status_hint(), 409);
        assert_eq!(DeclareError::Busy.status_hint(), 429);
        assert_eq!(DeclareError::ClockExhausted.status_hint(), 503);
        assert_eq!(DeclareError::Transient.status_hint(), 500);
    }
}

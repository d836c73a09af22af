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

//! Durable append-only event log on top of `sled`.
//!
//! Three trees back the store: `events` (primary, keyed by `seq`), `index`
//! (every secondary lookup, multi-valued lookups keyed by `prefix || key ||
//! seq`), and `meta` (the tail singleton). `append` commits all three
//! atomically via a multi-tree `sled` transaction, so a reader never
//! observes a primary record without its indices or vice versa, and flushes
//! before returning so a committed event survives a crash.

use sled::transaction::{ConflictableTransactionError, TransactionError, Transactional};
use sled::Tree;
use thiserror::Error;

use crate::core::store::digest::RollingDigest;
use crate::core::types::{decode_canonical_limited, encode_canonical, Event};

/// Maximum serialized size of a single stored event (defends against
/// unbounded note payloads corrupting the log).
const MAX_EVENT_BYTES: usize = 1 << 20;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to open or operate on the underlying database.
    #[error("db io")]
    DbIo,
    /// A unique constraint (`seq`, `iscc_id`, or `nonce`) was violated.
    #[error("constraint violated")]
    Conflict,
    /// Stored bytes failed to decode.
    #[error("corrupt record")]
    Corrupt,
}

impl From<sled::Error> for StoreError {
    fn from(_: sled::Error) -> Self {
        StoreError::DbIo
    }
}

/// Durable append-only event log contract.
pub trait EventStore: Send + Sync {
    /// Atomically append `event`, honoring uniqueness of `seq`, `iscc_id`,
    /// and `nonce`. Returns `Conflict` if any of those already exist.
    fn append(&self, event: &Event) -> Result<(), StoreError>;
    /// Last committed `(seq, ts_us)`, or `(0, 0)` if the log is empty.
    fn tail(&self) -> Result<(u64, u64), StoreError>;
    /// Fetch by primary sequence number.
    fn get_by_seq(&self, seq: u64) -> Result<Option<Event>, StoreError>;
    /// Fetch by minted `ISCC-ID`.
    fn get_by_iscc_id(&self, iscc_id: u64) -> Result<Option<Event>, StoreError>;
    /// Fetch by raw nonce bytes.
    fn get_by_nonce(&self, nonce: &[u8]) -> Result<Option<Event>, StoreError>;
    /// Contiguous range scan starting at `seq_from`, bounded by `limit`.
    fn scan(&self, seq_from: u64, limit: usize) -> Result<Vec<Event>, StoreError>;
    /// All events that declared content with this `datahash`.
    fn lookup_by_datahash(&self, datahash: &str) -> Result<Vec<Event>, StoreError>;
    /// All events that declared this `iscc_code`.
    fn lookup_by_iscc_code(&self, iscc_code: &str) -> Result<Vec<Event>, StoreError>;
    /// All events whose `units` contain `unit`.
    fn lookup_by_unit(&self, unit: &str) -> Result<Vec<Event>, StoreError>;
    /// Rolling digest over committed events `seq_from..=seq_to`, in seq order.
    fn digest(&self, seq_from: u64, seq_to: u64) -> Result<[u8; 32], StoreError>;
}

/// `sled`-backed [`EventStore`] implementation.
pub struct SledEventStore {
    events: Tree,
    index: Tree,
    meta: Tree,
}

const META_TAIL_KEY: &[u8] = b"tail";

impl SledEventStore {
    /// Open (or create) the event log at `path`.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self {
            events: db.open_tree("events")?,
            index: db.open_tree("index")?,
            meta: db.open_tree("meta")?,
        })
    }
}

fn seq_key(seq: u64) -> [u8; 8] {
    seq.to_be_bytes()
}

fn id_index_key(iscc_id: u64) -> Vec<u8> {
    let mut k = Vec::with_capacity(3 + 8);
    k.extend_from_slice(b"id:");
    k.extend_from_slice(&iscc_id.to_be_bytes());
    k
}

fn nonce_index_key(nonce: &[u8]) -> Vec<u8> {
    let mut k = Vec::with_capacity(6 + nonce.len());
    k.extend_from_slice(b"nonce:");
    k.extend_from_slice(nonce);
    k
}

fn multi_index_key(prefix: &str, value: &[u8], seq: u64) -> Vec<u8> {
    let mut k = Vec::with_capacity(prefix.len() + value.len() + 8);
    k.extend_from_slice(prefix.as_bytes());
    k.extend_from_slice(value);
    k.extend_from_slice(&seq_key(seq));
    k
}

fn multi_index_prefix(prefix: &str, value: &[u8]) -> Vec<u8> {
    let mut k = Vec::with_capacity(prefix.len() + value.len());
    k.extend_from_slice(prefix.as_bytes());
    k.extend_from_slice(value);
    k
}

impl EventStore for SledEventStore {
    fn append(&self, event: &Event) -> Result<(), StoreError> {
        let encoded = encode_canonical(event).map_err(|_| StoreError::Corrupt)?;
        if encoded.len() > MAX_EVENT_BYTES {
            return Err(StoreError::Corrupt);
        }

        let seq_k = seq_key(event.seq);
        let id_k = id_index_key(event.iscc_id);
        let nonce_k = nonce_index_key(&event.nonce);
        let datahash_k = multi_index_key("datahash:", event.datahash.as_bytes(), event.seq);
        let code_k = multi_index_key("code:", event.iscc_code.as_bytes(), event.seq);
        let unit_keys: Vec<Vec<u8>> = event
            .units
            .iter()
            .map(|u| multi_index_key("unit:", u.as_bytes(), event.seq))
            .collect();

        let result: Result<(), TransactionError<StoreError>> =
            (&self.events, &self.index, &self.meta).transaction(|(events, index, meta)| {
                if events.get(&seq_k)?.is_some() {
                    return Err(ConflictableTransactionError::Abort(StoreError::Conflict));
                }
                if index.get(&id_k)?.is_some() {
                    return Err(ConflictableTransactionError::Abort(StoreError::Conflict));
                }
                if index.get(&nonce_k)?.is_some() {
                    return Err(ConflictableTransactionError::Abort(StoreError::Conflict));
                }

                events.insert(&seq_k, encoded.as_slice())?;
                index.insert(id_k.as_slice(), &seq_k)?;
                index.insert(nonce_k.as_slice(), &seq_k)?;
                index.insert(datahash_k.as_slice(), &seq_k)?;
                index.insert(code_k.as_slice(), &seq_k)?;
                for uk in &unit_keys {
                    index.insert(uk.as_slice(), &seq_k)?;
                }

                let tail = encode_tail(event.seq, event.ts_us);
                meta.insert(META_TAIL_KEY, tail.as_slice())?;

                Ok(())
            });

        match result {
            Ok(()) => {
                // sled batches writes to disk on its own schedule; force the
                // commit above onto stable storage before telling the caller
                // it succeeded.
                self.events.flush()?;
                Ok(())
            }
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(_)) => Err(StoreError::DbIo),
        }
    }

    fn tail(&self) -> Result<(u64, u64), StoreError> {
        match self.meta.get(META_TAIL_KEY)? {
            None => Ok((0, 0)),
            Some(bytes) => decode_tail(&bytes),
        }
    }

    fn get_by_seq(&self, seq: u64) -> Result<Option<Event>, StoreError> {
        match self.events.get(seq_key(seq))? {
            None => Ok(None),
            Some(bytes) => Ok(Some(decode_event(&bytes)?)),
        }
    }

    fn get_by_iscc_id(&self, iscc_id: u64) -> Result<Option<Event>, StoreError> {
        match self.index.get(id_index_key(iscc_id))? {
            None => Ok(None),
            Some(seq_bytes) => self.get_by_seq(decode_seq(&seq_bytes)?),
        }
    }

    fn get_by_nonce(&self, nonce: &[u8]) -> Result<Option<Event>, StoreError> {
        match self.index.get(nonce_index_key(nonce))? {
            None => Ok(None),
            Some(seq_bytes) => self.get_by_seq(decode_seq(&seq_bytes)?),
        }
    }

    fn scan(&self, seq_from: u64, limit: usize) -> Result<Vec<Event>, StoreError> {
        let mut out = Vec::with_capacity(limit.min(256));
        for item in self.events.range(seq_key(seq_from)..) {
            if out.len() >= limit {
                break;
            }
            let (_, v) = item?;
            out.push(decode_event(&v)?);
        }
        Ok(out)
    }

    fn lookup_by_datahash(&self, datahash: &str) -> Result<Vec<Event>, StoreError> {
        self.lookup_multi("datahash:", datahash.as_bytes())
    }

    fn lookup_by_iscc_code(&self, iscc_code: &str) -> Result<Vec<Event>, StoreError> {
        self.lookup_multi("code:", iscc_code.as_bytes())
    }

    fn lookup_by_unit(&self, unit: &str) -> Result<Vec<Event>, StoreError> {
        self.lookup_multi("unit:", unit.as_bytes())
    }

    fn digest(&self, seq_from: u64, seq_to: u64) -> Result<[u8; 32], StoreError> {
        let mut acc = RollingDigest::new();
        for item in self.events.range(seq_key(seq_from)..=seq_key(seq_to)) {
            let (_, v) = item?;
            acc.push(&v);
        }
        Ok(acc.finish())
    }
}

impl SledEventStore {
    fn lookup_multi(&self, prefix: &str, value: &[u8]) -> Result<Vec<Event>, StoreError> {
        let prefix_key = multi_index_prefix(prefix, value);
        let mut out = Vec::new();
        for item in self.index.scan_prefix(&prefix_key) {
            let (_, seq_bytes) = item?;
            let seq = decode_seq(&seq_bytes)?;
            if let Some(event) = self.get_by_seq(seq)? {
                out.push(event);
            }
        }
        Ok(out)
    }
}

fn decode_seq(bytes: &[u8]) -> Result<u64, StoreError> {
    let arr: [u8; 8] = bytes.try_into().map_err(|_| StoreError::Corrupt)?;
    Ok(u64::from_be_bytes(arr))
}

fn decode_event(bytes: &[u8]) -> Result<Event, StoreError> {
    decode_canonical_limited(bytes, MAX_EVENT_BYTES).map_err(|_| StoreError::Corrupt)
}

fn encode_tail(seq: u64, ts_us: u64) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[0..8].copy_from_slice(&seq.to_be_bytes());
    out[8..16].copy_from_slice(&ts_us.to_be_bytes());
    out
}

fn decode_tail(bytes: &[u8]) -> Result<(u64, u64), StoreError> {
    if bytes.len() != 16 {
        return Err(StoreError::Corrupt);
    }
    let seq = u64::from_be_bytes(bytes[0..8].try_into().unwrap());
    let ts_us = u64::from_be_bytes(bytes[8..16].try_into().unwrap());
    Ok((seq, ts_us))
}

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

//! Deterministic data model shared by every component: the client-supplied
//! `IsccNote`, the server-minted `Event`, and canonical (de)serialization
//! helpers used for internal storage.

use bincode::Options;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Canonical serialization error.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Could not serialize a value with the deterministic encoding rules.
    #[error("serialization")]
    Serialize,
    /// Could not deserialize bytes with the deterministic encoding rules.
    #[error("deserialization")]
    Deserialize,
    /// Payload exceeded the configured size limit.
    #[error("size limit exceeded")]
    TooLarge,
}

/// Canonical bincode options used for on-disk event encoding.
fn bincode_opts() -> impl Options {
    // Fixint encoding provides a stable integer representation across runs.
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Encode a value with the deterministic on-disk rules.
pub fn encode_canonical<T: Serialize>(v: &T) -> Result<Vec<u8>, CodecError> {
    bincode_opts()
        .serialize(v)
        .map_err(|_| CodecError::Serialize)
}

/// Decode a value with a hard size cap, defending against oversized records.
pub fn decode_canonical_limited<T: DeserializeOwned>(
    bytes: &[u8],
    max: usize,
) -> Result<T, CodecError> {
    if bytes.len() > max {
        return Err(CodecError::TooLarge);
    }
    bincode_opts()
        .with_limit(max as u64)
        .deserialize(bytes)
        .map_err(|_| CodecError::Deserialize)
}

/// Ed25519 signature record embedded in a submitted `IsccNote`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSignature {
    /// Signature scheme version (currently always `1`).
    pub version: u32,
    /// Ed25519 public key, hex-encoded (32 bytes).
    pub pubkey: String,
    /// Ed25519 signature proof, hex-encoded (64 bytes).
    pub proof: String,
    /// Optional DID or key controller string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    /// Optional key identifier within the controller document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyid: Option<String>,
}

/// Client-supplied, immutable-once-received declaration payload.
///
/// Field order here is irrelevant to wire semantics: signing input is
/// always derived from [`crate::core::canonical::canonical_note_bytes`],
/// never from this struct's `Serialize` impl directly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IsccNote {
    /// ISCC-encoded composite code.
    pub iscc_code: String,
    /// 34-byte multihash (prefix `1e20` + 32-byte blake3), hex-encoded.
    pub datahash: String,
    /// 128-bit hex nonce; first 12 bits must equal the HUB's `server_id`.
    pub nonce: String,
    /// RFC-3339 UTC timestamp with millisecond precision and `Z` suffix.
    pub timestamp: String,
    /// Optional absolute URL or RFC-6570 URI template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    /// Optional non-empty ordered sequence of ISCC-UNIT strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<Vec<String>>,
    /// Optional metadata hash, same shape as `datahash`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metahash: Option<String>,
    /// Ed25519 signature over the canonicalized note.
    pub signature: NoteSignature,
}

/// Server-minted, immutable-once-committed log entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Strictly increasing by exactly 1 per commit, starting at 1.
    pub seq: u64,
    /// `(ts_us << 12) | server_id`.
    pub iscc_id: u64,
    /// Microseconds since UNIX epoch; strictly increasing across this HUB's events.
    pub ts_us: u64,
    /// 12-bit server id, constant per HUB instance.
    pub server_id: u16,
    /// The verbatim `IsccNote` bytes as received (preserves exact signing input).
    pub note_bytes: Vec<u8>,
    /// Ed25519 public key bytes extracted from the note's signature.
    pub pubkey: Vec<u8>,
    /// Raw nonce bytes (unique across this HUB's entire log).
    pub nonce: Vec<u8>,
    /// Projected for lookup.
    pub datahash: String,
    /// Projected for lookup.
    pub iscc_code: String,
    /// Projected for lookup, if present on the note.
    pub units: Vec<String>,
    /// Projected for lookup, if present on the note.
    pub metahash: Option<String>,
    /// Wallclock at ingress; diagnostic only, never authoritative.
    pub received_at_ms: u64,
}

/// Log format for structured logging output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-oriented compact single-line format (development default).
    #[default]
    Compact,
    /// Newline-delimited JSON (recommended for production log pipelines).
    Json,
}

/// Node configuration root.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// This HUB's server id, `0..=4095`. Fatal if absent or out of range.
    pub server_id: u16,
    /// Path to the HUB's Ed25519 private key file (PKCS#8, optionally encrypted at rest).
    pub seckey_path: String,
    /// Domain used for the `did:web` controller in issued receipts.
    pub domain: String,
    /// Allowed clock skew between note timestamp and HUB wallclock, in seconds.
    #[serde(default = "default_skew_seconds")]
    pub skew_seconds: u64,
    /// Event store location (sled directory).
    pub db_path: String,
    /// Bounded write-queue capacity backing the sequencer's single writer lane.
    #[serde(default = "default_write_queue_capacity")]
    pub write_queue_capacity: usize,
    /// Structured logging output format.
    #[serde(default)]
    pub log_format: LogFormat,
    /// Descriptive only: where metrics would be served if an external HTTP
    /// layer is wired up. The crate itself never binds a socket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_listen_addr: Option<String>,
}

fn default_skew_seconds() -> u64 {
    600
}

fn default_write_queue_capacity() -> usize {
    1024
}

impl NodeConfig {
    /// Validate the static invariants a config must hold before startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_id > 0xFFF {
            return Err(ConfigError::ServerIdOutOfRange);
        }
        if self.seckey_path.trim().is_empty() {
            return Err(ConfigError::MissingSeckeyPath);
        }
        if self.db_path.trim().is_empty() {
            return Err(ConfigError::MissingDbPath);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `server_id` must fit in 12 bits (0..=4095).
    #[error("server_id out of range (must be 0..=4095)")]
    ServerIdOutOfRange,
    /// `seckey_path` is required.
    #[error("seckey_path is required")]
    MissingSeckeyPath,
    /// `db_path` is required.
    #[error("db_path is required")]
    MissingDbPath,
    /// Could not parse the TOML configuration file.
    #[error("config parse error")]
    Parse,
    /// Could not read the configuration file from disk.
    #[error("config read error")]
    Read,
}

/// Load and validate a [`NodeConfig`] from a TOML file on disk.
pub fn load_config(path: &str) -> Result<NodeConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::Read)?;
    let cfg: NodeConfig = toml::from_str(&raw).map_err(|_| ConfigError::Parse)?;
    cfg.validate()?;
    Ok(cfg)
}

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

//! Validator: turns a raw, deserialized [`IsccNote`] into an accepted note or
//! a typed rejection. Checks run in a fixed order; the first failure wins.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::canonical::canonical_note_bytes;
use crate::core::codec::parse_iscc_code;
use crate::core::security::keystore::verify_pubkey_bytes;
use crate::core::types::IsccNote;

/// Validation rejections, in the same order the checks run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidatorError {
    /// Shape or format violation; message names the offending field.
    #[error("malformed: {0}")]
    Malformed(String),
    /// Nonce's leading 12 bits do not match this HUB's `server_id`.
    #[error("wrong hub")]
    WrongHub,
    /// Note timestamp is further in the past than the allowed skew window.
    #[error("stale")]
    Stale,
    /// Note timestamp is further in the future than the allowed skew window.
    #[error("future")]
    Future,
    /// Ed25519 signature verification failed.
    #[error("bad signature")]
    BadSignature,
}

/// Allowed RFC-6570 template variables in a `gateway` URL template.
const ALLOWED_GATEWAY_VARS: [&str; 4] = ["iscc_id", "iscc_code", "pubkey", "datahash"];

/// Run every validator check against `note` and its exact wire bytes.
///
/// `note_bytes` must be the verbatim bytes the note was deserialized from —
/// the signature check re-derives its signing input from these bytes, not
/// from re-serializing `note`, so it is immune to any round-trip drift in
/// field order or number formatting.
pub fn validate_note(
    note: &IsccNote,
    note_bytes: &[u8],
    server_id: u16,
    skew_seconds: u64,
) -> Result<(), ValidatorError> {
    check_shape(note)?;
    check_format(note)?;
    check_nonce_prefix(note, server_id)?;
    check_clock_skew(note, skew_seconds)?;
    check_gateway(note)?;
    check_units(note)?;
    check_signature(note, note_bytes)?;
    Ok(())
}

fn check_shape(note: &IsccNote) -> Result<(), ValidatorError> {
    if note.iscc_code.trim().is_empty() {
        return Err(ValidatorError::Malformed("iscc_code is empty".into()));
    }
    if note.datahash.trim().is_empty() {
        return Err(ValidatorError::Malformed("datahash is empty".into()));
    }
    if note.nonce.trim().is_empty() {
        return Err(ValidatorError::Malformed("nonce is empty".into()));
    }
    if note.timestamp.trim().is_empty() {
        return Err(ValidatorError::Malformed("timestamp is empty".into()));
    }
    if note.signature.pubkey.trim().is_empty() {
        return Err(ValidatorError::Malformed("signature.pubkey is empty".into()));
    }
    if note.signature.proof.trim().is_empty() {
        return Err(ValidatorError::Malformed("signature.proof is empty".into()));
    }
    if let Some(units) = &note.units {
        if units.is_empty() {
            return Err(ValidatorError::Malformed("units must not be empty when present".into()));
        }
    }
    if let Some(gateway) = &note.gateway {
        if gateway.trim().is_empty() {
            return Err(ValidatorError::Malformed("gateway must not be empty when present".into()));
        }
    }
    Ok(())
}

fn check_format(note: &IsccNote) -> Result<(), ValidatorError> {
    parse_iscc_code(&note.iscc_code)
        .map_err(|_| ValidatorError::Malformed("iscc_code does not decode".into()))?;

    if note.datahash.len() != 68 || !note.datahash.starts_with("1e20") {
        return Err(ValidatorError::Malformed(
            "datahash must be 68 hex chars prefixed 1e20".into(),
        ));
    }
    hex::decode(&note.datahash)
        .map_err(|_| ValidatorError::Malformed("datahash is not valid hex".into()))?;

    if note.nonce.len() != 32 {
        return Err(ValidatorError::Malformed("nonce must be 32 hex chars".into()));
    }
    hex::decode(&note.nonce).map_err(|_| ValidatorError::Malformed("nonce is not valid hex".into()))?;

    note.timestamp
        .parse::<DateTime<Utc>>()
        .map_err(|_| ValidatorError::Malformed("timestamp is not RFC-3339 UTC".into()))?;
    if !note.timestamp.ends_with('Z') {
        return Err(ValidatorError::Malformed("timestamp must use Z suffix".into()));
    }

    hex::decode(&note.signature.pubkey)
        .ok()
        .filter(|b| b.len() == 32)
        .ok_or_else(|| ValidatorError::Malformed("signature.pubkey must be 32 hex bytes".into()))?;
    hex::decode(&note.signature.proof)
        .ok()
        .filter(|b| b.len() == 64)
        .ok_or_else(|| ValidatorError::Malformed("signature.proof must be 64 hex bytes".into()))?;

    if let Some(metahash) = &note.metahash {
        if metahash.len() != 68 || !metahash.starts_with("1e20") {
            return Err(ValidatorError::Malformed(
                "metahash must be 68 hex chars prefixed 1e20".into(),
            ));
        }
        hex::decode(metahash)
            .map_err(|_| ValidatorError::Malformed("metahash is not valid hex".into()))?;
    }

    Ok(())
}

fn check_nonce_prefix(note: &IsccNote, server_id: u16) -> Result<(), ValidatorError> {
    let bytes = hex::decode(&note.nonce).map_err(|_| ValidatorError::WrongHub)?;
    // First 12 bits of the nonce: top byte plus the high nibble of the second.
    let candidate = ((bytes[0] as u16) << 4) | ((bytes[1] as u16) >> 4);
    if candidate != server_id {
        return Err(ValidatorError::WrongHub);
    }
    Ok(())
}

fn check_clock_skew(note: &IsccNote, skew_seconds: u64) -> Result<(), ValidatorError> {
    let ts: DateTime<Utc> = note
        .timestamp
        .parse()
        .map_err(|_| ValidatorError::Malformed("timestamp is not RFC-3339 UTC".into()))?;
    let now = Utc::now();
    let skew = chrono::Duration::seconds(skew_seconds as i64);

    if ts < now - skew {
        return Err(ValidatorError::Stale);
    }
    if ts > now + skew {
        return Err(ValidatorError::Future);
    }
    Ok(())
}

fn check_gateway(note: &IsccNote) -> Result<(), ValidatorError> {
    let Some(gateway) = &note.gateway else {
        return Ok(());
    };

    if !gateway.starts_with("http://") && !gateway.starts_with("https://") {
        return Err(ValidatorError::Malformed(
            "gateway must be an absolute http(s) URL or URI template".into(),
        ));
    }
    if !gateway.contains('{') {
        return Ok(());
    }

    // RFC-6570-ish template: every `{var}` placeholder must be an allowed name.
    let mut rest = gateway.as_str();
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| ValidatorError::Malformed("gateway template unbalanced braces".into()))?;
        let var = &after[..close];
        if !ALLOWED_GATEWAY_VARS.contains(&var) {
            return Err(ValidatorError::Malformed(format!(
                "gateway template uses disallowed variable {var}"
            )));
        }
        rest = &after[close + 1..];
    }
    Ok(())
}

fn check_units(note: &IsccNote) -> Result<(), ValidatorError> {
    let Some(units) = &note.units else {
        return Ok(());
    };
    for unit in units {
        parse_iscc_code(unit)
            .map_err(|_| ValidatorError::Malformed(format!("unit {unit} does not decode")))?;
    }
    Ok(())
}

fn check_signature(note: &IsccNote, note_bytes: &[u8]) -> Result<(), ValidatorError> {
    let signing_bytes =
        canonical_note_bytes(note_bytes).map_err(|_| ValidatorError::BadSignature)?;

    let pubkey_bytes: [u8; 32] = hex::decode(&note.signature.pubkey)
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or(ValidatorError::BadSignature)?;
    let proof_bytes = hex::decode(&note.signature.proof).map_err(|_| ValidatorError::BadSignature)?;

    verify_pubkey_bytes(&pubkey_bytes, &signing_bytes, &proof_bytes)
        .map_err(|_| ValidatorError::BadSignature)
}

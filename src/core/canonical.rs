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

//! Canonical JSON signing-input construction for `IsccNote`.
//!
//! Signing input is a deterministic serialization of the note with
//! `signature.proof` removed: object keys sorted lexicographically by UTF-8
//! byte order, no insignificant whitespace, and numbers preserved in their
//! exact input literal form (via `serde_json`'s `arbitrary_precision`
//! feature) so the function is pure over the parsed value tree and
//! reproducible byte-for-byte by any auditor re-parsing stored note bytes.

use serde_json::Value;
use thiserror::Error;

/// Canonicalization errors.
#[derive(Debug, Error)]
pub enum CanonicalError {
    /// Input bytes were not valid JSON.
    #[error("invalid JSON")]
    InvalidJson,
    /// Top-level note was not a JSON object.
    #[error("note is not a JSON object")]
    NotAnObject,
    /// `signature` field was missing or not an object.
    #[error("missing or malformed signature field")]
    MissingSignature,
}

/// Compute the canonical signing-input bytes for a raw note JSON buffer.
///
/// Removes `signature.proof` (the value being verified/signed can't include
/// itself) but keeps the rest of `signature` (`version`, `pubkey`,
/// `controller`, `keyid`) as part of the signed payload.
pub fn canonical_note_bytes(note_bytes: &[u8]) -> Result<Vec<u8>, CanonicalError> {
    let mut value: Value =
        serde_json::from_slice(note_bytes).map_err(|_| CanonicalError::InvalidJson)?;

    {
        let obj = value.as_object_mut().ok_or(CanonicalError::NotAnObject)?;
        let sig = obj
            .get_mut("signature")
            .and_then(Value::as_object_mut)
            .ok_or(CanonicalError::MissingSignature)?;
        sig.remove("proof");
    }

    Ok(canonical_bytes_from_value(&value))
}

/// Serialize an arbitrary JSON value in canonical form: object keys sorted
/// lexicographically, arrays left in order, no insignificant whitespace.
pub fn canonical_bytes_from_value(value: &Value) -> Vec<u8> {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out.into_bytes()
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
            out.push('{');
            for (i, k) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json_string(k, out);
                out.push(':');
                write_canonical(&map[*k], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        // Strings, numbers (arbitrary-precision literal form), bools, and
        // null all already round-trip exactly through serde_json's Display
        // for Value when arbitrary_precision is enabled.
        other => out.push_str(&other.to_string()),
    }
}

fn write_json_string(s: &str, out: &mut String) {
    // serde_json's Value::to_string() on a Value::String already produces a
    // minimal, correctly escaped JSON string literal.
    out.push_str(&Value::String(s.to_string()).to_string());
}

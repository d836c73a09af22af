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

//! ISCC-ID encode/decode and ISCC-CODE header parsing.
//!
//! This module implements only the header/body framing this HUB needs —
//! minting and reading back `ISCC-ID`s, and sizing replication fan-out from
//! an `ISCC-CODE`'s unit count. Semantic decoding of unit *content* (what a
//! unit's body actually hashes) belongs to the full ISCC codec library and
//! is out of scope here.

use thiserror::Error;

/// Codec errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Input did not start with the `ISCC:` prefix.
    #[error("missing ISCC: prefix")]
    MissingPrefix,
    /// Input was not valid base32 (RFC 4648, unpadded, uppercase alphabet).
    #[error("malformed base32")]
    MalformedBase32,
    /// Decoded byte length did not match the expected framing.
    #[error("malformed ISCC")]
    MalformedIscc,
    /// Decoded header did not match the expected ISCC-ID header.
    #[error("unexpected header")]
    UnexpectedHeader,
    /// A 52-bit timestamp value overflowed its field.
    #[error("timestamp overflow")]
    TimestampOverflow,
    /// A 12-bit server id value overflowed its field.
    #[error("server id overflow")]
    ServerIdOverflow,
}

/// Fixed 16-bit ISCC-ID header: MainType=0110, SubType=0000, Version=0001, Length=0001.
const ISCC_ID_HEADER: [u8; 2] = [0x60, 0x11];

const MAX_TS_US: u64 = (1u64 << 52) - 1;
const MAX_SERVER_ID: u16 = (1u16 << 12) - 1;

fn base32_alphabet() -> base32::Alphabet {
    base32::Alphabet::Rfc4648 { padding: false }
}

/// Encode an ISCC-ID from a 52-bit microsecond timestamp and a 12-bit server id.
///
/// Produces `ISCC:` followed by unpadded base32 of the 16-bit header
/// concatenated with the 64-bit body `(ts_us << 12) | server_id`.
pub fn encode_iscc_id(ts_us: u64, server_id: u16) -> Result<String, CodecError> {
    if ts_us > MAX_TS_US {
        return Err(CodecError::TimestampOverflow);
    }
    if server_id > MAX_SERVER_ID {
        return Err(CodecError::ServerIdOverflow);
    }

    let body: u64 = (ts_us << 12) | (server_id as u64);

    let mut buf = Vec::with_capacity(10);
    buf.extend_from_slice(&ISCC_ID_HEADER);
    buf.extend_from_slice(&body.to_be_bytes());

    let encoded = base32::encode(base32_alphabet(), &buf);
    Ok(format!("ISCC:{encoded}"))
}

/// Decode an ISCC-ID produced by [`encode_iscc_id`] back into its parts.
pub fn decode_iscc_id(s: &str) -> Result<(u64, u16), CodecError> {
    let rest = s.strip_prefix("ISCC:").ok_or(CodecError::MissingPrefix)?;
    let bytes = base32::decode(base32_alphabet(), rest).ok_or(CodecError::MalformedBase32)?;
    if bytes.len() != 10 {
        return Err(CodecError::MalformedIscc);
    }
    if bytes[0..2] != ISCC_ID_HEADER {
        return Err(CodecError::UnexpectedHeader);
    }

    let mut body_bytes = [0u8; 8];
    body_bytes.copy_from_slice(&bytes[2..10]);
    let body = u64::from_be_bytes(body_bytes);

    let ts_us = body >> 12;
    let server_id = (body & 0xFFF) as u16;
    Ok((ts_us, server_id))
}

/// Structural decoding of an `ISCC-CODE`'s header, enough to size replication
/// fan-out. `unit_types` reports each unit body's leading MainType nibble —
/// a structural, header-level read, not the semantic content decoding (what
/// a unit's body actually hashes) that the full ISCC codec library covers
/// and this HUB deliberately leaves out of scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IsccCodeHeader {
    /// 4-bit MainType nibble.
    pub main_type: u8,
    /// 4-bit SubType nibble.
    pub sub_type: u8,
    /// 4-bit Version nibble.
    pub version: u8,
    /// 4-bit Length nibble.
    pub length_code: u8,
    /// Number of 64-bit unit bodies found after the 2-byte header.
    pub unit_count: usize,
    /// Leading MainType nibble of each 64-bit unit body, in ordinal order.
    pub unit_types: Vec<u8>,
}

/// Parse an `ISCC-CODE` string, returning its header fields, unit count, and
/// each unit's structural MainType nibble.
pub fn parse_iscc_code(s: &str) -> Result<IsccCodeHeader, CodecError> {
    let rest = s.strip_prefix("ISCC:").ok_or(CodecError::MissingPrefix)?;
    let bytes = base32::decode(base32_alphabet(), rest).ok_or(CodecError::MalformedBase32)?;
    if bytes.len() < 2 {
        return Err(CodecError::MalformedIscc);
    }

    let main_type = bytes[0] >> 4;
    let sub_type = bytes[0] & 0x0F;
    let version = bytes[1] >> 4;
    let length_code = bytes[1] & 0x0F;

    let units = &bytes[2..];
    // Units are conventionally 64-bit (8-byte) bodies; anything left over
    // after whole units is ignored here (out-of-scope semantic decoding).
    let unit_count = units.len() / 8;
    let unit_types = units
        .chunks(8)
        .take(unit_count)
        .map(|chunk| chunk[0] >> 4)
        .collect();

    Ok(IsccCodeHeader {
        main_type,
        sub_type,
        version,
        length_code,
        unit_count,
        unit_types,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_encode_decode() {
        let s = encode_iscc_id(1_754_310_896_789_000, 1).unwrap();
        assert!(s.starts_with("ISCC:"));
        let (ts, sid) = decode_iscc_id(&s).unwrap();
        assert_eq!(ts, 1_754_310_896_789_000);
        assert_eq!(sid, 1);
    }

    #[test]
    fn iscc_id_composition_matches_bit_layout() {
        let ts_us: u64 = 42;
        let server_id: u16 = 7;
        let s = encode_iscc_id(ts_us, server_id).unwrap();
        let (ts2, sid2) = decode_iscc_id(&s).unwrap();
        assert_eq!(ts2, ts_us);
        assert_eq!(sid2, server_id);
    }

    #[test]
    fn rejects_missing_prefix() {
        assert_eq!(decode_iscc_id("NOPE"), Err(CodecError::MissingPrefix));
    }

    #[test]
    fn rejects_wrong_header() {
        // Valid base32 of 10 bytes but wrong header nibbles.
        let bytes = [0xFFu8; 10];
        let encoded = base32::encode(base32_alphabet(), &bytes);
        let s = format!("ISCC:{encoded}");
        assert_eq!(decode_iscc_id(&s), Err(CodecError::UnexpectedHeader));
    }

    #[test]
    fn rejects_timestamp_overflow() {
        assert_eq!(
            encode_iscc_id(1u64 << 52, 0),
            Err(CodecError::TimestampOverflow)
        );
    }

    #[test]
    fn rejects_server_id_overflow() {
        assert_eq!(encode_iscc_id(0, 4096), Err(CodecError::ServerIdOverflow));
    }

    #[test]
    fn parse_iscc_code_counts_units() {
        // Two 8-byte unit bodies behind a 2-byte header, with distinct
        // leading MainType nibbles (0b0010 and 0b0011) per unit.
        let mut bytes = vec![0b0101_0000u8, 0b0001_0001u8];
        bytes.extend_from_slice(&[0b0010_0000u8, 0, 0, 0, 0, 0, 0, 0]);
        bytes.extend_from_slice(&[0b0011_0000u8, 0, 0, 0, 0, 0, 0, 0]);
        let encoded = base32::encode(base32_alphabet(), &bytes);
        let s = format!("ISCC:{encoded}");
        let header = parse_iscc_code(&s).unwrap();
        assert_eq!(header.main_type, 0b0101);
        assert_eq!(header.unit_count, 2);
        assert_eq!(header.unit_types, vec![0b0010, 0b0011]);
    }
}

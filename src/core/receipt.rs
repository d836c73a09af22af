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

//! Receipt Issuer: builds and signs the W3C-Verifiable-Credential-shaped
//! `IsccReceipt` for a committed [`Event`].
//!
//! The receipt is a pure function of committed event state: any auditor who
//! re-derives the canonical signing bytes from the same event gets a
//! byte-identical signing input, the same way this HUB's `Sequencer`
//! commits are reproducible from their stored encoding.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::core::canonical::canonical_bytes_from_value;
use crate::core::codec::encode_iscc_id;
use crate::core::security::keystore::{verify_pubkey_bytes, Keystore, KeystoreError, SignerBackend};
use crate::core::types::{Event, IsccNote};

/// Domain separator for receipt signing bytes; prevents a receipt signature
/// from ever being replayed as a signature over some other message shape.
const RECEIPT_SIGNING_DOMAIN: &str = "ISCC-HUB-Receipt-v1:";

/// Receipt errors.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Could not decode `note_bytes` back into an `IsccNote`.
    #[error("note decode")]
    NoteDecode,
    /// Underlying signing operation failed.
    #[error("signing: {0}")]
    Signing(#[from] KeystoreError),
    /// `ts_us` could not be mapped to a calendar timestamp.
    #[error("invalid timestamp")]
    InvalidTimestamp,
}

/// Verifiable-credential-shaped proof over the canonicalized receipt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proof {
    #[serde(rename = "type")]
    pub proof_type: String,
    pub created: String,
    #[serde(rename = "verificationMethod")]
    pub verification_method: String,
    #[serde(rename = "proofPurpose")]
    pub proof_purpose: String,
    #[serde(rename = "proofValue")]
    pub proof_value: String,
}

/// The admitted note plus the identifiers the HUB minted for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CredentialSubject {
    pub note: IsccNote,
    pub iscc_id: String,
    pub seq: u64,
    pub ts_us: u64,
}

/// Signed receipt returned to the client for an admitted declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IsccReceipt {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    #[serde(rename = "type")]
    pub credential_type: Vec<String>,
    pub issuer: String,
    #[serde(rename = "issuanceDate")]
    pub issuance_date: String,
    #[serde(rename = "credentialSubject")]
    pub credential_subject: CredentialSubject,
    pub proof: Proof,
}

impl IsccReceipt {
    /// Canonical signing bytes: the receipt with `proof.proofValue` cleared,
    /// prefixed with the domain separator, serialized with sorted object
    /// keys and no insignificant whitespace.
    fn signing_bytes(&self) -> Vec<u8> {
        let mut unsigned = self.clone();
        unsigned.proof.proof_value = String::new();
        let value = serde_json::to_value(&unsigned).expect("IsccReceipt always serializes");
        let mut out = RECEIPT_SIGNING_DOMAIN.as_bytes().to_vec();
        out.extend_from_slice(&canonical_bytes_from_value(&value));
        out
    }

    /// Verify this receipt's proof against the claimed `pubkey` (32 raw bytes).
    pub fn verify(&self, pubkey: &[u8; 32]) -> Result<(), ReceiptError> {
        let sig = hex::decode(&self.proof.proof_value).map_err(|_| ReceiptError::NoteDecode)?;
        verify_pubkey_bytes(pubkey, &self.signing_bytes(), &sig).map_err(ReceiptError::Signing)
    }
}

/// Builds and signs receipts for committed events.
pub struct ReceiptIssuer<B: SignerBackend> {
    keystore: Keystore<B>,
    /// `did:web` controller domain used as the issuer and verification method base.
    domain: String,
}

impl<B: SignerBackend> ReceiptIssuer<B> {
    /// Construct an issuer bound to `keystore`, minting receipts under `domain`.
    pub fn new(keystore: Keystore<B>, domain: String) -> Self {
        Self { keystore, domain }
    }

    /// Issue a signed receipt for a just-committed event.
    pub fn issue(&self, event: &Event) -> Result<IsccReceipt, ReceiptError> {
        let note: IsccNote =
            serde_json::from_slice(&event.note_bytes).map_err(|_| ReceiptError::NoteDecode)?;

        let iscc_id = encode_iscc_id(event.ts_us, event.server_id).map_err(|_| ReceiptError::NoteDecode)?;

        let issuance_date = Utc
            .timestamp_micros(event.ts_us as i64)
            .single()
            .ok_or(ReceiptError::InvalidTimestamp)?
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let issuer = format!("did:web:{}", self.domain);
        let verification_method = format!("{issuer}#key-1");

        let unsigned = IsccReceipt {
            context: vec![
                "https://www.w3.org/2018/credentials/v1".to_string(),
                "https://iscc.codes/contexts/hub-receipt/v1".to_string(),
            ],
            credential_type: vec!["VerifiableCredential".to_string(), "IsccReceipt".to_string()],
            issuer,
            issuance_date: issuance_date.clone(),
            credential_subject: CredentialSubject {
                note,
                iscc_id,
                seq: event.seq,
                ts_us: event.ts_us,
            },
            proof: Proof {
                proof_type: "Ed25519Signature2020".to_string(),
                created: issuance_date,
                verification_method,
                proof_purpose: "assertionMethod".to_string(),
                proof_value: String::new(),
            },
        };

        let signing_bytes = unsigned.signing_bytes();
        let sig = self.keystore.sign(&signing_bytes)?;

        let mut signed = unsigned;
        signed.proof.proof_value = hex::encode(sig.0);
        Ok(signed)
    }

    /// The HUB's public key, hex-encoded, for embedding in out-of-band
    /// verification method documents.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.keystore.public_key())
    }
}

/// Descriptive-only helper: build the `did:web` verification method document
/// fragment a client would dereference to verify a receipt. Not served over
/// HTTP by this crate.
pub fn verification_method_json(domain: &str, pubkey: &[u8; 32]) -> serde_json::Value {
    json!({
        "id": format!("did:web:{domain}#key-1"),
        "type": "Ed25519VerificationKey2020",
        "controller": format!("did:web:{domain}"),
        "publicKeyMultibase": format!("z{}", hex::encode(pubkey)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::NoteSignature;
    use tempfile::tempdir;

    fn sample_event() -> Event {
        let note = IsccNote {
            iscc_code: "ISCC:AAAQAAFH3BQ4U".to_string(),
            datahash: format!("1e20{}", "00".repeat(32)),
            nonce: "00".repeat(16),
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
        let note_bytes = serde_json::to_vec(&note).unwrap();
        Event {
            seq: 1,
            iscc_id: (1_754_310_896_789_000u64 << 12) | 7,
            ts_us: 1_754_310_896_789_000,
            server_id: 7,
            note_bytes,
            pubkey: vec![0u8; 32],
            nonce: vec![0u8; 16],
            datahash: note.datahash.clone(),
            iscc_code: note.iscc_code.clone(),
            units: vec![],
            metahash: None,
            received_at_ms: 0,
        }
    }

    #[test]
    fn issued_receipt_verifies_against_issuer_pubkey() {
        let dir = tempdir().unwrap();
        let ks = Keystore::open(dir.path().join("hub.key").to_str().unwrap()).unwrap();
        let pubkey = ks.public_key();
        let issuer = ReceiptIssuer::new(ks, "hub.example".to_string());

        let receipt = issuer.issue(&sample_event()).unwrap();
        assert!(receipt.verify(&pubkey).is_ok());
        assert_eq!(receipt.credential_subject.seq, 1);
        assert!(receipt.issuer.starts_with("did:web:"));
    }

    #[test]
    fn tampering_with_subject_breaks_verification() {
        let dir = tempdir().unwrap();
        let ks = Keystore::open(dir.path().join("hub.key").to_str().unwrap()).unwrap();
        let pubkey = ks.public_key();
        let issuer = ReceiptIssuer::new(ks, "hub.example".to_string());

        let mut receipt = issuer.issue(&sample_event()).unwrap();
        receipt.credential_subject.seq = 2;
        assert!(receipt.verify(&pubkey).is_err());
    }

    #[test]
    fn issuance_date_matches_event_timestamp() {
        let dir = tempdir().unwrap();
        let ks = Keystore::open(dir.path().join("hub.key").to_str().unwrap()).unwrap();
        let issuer = ReceiptIssuer::new(ks, "hub.example".to_string());
        let receipt = issuer.issue(&sample_event()).unwrap();
        assert!(receipt.issuance_date.starts_with("2025-08-04"));
    }
}

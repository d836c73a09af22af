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

//! Generate (or load-or-create) this HUB's Ed25519 receipt-signing key.
//!
//! Usage: `keygen [key-path]` (default `./data/hub.key`). Honors
//! `ISCC_HUB_KEY_PASSPHRASE` for at-rest encryption, same as the running
//! server's [`iscc_hub::core::security::keystore::Keystore`].

use anyhow::Result;

use iscc_hub::core::security::keystore::{FileEd25519Backend, Keystore};

fn main() -> Result<()> {
    let key_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./data/hub.key".to_string());

    let keystore: Keystore<FileEd25519Backend> =
        Keystore::open(&key_path).map_err(|e| anyhow::anyhow!("keystore open failed: {e}"))?;

    println!("{}", hex::encode(keystore.public_key()));
    Ok(())
}

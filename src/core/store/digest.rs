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

//! Domain-separated rolling digest over a contiguous range of committed
//! events, for external blockchain anchoring.
//!
//! `digest_0 = ZERO`
//! `digest_i = H( "ISCC-HUB-Log-v1" || digest_{i-1} || canonical(event_i) )`
//!
//! The result depends only on the committed event bytes in the requested
//! range, never on wall-clock time or store implementation details.

use ring::digest;

/// 32-byte digest output.
pub type Digest32 = [u8; 32];

const DOMAIN: &[u8] = b"ISCC-HUB-Log-v1";

/// Accumulator for the rolling log digest.
#[derive(Clone, Copy, Debug)]
pub struct RollingDigest(Digest32);

impl Default for RollingDigest {
    fn default() -> Self {
        Self([0u8; 32])
    }
}

impl RollingDigest {
    /// Start a fresh accumulator (digest over zero events is the all-zero hash).
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one more event's canonical bytes into the running digest.
    pub fn push(&mut self, event_bytes: &[u8]) {
        let mut buf = Vec::with_capacity(DOMAIN.len() + 32 + event_bytes.len());
        buf.extend_from_slice(DOMAIN);
        buf.extend_from_slice(&self.0);
        buf.extend_from_slice(event_bytes);
        let d = digest::digest(&digest::SHA256, &buf);
        self.0.copy_from_slice(d.as_ref());
    }

    /// Current digest value.
    pub fn finish(self) -> Digest32 {
        self.0
    }
}

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

//! ISCC HUB - single-writer content-declaration timestamping server.
//!
//! This crate provides:
//! - Deterministic note/event types and canonical signing-input encoding
//! - ISCC-ID minting and ISCC-CODE header parsing
//! - A single-writer Sequencer that commits gapless, monotone events
//! - A durable, transactional append-only Event Store
//! - A Receipt Issuer producing W3C-Verifiable-Credential-shaped receipts
//! - Monitoring via Prometheus metrics and structured logging
//!
//! Cross-HUB replication, peer discovery, and HTTP framing are deliberately
//! out of scope: [`core::ingress::IngressFacade`] is the library boundary
//! an HTTP/gRPC layer would wrap.

/// Core protocol primitives (codec, validator, sequencer, store, receipt, security).
pub mod core;
/// Observability (metrics, structured logging helpers).
pub mod monitoring;

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

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use thiserror::Error;

/// Metrics errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus")]
    Prom,
}

/// Metrics container. Descriptive only — this crate never binds an HTTP
/// listener; an external framing layer scrapes `registry`.
#[derive(Clone)]
pub struct Metrics {
    /// Registry.
    pub registry: Registry,

    /// Declarations admitted and receipted, total.
    pub declarations_accepted_total: IntCounter,
    /// Declarations rejected, labeled by error kind (`malformed`,
    /// `wrong_hub`, `stale`, `future`, `bad_signature`, `busy`, etc).
    pub declarations_rejected_total: IntCounterVec,
    /// Resubmissions recovered via duplicate-nonce idempotency.
    pub duplicate_nonce_total: IntCounter,
    /// End-to-end `declare()` latency, seconds.
    pub declare_latency_seconds: Histogram,
    /// Current event store size (`last_seq`).
    pub store_last_seq: IntGauge,
    /// Writer queue depth at last observation.
    pub writer_queue_depth: IntGauge,
}

impl Metrics {
    /// Create and register metrics.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let declarations_accepted_total = IntCounter::new(
            "iscc_hub_declarations_accepted_total",
            "Declarations admitted and receipted",
        )
        .map_err(|_| MetricsError::Prom)?;

        let declarations_rejected_total = IntCounterVec::new(
            Opts::new(
                "iscc_hub_declarations_rejected_total",
                "Declarations rejected, by error kind",
            ),
            &["kind"],
        )
        .map_err(|_| MetricsError::Prom)?;

        let duplicate_nonce_total = IntCounter::new(
            "iscc_hub_duplicate_nonce_total",
            "Resubmissions recovered via duplicate-nonce idempotency",
        )
        .map_err(|_| MetricsError::Prom)?;

        let declare_latency_seconds = Histogram::with_opts(HistogramOpts::new(
            "iscc_hub_declare_latency_seconds",
            "End-to-end declare() latency in seconds",
        ))
        .map_err(|_| MetricsError::Prom)?;

        let store_last_seq =
            IntGauge::new("iscc_hub_store_last_seq", "Last committed sequence number")
                .map_err(|_| MetricsError::Prom)?;

        let writer_queue_depth = IntGauge::new(
            "iscc_hub_writer_queue_depth",
            "Sequencer writer queue depth at last observation",
        )
        .map_err(|_| MetricsError::Prom)?;

        registry
            .register(Box::new(declarations_accepted_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(declarations_rejected_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(duplicate_nonce_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(declare_latency_seconds.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(store_last_seq.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(writer_queue_depth.clone()))
            .map_err(|_| MetricsError::Prom)?;

        Ok(Self {
            registry,
            declarations_accepted_total,
            declarations_rejected_total,
            duplicate_nonce_total,
            declare_latency_seconds,
            store_last_seq,
            writer_queue_depth,
        })
    }

    /// Record a rejection by its error kind label (e.g. `"wrong_hub"`).
    pub fn record_rejection(&self, kind: &str) {
        self.declarations_rejected_total
            .with_label_values(&[kind])
            .inc();
    }
}

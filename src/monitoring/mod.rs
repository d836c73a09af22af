#![forbid(unsafe_code)]
#![allow(missing_docs)]

//! Prometheus metrics registry. A `Metrics` value can be exposed over HTTP
//! by an external framing layer; this crate never binds a socket itself.

pub mod metrics;

pub use metrics::{Metrics, MetricsError};

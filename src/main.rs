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

//! ISCC HUB entrypoint (systemd-friendly).
//!
//! Wires the Event Store, Keystore, Sequencer, and Receipt Issuer behind
//! the Ingress Façade, then serves declarations as newline-delimited JSON
//! over stdin/stdout. This crate never binds a network socket — an HTTP or
//! gRPC framing layer is expected to drive [`iscc_hub::core::ingress::IngressFacade::declare`]
//! directly instead of shelling out to this process.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use tracing::{error, info, warn};

use iscc_hub::core::ingress::IngressFacade;
use iscc_hub::core::receipt::ReceiptIssuer;
use iscc_hub::core::security::keystore::{FileEd25519Backend, Keystore};
use iscc_hub::core::sequencer::Sequencer;
use iscc_hub::core::store::{EventStore, SledEventStore};
use iscc_hub::core::types::{load_config, LogFormat, NodeConfig};
use iscc_hub::monitoring::Metrics;

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn init_tracing(format: LogFormat) {
    let subscriber = tracing_subscriber::fmt().with_target(false).with_level(true);
    let _ = match format {
        LogFormat::Compact => subscriber.compact().try_init(),
        LogFormat::Json => subscriber.json().try_init(),
    };
}

fn load_or_default_config() -> NodeConfig {
    let config_path = env("ISCC_HUB_CONFIG", "./iscc-hub.toml");
    match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(_) => {
            eprintln!("no usable config at {config_path}; falling back to ./data defaults");
            NodeConfig {
                server_id: 0,
                seckey_path: "./data/hub.key".to_string(),
                domain: "localhost".to_string(),
                skew_seconds: 600,
                db_path: "./data/events".to_string(),
                write_queue_capacity: 1024,
                log_format: LogFormat::Compact,
                metrics_listen_addr: None,
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let cfg = load_or_default_config();
    init_tracing(cfg.log_format);

    if let Err(e) = cfg.validate() {
        eprintln!("invalid config: {e}");
        std::process::exit(1);
    }

    info!(server_id = cfg.server_id, db_path = %cfg.db_path, "iscc-hub starting");

    let store: Arc<dyn EventStore> = match SledEventStore::open(&cfg.db_path) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("failed to open event store: {e}");
            std::process::exit(1);
        }
    };

    let keystore: Keystore<FileEd25519Backend> = match Keystore::open(&cfg.seckey_path) {
        Ok(k) => k,
        Err(e) => {
            eprintln!("failed to open keystore: {e}");
            std::process::exit(1);
        }
    };

    let sequencer = Sequencer::spawn(store.clone(), cfg.server_id, cfg.write_queue_capacity);
    let receipts = ReceiptIssuer::new(keystore, cfg.domain.clone());
    let metrics = match Metrics::new() {
        Ok(m) => m,
        Err(e) => {
            eprintln!("failed to register metrics: {e}");
            std::process::exit(1);
        }
    };
    let facade = Arc::new(IngressFacade::new(
        store,
        sequencer,
        receipts,
        cfg.server_id,
        cfg.skew_seconds,
        metrics,
    ));

    info!("iscc-hub ready, reading declarations from stdin");
    serve_stdin(facade).await;
}

async fn serve_stdin(facade: Arc<IngressFacade<FileEd25519Backend>>) {
    let stdin = io::stdin();
    let stdout = io::stdout();
    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            warn!("stdin read error; stopping");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let result = facade.declare(line.into_bytes()).await;
        let mut out = stdout.lock();
        match result {
            Ok(receipt) => {
                if let Ok(json) = serde_json::to_string(&receipt) {
                    let _ = writeln!(out, "{json}");
                }
            }
            Err(e) => {
                error!(error = %e, status = e.status_hint(), "declaration rejected");
                let body = serde_json::json!({ "error": e.to_string(), "status": e.status_hint() });
                let _ = writeln!(out, "{body}");
            }
        }
    }
}

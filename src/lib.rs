/*
 * Copyright 2024 ArpNetworking
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! # txstats - sliding-window transaction statistics
//!
//! Records timestamped monetary transactions and answers sum, average,
//! min, max and count over the trailing window (60 seconds by default) in
//! time independent of how many transactions were ever recorded.
//!
//! ## Features
//!
//! - **Bucketed aggregation**: one running aggregate per time slot
//! - **Concurrent writers**: per-slot locking, no global lock on the write path
//! - **Bounded memory**: stale slots are pruned after every accepted write
//! - **HTTP interface**: `POST /transactions`, `GET /statistics`
//!
//! ## Example
//!
//! ```rust,no_run
//! use txstats::{TxStats, config::ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServiceConfig::from_file("txstats.json")?;
//!     let service = TxStats::new(config)?;
//!     service.start().await?;
//!     service.wait_for_shutdown().await?;
//!     Ok(())
//! }
//! ```

use anyhow::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub mod aggregation;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod ingest;
pub mod model;

use aggregation::AggregationEngine;
use clock::{Clock, SystemClock};
use config::ServiceConfig;
use http::{AppState, HttpServer};
use ingest::Ingestor;

/// Main service instance
pub struct TxStats {
    config: ServiceConfig,
    engine: AggregationEngine,
    clock: Arc<dyn Clock>,
    http: HttpServer,
    sweeper: Mutex<Option<CancellationToken>>,
    shutdown_notify: Arc<Notify>,
}

impl TxStats {
    /// Create a service instance driven by the system clock
    pub fn new(config: ServiceConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a service instance driven by `clock`
    pub fn with_clock(config: ServiceConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let engine = AggregationEngine::new(config.window.window()?);
        let state = AppState {
            ingestor: Ingestor::new(&engine),
            query: engine.query(),
            clock: Arc::clone(&clock),
        };
        let http = HttpServer::new(config.http_addr(), state);

        Ok(Self {
            config,
            engine,
            clock,
            http,
            sweeper: Mutex::new(None),
            shutdown_notify: Arc::new(Notify::new()),
        })
    }

    /// The engine holding this service's window state
    pub fn engine(&self) -> &AggregationEngine {
        &self.engine
    }

    /// Start the HTTP server, the optional periodic sweeper and signal handlers
    pub async fn start(&self) -> Result<std::net::SocketAddr> {
        info!(
            precision_ms = self.engine.window().precision_ms(),
            validity_ms = self.engine.window().validity_ms(),
            "Starting txstats services"
        );

        let addr = self.http.start().await?;

        if let Some(interval) = self.config.sweep_interval {
            let cancel = CancellationToken::new();
            self.engine
                .reaper()
                .spawn_periodic(Arc::clone(&self.clock), interval, cancel.clone());
            *self.sweeper.lock() = Some(cancel);
            info!(?interval, "periodic sweeper started");
        }

        self.setup_signal_handlers();

        info!("All services started successfully");
        Ok(addr)
    }

    /// Wait for a shutdown signal, then stop all services
    pub async fn wait_for_shutdown(&self) -> Result<()> {
        self.shutdown_notify.notified().await;
        info!("Shutdown signal received, stopping services...");
        self.stop().await
    }

    /// Stop all services without waiting for a signal
    pub async fn stop(&self) -> Result<()> {
        if let Some(cancel) = self.sweeper.lock().take() {
            cancel.cancel();
        }
        self.http.stop().await
    }

    fn setup_signal_handlers(&self) {
        let shutdown_notify = Arc::clone(&self.shutdown_notify);

        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received SIGINT, initiating shutdown");
                    shutdown_notify.notify_one();
                }
                Err(err) => {
                    warn!("Failed to listen for SIGINT: {}", err);
                }
            }
        });

        #[cfg(unix)]
        {
            let shutdown_notify = Arc::clone(&self.shutdown_notify);
            tokio::spawn(async move {
                let mut sigterm =
                    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                        Ok(sigterm) => sigterm,
                        Err(err) => {
                            warn!("Failed to register SIGTERM handler: {}", err);
                            return;
                        }
                    };

                sigterm.recv().await;
                info!("Received SIGTERM, initiating shutdown");
                shutdown_notify.notify_one();
            });
        }
    }
}

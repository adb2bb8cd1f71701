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

//! HTTP transport
//!
//! Thin axum adapter over the core: `POST /transactions`,
//! `GET /statistics` and `GET /healthz`. The clock is sampled once per
//! request and that frozen "now" is handed to the core.

use crate::aggregation::WindowQuery;
use crate::clock::Clock;
use crate::error::{IngestError, QueryError};
use crate::ingest::Ingestor;
use crate::model::{Statistics, Transaction};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Shared state for axum handlers
#[derive(Clone)]
pub struct AppState {
    pub ingestor: Ingestor,
    pub query: WindowQuery,
    pub clock: Arc<dyn Clock>,
}

/// Build the service router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/transactions", post(transactions_handler))
        .route("/statistics", get(statistics_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(state)
}

/// POST /transactions - 201 when accepted, 204 when the timestamp is out of range.
async fn transactions_handler(
    State(state): State<AppState>,
    Json(tx): Json<Transaction>,
) -> Result<StatusCode, IngestError> {
    let now_ms = state.clock.now_ms();
    state.ingestor.submit(tx, now_ms)?;
    Ok(StatusCode::CREATED)
}

/// GET /statistics - 200 with the window statistics, 404 when the window is empty.
async fn statistics_handler(
    State(state): State<AppState>,
) -> Result<Json<Statistics>, QueryError> {
    let now_ms = state.clock.now_ms();
    state.query.statistics(now_ms).map(Json)
}

/// GET /healthz - Simple health check.
async fn healthz_handler() -> &'static str {
    "ok"
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        tracing::debug!(kind = self.kind(), error = %self, "rejected transaction");
        StatusCode::NO_CONTENT.into_response()
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        match self {
            QueryError::NoRecordedTransactions => StatusCode::NOT_FOUND.into_response(),
        }
    }
}

/// HTTP server lifecycle around [`router`]
pub struct HttpServer {
    addr: SocketAddr,
    state: AppState,
    shutdown: Mutex<Option<CancellationToken>>,
}

impl HttpServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self {
            addr,
            state,
            shutdown: Mutex::new(None),
        }
    }

    /// Bind and start serving in the background, returning the bound address.
    pub async fn start(&self) -> Result<SocketAddr> {
        let app = router(self.state.clone());

        let listener = TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("listening on {}", self.addr))?;

        let local_addr = listener.local_addr().context("getting local address")?;

        let cancel = CancellationToken::new();
        *self.shutdown.lock() = Some(cancel.clone());

        tokio::spawn(async move {
            tracing::info!(addr = %local_addr, "http server started");

            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    cancel.cancelled().await;
                })
                .await;

            if let Err(e) = result {
                tracing::error!(error = %e, "http server error");
            }
        });

        Ok(local_addr)
    }

    /// Gracefully shuts down the server.
    pub async fn stop(&self) -> Result<()> {
        if let Some(cancel) = self.shutdown.lock().take() {
            cancel.cancel();
        }

        Ok(())
    }
}

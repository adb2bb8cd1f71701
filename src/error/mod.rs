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

//! Error kinds surfaced by the aggregation core
//!
//! Both are ordinary outcomes rather than failures of the service. The
//! transport layer maps them onto status codes.

use thiserror::Error;

/// Failure of a statistics query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The window holds no events, so average/min/max are undefined
    #[error("no transactions recorded in the current window")]
    NoRecordedTransactions,
}

/// Rejection of an incoming transaction by timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IngestError {
    /// Older than the validity window
    #[error("transaction is stale: {age_ms}ms old, window is {validity_ms}ms")]
    Stale { age_ms: i64, validity_ms: i64 },

    /// Timestamped after "now"
    #[error("transaction is {ahead_ms}ms in the future")]
    Future { ahead_ms: i64 },
}

impl IngestError {
    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Stale { .. } => "stale",
            IngestError::Future { .. } => "future",
        }
    }
}

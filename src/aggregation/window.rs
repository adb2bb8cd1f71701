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

//! Trailing-window bounds and statistics queries

use super::bucket::BucketSnapshot;
use super::store::BucketStore;
use crate::error::QueryError;
use crate::model::Statistics;
use anyhow::{ensure, Result};
use std::sync::Arc;

/// Default bucket width: one second
pub const DEFAULT_PRECISION_MS: i64 = 1_000;

/// Default window length: one minute
pub const DEFAULT_VALIDITY_MS: i64 = 60_000;

/// Bucket width and window length, both in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    precision_ms: i64,
    validity_ms: i64,
}

impl Window {
    /// Create a window; both durations must be positive
    pub fn try_new(precision_ms: i64, validity_ms: i64) -> Result<Self> {
        ensure!(precision_ms > 0, "precision must be positive, got {precision_ms}ms");
        ensure!(validity_ms > 0, "validity must be positive, got {validity_ms}ms");
        Ok(Self {
            precision_ms,
            validity_ms,
        })
    }

    pub fn precision_ms(&self) -> i64 {
        self.precision_ms
    }

    pub fn validity_ms(&self) -> i64 {
        self.validity_ms
    }

    /// Slot key for a timestamp: `floor(timestamp / precision)`
    pub fn slot_of(&self, timestamp_ms: i64) -> i64 {
        timestamp_ms.div_euclid(self.precision_ms)
    }

    /// Oldest slot still inside the window ending at `now_ms` (inclusive)
    pub fn lower_slot(&self, now_ms: i64) -> i64 {
        self.slot_of(now_ms.saturating_sub(self.validity_ms))
    }

    /// Newest slot inside the window ending at `now_ms` (inclusive)
    pub fn upper_slot(&self, now_ms: i64) -> i64 {
        self.slot_of(now_ms)
    }
}

impl Default for Window {
    fn default() -> Self {
        Self {
            precision_ms: DEFAULT_PRECISION_MS,
            validity_ms: DEFAULT_VALIDITY_MS,
        }
    }
}

/// Read-only statistics over the buckets inside the window.
///
/// Every operation takes a frozen `now_ms`; callers combining several
/// results must pass the same value to each.
#[derive(Clone)]
pub struct WindowQuery {
    store: Arc<BucketStore>,
    window: Window,
}

impl WindowQuery {
    pub fn new(store: Arc<BucketStore>, window: Window) -> Self {
        Self { store, window }
    }

    /// Sum of all amounts; 0.0 for an empty window
    pub fn sum(&self, now_ms: i64) -> f64 {
        self.buckets(now_ms)
            .iter()
            .fold(0.0, |sum, bucket| sum + bucket.sum)
    }

    /// Number of events; 0 for an empty window
    pub fn count(&self, now_ms: i64) -> u64 {
        self.buckets(now_ms).iter().map(|bucket| bucket.count).sum()
    }

    /// Mean amount
    pub fn average(&self, now_ms: i64) -> Result<f64, QueryError> {
        let (sum, count) = self
            .buckets(now_ms)
            .iter()
            .fold((0.0, 0u64), |(sum, count), bucket| {
                (sum + bucket.sum, count + bucket.count)
            });

        if count == 0 {
            return Err(QueryError::NoRecordedTransactions);
        }
        Ok(sum / count as f64)
    }

    /// Smallest amount
    pub fn minimum(&self, now_ms: i64) -> Result<f64, QueryError> {
        self.buckets(now_ms)
            .iter()
            .filter_map(|bucket| bucket.min)
            .reduce(f64::min)
            .ok_or(QueryError::NoRecordedTransactions)
    }

    /// Largest amount
    pub fn maximum(&self, now_ms: i64) -> Result<f64, QueryError> {
        self.buckets(now_ms)
            .iter()
            .filter_map(|bucket| bucket.max)
            .reduce(f64::max)
            .ok_or(QueryError::NoRecordedTransactions)
    }

    /// All five statistics for the window ending at `now_ms`
    pub fn statistics(&self, now_ms: i64) -> Result<Statistics, QueryError> {
        Ok(Statistics {
            avg: self.average(now_ms)?,
            sum: self.sum(now_ms),
            min: self.minimum(now_ms)?,
            max: self.maximum(now_ms)?,
            count: self.count(now_ms),
        })
    }

    fn buckets(&self, now_ms: i64) -> Vec<BucketSnapshot> {
        self.store
            .range_reduce(self.window.lower_slot(now_ms), self.window.upper_slot(now_ms))
    }
}

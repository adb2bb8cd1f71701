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

//! Time-bucketed windowed aggregation engine
//!
//! Groups events into fixed-width time slots, keeps a running aggregate per
//! slot, and answers window queries by reducing only the slots inside the
//! window. Query cost depends on the window length, never on how many
//! events have been recorded.

pub mod bucket;
pub mod reaper;
pub mod store;
pub mod window;

pub use bucket::{BucketAggregate, BucketSnapshot};
pub use reaper::StaleReaper;
pub use store::BucketStore;
pub use window::{Window, WindowQuery};

use std::sync::Arc;

/// Owner of the shared bucket store.
///
/// This is the single creation point of window state; every query handle
/// and reaper it hands out reads and writes the same store.
#[derive(Clone)]
pub struct AggregationEngine {
    /// Buckets keyed by slot
    store: Arc<BucketStore>,

    /// Bucket width and window length
    window: Window,
}

impl AggregationEngine {
    /// Create an engine with an empty store
    pub fn new(window: Window) -> Self {
        Self {
            store: Arc::new(BucketStore::new()),
            window,
        }
    }

    pub fn store(&self) -> &Arc<BucketStore> {
        &self.store
    }

    pub fn window(&self) -> Window {
        self.window
    }

    /// Read-only query handle over this engine's store
    pub fn query(&self) -> WindowQuery {
        WindowQuery::new(Arc::clone(&self.store), self.window)
    }

    /// Reaper over this engine's store
    pub fn reaper(&self) -> StaleReaper {
        StaleReaper::new(Arc::clone(&self.store), self.window)
    }
}

impl Default for AggregationEngine {
    fn default() -> Self {
        Self::new(Window::default())
    }
}

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

//! Removal of buckets that have aged out of the window

use super::store::BucketStore;
use super::window::Window;
use crate::clock::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Deletes every bucket strictly below the window's lower bound
#[derive(Clone)]
pub struct StaleReaper {
    store: Arc<BucketStore>,
    window: Window,
}

impl StaleReaper {
    pub fn new(store: Arc<BucketStore>, window: Window) -> Self {
        Self { store, window }
    }

    /// Purge stale buckets relative to `now_ms`, returning the number of events removed
    pub fn sweep(&self, now_ms: i64) -> u64 {
        let lower = self.window.lower_slot(now_ms);
        match self.store.first_key() {
            Some(oldest) if oldest < lower => self.store.remove_range(oldest, lower - 1),
            _ => 0,
        }
    }

    /// Sweep on a fixed interval until `cancel` fires.
    ///
    /// Without this an idle store keeps its stale buckets until the next
    /// accepted write.
    pub fn spawn_periodic(
        self,
        clock: Arc<dyn Clock>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let purged = self.sweep(clock.now_ms());
                        if purged > 0 {
                            debug!(purged, remaining_buckets = self.store.len(), "periodic sweep");
                        }
                    }
                }
            }

            debug!("periodic sweeper stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const T: i64 = 1_700_000_000_000;

    fn reaper() -> (Arc<BucketStore>, Window, StaleReaper) {
        let store = Arc::new(BucketStore::new());
        let window = Window::default();
        let reaper = StaleReaper::new(Arc::clone(&store), window);
        (store, window, reaper)
    }

    #[test]
    fn test_sweep_on_empty_store_is_noop() {
        let (_, _, reaper) = reaper();
        assert_eq!(reaper.sweep(T), 0);
    }

    #[test]
    fn test_sweep_removes_aged_out_batch() {
        let (store, window, reaper) = reaper();
        for _ in 0..5 {
            store.upsert(window.slot_of(T), 20.0);
        }
        store.upsert(window.slot_of(T + 1_000), 1.0);

        // Nothing is old enough yet.
        assert_eq!(reaper.sweep(T + 60_000), 0);
        assert_eq!(store.len(), 2);

        assert_eq!(reaper.sweep(T + 61_000), 5);
        assert_eq!(store.first_key(), Some(window.slot_of(T + 1_000)));

        assert_eq!(reaper.sweep(T + 120_000), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_sweep_keeps_lower_bound_bucket() {
        let (store, window, reaper) = reaper();
        store.upsert(window.slot_of(T - 1_000), 1.0);
        store.upsert(window.slot_of(T), 2.0);

        assert_eq!(reaper.sweep(T + 60_000), 1);
        assert_eq!(store.range_reduce(i64::MIN, i64::MAX).len(), 1);
        assert_eq!(store.first_key(), Some(window.slot_of(T)));
    }

    #[tokio::test]
    async fn test_periodic_sweep_drains_idle_store() {
        let (store, window, reaper) = reaper();
        store.upsert(window.slot_of(T), 1.0);

        let clock = Arc::new(ManualClock::new(T + 120_000));
        let cancel = CancellationToken::new();
        let handle = reaper.spawn_periodic(clock, Duration::from_millis(5), cancel.clone());

        tokio::time::timeout(Duration::from_secs(5), async {
            while !store.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("sweeper did not drain the store");

        cancel.cancel();
        handle.await.unwrap();
    }
}

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

//! Ordered concurrent map from slot key to bucket aggregate

use super::bucket::{BucketAggregate, BucketSnapshot};
use crossbeam_skiplist::SkipMap;

/// Buckets keyed by slot, kept in increasing key order.
///
/// Writers to different slots never contend. Writers to the same slot
/// serialize on that bucket's lock only.
pub struct BucketStore {
    buckets: SkipMap<i64, BucketAggregate>,
}

impl BucketStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            buckets: SkipMap::new(),
        }
    }

    /// Fold `amount` into the bucket at `slot`, creating it if needed.
    ///
    /// Racing creators of the same slot all resolve to the single entry
    /// that won the insert, so every amount lands in one bucket.
    pub fn upsert(&self, slot: i64, amount: f64) {
        let entry = self.buckets.get_or_insert_with(slot, BucketAggregate::new);
        entry.value().fold(amount);
    }

    /// Snapshots of every bucket in `[low, high]`, in increasing key order
    pub fn range_reduce(&self, low: i64, high: i64) -> Vec<BucketSnapshot> {
        if low > high {
            return Vec::new();
        }

        self.buckets
            .range(low..=high)
            .map(|entry| entry.value().snapshot())
            .collect()
    }

    /// Delete every bucket in `[low, high]`, returning the number of events removed
    pub fn remove_range(&self, low: i64, high: i64) -> u64 {
        if low > high {
            return 0;
        }

        let mut removed = 0;
        for entry in self.buckets.range(low..=high) {
            // Only the caller that actually unlinks the entry counts it.
            if entry.remove() {
                removed += entry.value().snapshot().count;
            }
        }
        removed
    }

    /// Smallest slot key currently held
    pub fn first_key(&self) -> Option<i64> {
        self.buckets.front().map(|entry| *entry.key())
    }

    /// Number of buckets
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl Default for BucketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_creates_then_folds() {
        let store = BucketStore::new();
        store.upsert(7, 10.0);
        store.upsert(7, 30.0);
        store.upsert(9, 5.0);

        assert_eq!(store.len(), 2);

        let buckets = store.range_reduce(7, 7);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[0].sum, 40.0);
        assert_eq!(buckets[0].min, Some(10.0));
        assert_eq!(buckets[0].max, Some(30.0));
    }

    #[test]
    fn test_range_reduce_is_inclusive_and_ordered() {
        let store = BucketStore::new();
        for slot in [5, 1, 3, 4, 2] {
            store.upsert(slot, slot as f64);
        }

        let sums: Vec<f64> = store.range_reduce(2, 4).iter().map(|b| b.sum).collect();
        assert_eq!(sums, vec![2.0, 3.0, 4.0]);

        assert!(store.range_reduce(6, 10).is_empty());
        assert!(store.range_reduce(4, 2).is_empty());
    }

    #[test]
    fn test_remove_range_reports_event_count() {
        let store = BucketStore::new();
        store.upsert(1, 1.0);
        store.upsert(1, 1.0);
        store.upsert(2, 1.0);
        store.upsert(3, 1.0);

        assert_eq!(store.remove_range(1, 2), 3);
        assert_eq!(store.first_key(), Some(3));
        assert_eq!(store.len(), 1);

        assert_eq!(store.remove_range(10, 20), 0);
        assert_eq!(store.remove_range(3, 1), 0);
    }

    #[test]
    fn test_negative_slots_sort_before_positive() {
        let store = BucketStore::new();
        store.upsert(0, 1.0);
        store.upsert(-2, 2.0);

        assert_eq!(store.first_key(), Some(-2));
        assert_eq!(store.range_reduce(i64::MIN, i64::MAX).len(), 2);
    }

    #[test]
    fn test_concurrent_creation_of_same_slot_keeps_every_write() {
        let store = BucketStore::new();

        std::thread::scope(|scope| {
            for worker in 0..16 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..250 {
                        // Half the writes race on a brand-new slot.
                        let slot = if i % 2 == 0 { 100 } else { 100 + worker };
                        store.upsert(slot, 1.0);
                    }
                });
            }
        });

        let buckets = store.range_reduce(100, 200);
        let total: u64 = buckets.iter().map(|b| b.count).sum();
        assert_eq!(total, 16 * 250);
        assert_eq!(store.len(), 16);
    }
}

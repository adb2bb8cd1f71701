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

//! Per-slot running aggregate

use parking_lot::Mutex;

/// Running sum/min/max/count for every event in one time slot.
///
/// All four fields sit behind one lock, so a fold is never observed
/// half-applied and a snapshot is always a consistent group.
#[derive(Debug, Default)]
pub struct BucketAggregate {
    state: Mutex<BucketSnapshot>,
}

/// Point-in-time view of a bucket
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BucketSnapshot {
    pub sum: f64,
    /// `None` iff `count == 0`
    pub min: Option<f64>,
    /// `None` iff `count == 0`
    pub max: Option<f64>,
    pub count: u64,
}

impl BucketAggregate {
    /// Create an empty bucket
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one amount into the aggregate
    pub fn fold(&self, amount: f64) {
        let mut state = self.state.lock();
        state.sum += amount;
        state.count += 1;
        state.min = Some(state.min.map_or(amount, |min| min.min(amount)));
        state.max = Some(state.max.map_or(amount, |max| max.max(amount)));
    }

    /// Returns a consistent copy of the current fields
    pub fn snapshot(&self) -> BucketSnapshot {
        *self.state.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bucket_has_no_extremes() {
        let snapshot = BucketAggregate::new().snapshot();

        assert_eq!(snapshot.count, 0);
        assert_eq!(snapshot.sum, 0.0);
        assert_eq!(snapshot.min, None);
        assert_eq!(snapshot.max, None);
    }

    #[test]
    fn test_fold_tracks_sum_and_extremes() {
        let bucket = BucketAggregate::new();
        bucket.fold(20.0);
        bucket.fold(-5.0);
        bucket.fold(0.0);
        bucket.fold(35.5);

        let snapshot = bucket.snapshot();
        assert_eq!(snapshot.count, 4);
        assert_eq!(snapshot.sum, 50.5);
        assert_eq!(snapshot.min, Some(-5.0));
        assert_eq!(snapshot.max, Some(35.5));
    }

    #[test]
    fn test_concurrent_folds_are_not_lost() {
        let bucket = BucketAggregate::new();

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let bucket = &bucket;
                scope.spawn(move || {
                    for i in 0..1_000 {
                        bucket.fold((worker * 1_000 + i) as f64);
                    }
                });
            }
        });

        let snapshot = bucket.snapshot();
        assert_eq!(snapshot.count, 8_000);
        // Integers below 2^53 sum exactly in any order.
        assert_eq!(snapshot.sum, (0..8_000).sum::<u64>() as f64);
        assert_eq!(snapshot.min, Some(0.0));
        assert_eq!(snapshot.max, Some(7_999.0));
    }
}

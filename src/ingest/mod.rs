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

//! Transaction ingestion
//!
//! Validates a transaction's timestamp against "now", folds accepted
//! transactions into the store, and sweeps stale buckets after every write.

use crate::aggregation::{AggregationEngine, BucketStore, StaleReaper, Window};
use crate::error::IngestError;
use crate::model::Transaction;
use std::sync::Arc;
use tracing::debug;

/// Entry point for writes into the aggregation engine
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<BucketStore>,
    reaper: StaleReaper,
    window: Window,
}

impl Ingestor {
    pub fn new(engine: &AggregationEngine) -> Self {
        Self {
            store: Arc::clone(engine.store()),
            reaper: engine.reaper(),
            window: engine.window(),
        }
    }

    /// Accept `tx` if its timestamp lies within `[now - validity, now]`
    pub fn submit(&self, tx: Transaction, now_ms: i64) -> Result<(), IngestError> {
        self.validate(&tx, now_ms)?;

        self.store.upsert(self.window.slot_of(tx.timestamp), tx.amount);

        let purged = self.reaper.sweep(now_ms);
        if purged > 0 {
            debug!(purged, "removed stale transactions");
        }
        Ok(())
    }

    fn validate(&self, tx: &Transaction, now_ms: i64) -> Result<(), IngestError> {
        let age_ms = now_ms.saturating_sub(tx.timestamp);
        if age_ms > self.window.validity_ms() {
            return Err(IngestError::Stale {
                age_ms,
                validity_ms: self.window.validity_ms(),
            });
        }
        if age_ms < 0 {
            return Err(IngestError::Future {
                ahead_ms: tx.timestamp.saturating_sub(now_ms),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::WindowQuery;
    use crate::error::QueryError;

    const T: i64 = 1_700_000_000_000;

    fn ingestor() -> (AggregationEngine, Ingestor, WindowQuery) {
        let engine = AggregationEngine::default();
        let ingestor = Ingestor::new(&engine);
        let query = engine.query();
        (engine, ingestor, query)
    }

    #[test]
    fn test_single_transaction_lifecycle() {
        let (_, ingestor, query) = ingestor();
        ingestor.submit(Transaction::new(15.0, T), T).unwrap();

        let stats = query.statistics(T + 30_000).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.sum, 15.0);
        assert_eq!(stats.avg, 15.0);
        assert_eq!(stats.min, 15.0);
        assert_eq!(stats.max, 15.0);

        let later = T + 61_000;
        assert_eq!(query.sum(later), 0.0);
        assert_eq!(query.count(later), 0);
        assert_eq!(query.average(later), Err(QueryError::NoRecordedTransactions));
        assert_eq!(query.minimum(later), Err(QueryError::NoRecordedTransactions));
        assert_eq!(query.maximum(later), Err(QueryError::NoRecordedTransactions));
    }

    #[test]
    fn test_future_transaction_is_rejected() {
        let (engine, ingestor, _) = ingestor();

        let err = ingestor
            .submit(Transaction::new(1.0, T + 5_000), T)
            .unwrap_err();
        assert_eq!(err, IngestError::Future { ahead_ms: 5_000 });
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_validity_boundary() {
        let (engine, ingestor, query) = ingestor();

        ingestor.submit(Transaction::new(1.0, T - 60_000), T).unwrap();
        assert_eq!(query.count(T), 1);

        let err = ingestor
            .submit(Transaction::new(1.0, T - 60_001), T)
            .unwrap_err();
        assert_eq!(
            err,
            IngestError::Stale {
                age_ms: 60_001,
                validity_ms: 60_000,
            }
        );
        assert_eq!(engine.store().len(), 1);
    }

    #[test]
    fn test_zero_and_negative_amounts_fold_as_is() {
        let (_, ingestor, query) = ingestor();
        ingestor.submit(Transaction::new(0.0, T), T).unwrap();
        ingestor.submit(Transaction::new(-12.5, T), T).unwrap();

        assert_eq!(query.count(T), 2);
        assert_eq!(query.minimum(T), Ok(-12.5));
        assert_eq!(query.maximum(T), Ok(0.0));
    }

    #[test]
    fn test_accepted_write_sweeps_stale_buckets() {
        let (engine, ingestor, query) = ingestor();
        for _ in 0..5 {
            ingestor.submit(Transaction::new(20.0, T), T).unwrap();
        }

        let later = T + 61_000;
        ingestor.submit(Transaction::new(7.0, later), later).unwrap();

        assert_eq!(engine.store().len(), 1);
        assert_eq!(query.count(later), 1);
        assert_eq!(query.sum(later), 7.0);
    }

    #[test]
    fn test_extreme_timestamps_do_not_overflow() {
        let (_, ingestor, _) = ingestor();

        assert!(matches!(
            ingestor.submit(Transaction::new(1.0, i64::MIN), i64::MAX),
            Err(IngestError::Stale { .. })
        ));
        assert!(matches!(
            ingestor.submit(Transaction::new(1.0, i64::MAX), i64::MIN),
            Err(IngestError::Future { .. })
        ));
    }
}

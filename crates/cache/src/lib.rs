//! In-memory store of submission results keyed by billing-order id, with
//! thread-safe access.
//!
//! It records what the persistence layer is expected to keep: the billing
//! order of each batch, the fulfillment order of every confirmed recipient,
//! and the failed recipients awaiting manual reconciliation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use model::{FulfillmentFailure, RecipientOutcome, SubmissionResult};
use serde::Serialize;
use tokio::sync::RwLock;

/// A submission as recorded, with the time it was recorded.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub result: SubmissionResult,
    pub recorded_at: DateTime<Utc>,
}

/// Thread-safe in-memory submission store.
#[derive(Debug, Default)]
pub struct SubmissionCache {
    inner: Arc<RwLock<HashMap<String, SubmissionRecord>>>,
}

impl SubmissionCache {
    /// Create a new, empty cache.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get a cloned record by its billing-order id (None if not found).
    pub async fn get(&self, billing_order_id: &str) -> Option<SubmissionRecord> {
        let map = self.inner.read().await;
        map.get(billing_order_id).cloned()
    }

    /// Insert or replace the record of a submission.
    pub async fn set(&self, result: SubmissionResult) -> SubmissionRecord {
        let record = SubmissionRecord {
            result,
            recorded_at: Utc::now(),
        };
        let mut map = self.inner.write().await;
        map.insert(record.result.billing_order.id.clone(), record.clone());
        record
    }

    /// All records, oldest first.
    pub async fn get_all(&self) -> Vec<SubmissionRecord> {
        let map = self.inner.read().await;
        let mut records: Vec<SubmissionRecord> = map.values().cloned().collect();
        records.sort_by(|a, b| {
            a.recorded_at
                .cmp(&b.recorded_at)
                .then_with(|| a.result.billing_order.id.cmp(&b.result.billing_order.id))
        });
        records
    }

    /// Fulfillment-order id recorded for a recipient, if it was confirmed.
    pub async fn fulfillment_order_id(&self, recipient_id: &str) -> Option<String> {
        let map = self.inner.read().await;
        map.values()
            .flat_map(|record| record.result.outcomes.iter())
            .find_map(|outcome| match outcome {
                RecipientOutcome::Confirmed(order) if order.recipient_id == recipient_id => {
                    Some(order.id.clone())
                }
                _ => None,
            })
    }

    /// Failed recipients of every recorded submission, for manual reconciliation.
    pub async fn unreconciled(&self) -> Vec<FulfillmentFailure> {
        self.get_all()
            .await
            .into_iter()
            .flat_map(|record| record.result.outcomes)
            .filter_map(|outcome| match outcome {
                RecipientOutcome::Failed(failure) => Some(failure),
                RecipientOutcome::Confirmed(_) => None,
            })
            .collect()
    }
}

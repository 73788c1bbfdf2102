use std::sync::Arc;

use crate::{
    error::NotificationError,
    models::{metrics::MetricsSnapshot, status::AggregateStatus},
    store::StatusStore,
};

pub struct MetricsAggregator {
    store: Arc<dyn StatusStore>,
}

impl MetricsAggregator {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self { store }
    }

    /// Point-in-time totals. PARTIAL_FAILURE is reported on its own and is
    /// not counted as failed.
    pub async fn snapshot(&self) -> Result<MetricsSnapshot, NotificationError> {
        let by_status = self.store.counts_by_aggregate_status().await?;

        let count = |status: AggregateStatus| by_status.get(&status).copied().unwrap_or(0);

        Ok(MetricsSnapshot {
            total_sent: by_status.values().sum(),
            total_success: count(AggregateStatus::Completed),
            total_failed: count(AggregateStatus::Failed),
            by_status,
        })
    }
}

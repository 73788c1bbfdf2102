use std::{collections::BTreeMap, collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::{
    error::NotificationError,
    models::status::{AggregateStatus, ChannelStatus, NotificationStatusRecord},
    store::StatusStore,
};

/// Process-local store. Each record sits behind its own mutex so updates to
/// different notifications never contend.
#[derive(Default)]
pub struct InMemoryStatusStore {
    records: RwLock<HashMap<String, Arc<Mutex<NotificationStatusRecord>>>>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, notification_id: &str) -> Option<Arc<Mutex<NotificationStatusRecord>>> {
        self.records.read().get(notification_id).cloned()
    }
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
    fn backend(&self) -> &'static str {
        "in_memory"
    }

    async fn create(
        &self,
        notification_id: &str,
        channels: &[String],
    ) -> Result<NotificationStatusRecord, NotificationError> {
        let mut records = self.records.write();

        if records.contains_key(notification_id) {
            return Err(NotificationError::DuplicateNotification(
                notification_id.to_string(),
            ));
        }

        let record = NotificationStatusRecord::new(notification_id.to_string(), channels);
        records.insert(
            notification_id.to_string(),
            Arc::new(Mutex::new(record.clone())),
        );

        Ok(record)
    }

    async fn get(
        &self,
        notification_id: &str,
    ) -> Result<Option<NotificationStatusRecord>, NotificationError> {
        Ok(self
            .entry(notification_id)
            .map(|record| record.lock().clone()))
    }

    async fn update_channel(
        &self,
        notification_id: &str,
        channel: &str,
        status: ChannelStatus,
    ) -> Result<Option<NotificationStatusRecord>, NotificationError> {
        let Some(entry) = self.entry(notification_id) else {
            debug!(notification_id, channel, "Status update for unknown notification ignored");
            return Ok(None);
        };

        let mut record = entry.lock();
        record.apply_channel_status(channel, status)?;

        Ok(Some(record.clone()))
    }

    async fn counts_by_aggregate_status(
        &self,
    ) -> Result<BTreeMap<AggregateStatus, u64>, NotificationError> {
        let records = self.records.read();
        let mut counts = BTreeMap::new();

        for record in records.values() {
            let status = record.lock().aggregate_status;
            *counts.entry(status).or_insert(0) += 1;
        }

        Ok(counts)
    }

    async fn health_check(&self) -> Result<(), NotificationError> {
        Ok(())
    }
}

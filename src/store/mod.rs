//! Per-notification status records.
//!
//! [`StatusStore::update_channel`] is the single mutation primitive. Every
//! backend must make it atomic per notification identifier so two channels of
//! the same notification finishing at once never lose a write.

mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::{
    error::NotificationError,
    models::status::{AggregateStatus, ChannelStatus, NotificationStatusRecord},
};

pub use memory::InMemoryStatusStore;

#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Short backend name reported by the health check.
    fn backend(&self) -> &'static str;

    /// Create-if-absent. Every channel starts PENDING and the aggregate ENQUEUED.
    async fn create(
        &self,
        notification_id: &str,
        channels: &[String],
    ) -> Result<NotificationStatusRecord, NotificationError>;

    async fn get(
        &self,
        notification_id: &str,
    ) -> Result<Option<NotificationStatusRecord>, NotificationError>;

    /// Returns `Ok(None)` without writing anything when the notification is
    /// unknown. A channel outside the record's channel set is rejected.
    async fn update_channel(
        &self,
        notification_id: &str,
        channel: &str,
        status: ChannelStatus,
    ) -> Result<Option<NotificationStatusRecord>, NotificationError>;

    async fn counts_by_aggregate_status(
        &self,
    ) -> Result<BTreeMap<AggregateStatus, u64>, NotificationError>;

    async fn health_check(&self) -> Result<(), NotificationError>;
}

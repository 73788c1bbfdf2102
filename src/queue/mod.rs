//! At-least-once notification queue.
//!
//! A delivery stays unacknowledged until the consumer calls
//! [`NotificationQueue::acknowledge`]; rejecting it with `requeue` set makes it
//! visible again with `redelivered` flagged.

mod memory;

use async_trait::async_trait;

use crate::{error::NotificationError, models::message::QueuedNotification};

pub use memory::InMemoryQueue;

#[derive(Debug, Clone)]
pub struct Delivery {
    pub delivery_tag: u64,
    /// Publish key, the notification identifier.
    pub key: Option<String>,
    pub data: Vec<u8>,
    pub redelivered: bool,
}

#[async_trait]
pub trait NotificationQueue: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn publish(&self, message: &QueuedNotification) -> Result<(), NotificationError>;

    /// Waits for the next delivery. `Ok(None)` means the queue was closed on
    /// purpose and drained; a broker subscription that drops is an `Err`, and
    /// callers retry.
    async fn receive(&self) -> Result<Option<Delivery>, NotificationError>;

    async fn acknowledge(&self, delivery_tag: u64) -> Result<(), NotificationError>;

    async fn reject(&self, delivery_tag: u64, requeue: bool) -> Result<(), NotificationError>;

    async fn health_check(&self) -> Result<(), NotificationError>;
}

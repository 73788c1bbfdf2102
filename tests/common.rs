use std::{
    collections::{BTreeMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use notification_service::{
    channels::{ChannelAdapter, ChannelRegistry, EmailAdapter, PushAdapter, SmsAdapter},
    error::{DeliveryError, NotificationError},
    models::{
        message::{NotificationRequest, QueuedNotification},
        status::{AggregateStatus, ChannelStatus, NotificationStatusRecord},
    },
    queue::{Delivery, InMemoryQueue, NotificationQueue},
    store::StatusStore,
};
use parking_lot::Mutex;

pub fn request(channels: &[&str], recipients: &[&str], message: &str) -> NotificationRequest {
    NotificationRequest {
        channels: channels.iter().map(|c| c.to_string()).collect(),
        recipient_ids: recipients.iter().map(|r| r.to_string()).collect(),
        message: message.to_string(),
        metadata: Default::default(),
    }
}

pub fn queued(notification_id: &str, request: NotificationRequest) -> QueuedNotification {
    QueuedNotification {
        notification_id: notification_id.to_string(),
        request,
    }
}

/// The standard channels without simulated provider latency.
pub fn instant_registry() -> ChannelRegistry {
    ChannelRegistry::new(vec![
        Arc::new(EmailAdapter::with_latency(Duration::ZERO)),
        Arc::new(SmsAdapter::with_latency(Duration::ZERO)),
        Arc::new(PushAdapter::with_latency(Duration::ZERO)),
    ])
}

/// Adapter that records every delivery attempt and fails for chosen recipients.
pub struct ScriptedAdapter {
    name: String,
    failing_recipients: HashSet<String>,
    fail_all: bool,
    attempts: Mutex<Vec<String>>,
}

impl ScriptedAdapter {
    pub fn succeeding(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            failing_recipients: HashSet::new(),
            fail_all: false,
            attempts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            failing_recipients: HashSet::new(),
            fail_all: true,
            attempts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_for(name: &str, recipients: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            failing_recipients: recipients.iter().map(|r| r.to_string()).collect(),
            fail_all: false,
            attempts: Mutex::new(Vec::new()),
        })
    }

    pub fn attempts(&self) -> Vec<String> {
        let mut attempts = self.attempts.lock().clone();
        attempts.sort();
        attempts
    }
}

#[async_trait]
impl ChannelAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, recipient_id: &str, _message: &str) -> Result<(), DeliveryError> {
        self.attempts.lock().push(recipient_id.to_string());

        if self.fail_all || self.failing_recipients.contains(recipient_id) {
            return Err(DeliveryError::new(&self.name, recipient_id, "provider rejected"));
        }

        Ok(())
    }
}

/// Queue whose publish always fails, as if the broker were unreachable.
pub struct UnreachableQueue;

#[async_trait]
impl NotificationQueue for UnreachableQueue {
    fn backend(&self) -> &'static str {
        "unreachable"
    }

    async fn publish(&self, _message: &QueuedNotification) -> Result<(), NotificationError> {
        Err(NotificationError::DispatchQueue("connection refused".to_string()))
    }

    async fn receive(&self) -> Result<Option<Delivery>, NotificationError> {
        Err(NotificationError::DispatchQueue("connection refused".to_string()))
    }

    async fn acknowledge(&self, _delivery_tag: u64) -> Result<(), NotificationError> {
        Err(NotificationError::DispatchQueue("connection refused".to_string()))
    }

    async fn reject(&self, _delivery_tag: u64, _requeue: bool) -> Result<(), NotificationError> {
        Err(NotificationError::DispatchQueue("connection refused".to_string()))
    }

    async fn health_check(&self) -> Result<(), NotificationError> {
        Err(NotificationError::DispatchQueue("connection refused".to_string()))
    }
}

/// Queue whose publish never completes.
pub struct StalledQueue;

#[async_trait]
impl NotificationQueue for StalledQueue {
    fn backend(&self) -> &'static str {
        "stalled"
    }

    async fn publish(&self, _message: &QueuedNotification) -> Result<(), NotificationError> {
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn receive(&self) -> Result<Option<Delivery>, NotificationError> {
        Ok(None)
    }

    async fn acknowledge(&self, _delivery_tag: u64) -> Result<(), NotificationError> {
        Ok(())
    }

    async fn reject(&self, _delivery_tag: u64, _requeue: bool) -> Result<(), NotificationError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<(), NotificationError> {
        Ok(())
    }
}

/// In-memory queue whose subscription drops a set number of times before
/// it starts handing out deliveries.
pub struct DroppingQueue {
    inner: InMemoryQueue,
    drops_left: AtomicUsize,
    receive_calls: AtomicUsize,
}

impl DroppingQueue {
    pub fn new(drops: usize) -> Self {
        Self {
            inner: InMemoryQueue::new(),
            drops_left: AtomicUsize::new(drops),
            receive_calls: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &InMemoryQueue {
        &self.inner
    }

    pub fn receive_calls(&self) -> usize {
        self.receive_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationQueue for DroppingQueue {
    fn backend(&self) -> &'static str {
        "dropping"
    }

    async fn publish(&self, message: &QueuedNotification) -> Result<(), NotificationError> {
        self.inner.publish(message).await
    }

    async fn receive(&self) -> Result<Option<Delivery>, NotificationError> {
        self.receive_calls.fetch_add(1, Ordering::SeqCst);

        let dropped = self
            .drops_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if dropped {
            return Err(NotificationError::DispatchQueue(
                "Consumer stream ended".to_string(),
            ));
        }

        self.inner.receive().await
    }

    async fn acknowledge(&self, delivery_tag: u64) -> Result<(), NotificationError> {
        self.inner.acknowledge(delivery_tag).await
    }

    async fn reject(&self, delivery_tag: u64, requeue: bool) -> Result<(), NotificationError> {
        self.inner.reject(delivery_tag, requeue).await
    }

    async fn health_check(&self) -> Result<(), NotificationError> {
        self.inner.health_check().await
    }
}

/// Store that has records but cannot write, as if the backend went away
/// mid-dispatch.
pub struct ReadOnlyStore {
    record: NotificationStatusRecord,
    write_attempts: AtomicUsize,
}

impl ReadOnlyStore {
    pub fn new(record: NotificationStatusRecord) -> Self {
        Self {
            record,
            write_attempts: AtomicUsize::new(0),
        }
    }

    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusStore for ReadOnlyStore {
    fn backend(&self) -> &'static str {
        "read_only"
    }

    async fn create(
        &self,
        _notification_id: &str,
        _channels: &[String],
    ) -> Result<NotificationStatusRecord, NotificationError> {
        Err(NotificationError::Store("read only".to_string()))
    }

    async fn get(
        &self,
        _notification_id: &str,
    ) -> Result<Option<NotificationStatusRecord>, NotificationError> {
        Ok(Some(self.record.clone()))
    }

    async fn update_channel(
        &self,
        _notification_id: &str,
        _channel: &str,
        _status: ChannelStatus,
    ) -> Result<Option<NotificationStatusRecord>, NotificationError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        Err(NotificationError::Store("read only".to_string()))
    }

    async fn counts_by_aggregate_status(
        &self,
    ) -> Result<BTreeMap<AggregateStatus, u64>, NotificationError> {
        Ok(BTreeMap::from([(self.record.aggregate_status, 1)]))
    }

    async fn health_check(&self) -> Result<(), NotificationError> {
        Err(NotificationError::Store("read only".to_string()))
    }
}

pub fn channel_map(entries: &[(&str, ChannelStatus)]) -> BTreeMap<String, ChannelStatus> {
    entries
        .iter()
        .map(|(channel, status)| (channel.to_string(), *status))
        .collect()
}

pub fn scripted_registry(adapters: Vec<Arc<ScriptedAdapter>>) -> ChannelRegistry {
    ChannelRegistry::new(
        adapters
            .into_iter()
            .map(|adapter| adapter as Arc<dyn ChannelAdapter>)
            .collect(),
    )
}

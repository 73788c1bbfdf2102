use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use crate::{
    error::NotificationError,
    models::message::QueuedNotification,
    queue::{Delivery, NotificationQueue},
};

#[derive(Default)]
struct QueueState {
    ready: VecDeque<Delivery>,
    unacked: HashMap<u64, Delivery>,
    next_tag: u64,
    closed: bool,
}

/// Single-process queue with the same ack/reject contract as the broker.
#[derive(Default)]
pub struct InMemoryQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops accepting publishes. Receivers drain what is ready, then get `None`.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.notify.notify_waiters();
    }

    pub fn ready_count(&self) -> usize {
        self.state.lock().ready.len()
    }

    pub fn unacked_count(&self) -> usize {
        self.state.lock().unacked.len()
    }

    /// Enqueues an already-encoded payload under `key`.
    pub fn publish_raw(&self, key: Option<String>, data: Vec<u8>) -> Result<(), NotificationError> {
        let mut state = self.state.lock();

        if state.closed {
            return Err(NotificationError::DispatchQueue(
                "Queue is closed".to_string(),
            ));
        }

        state.next_tag += 1;
        let delivery = Delivery {
            delivery_tag: state.next_tag,
            key,
            data,
            redelivered: false,
        };
        state.ready.push_back(delivery);
        drop(state);

        self.notify.notify_one();
        Ok(())
    }
}

#[async_trait]
impl NotificationQueue for InMemoryQueue {
    fn backend(&self) -> &'static str {
        "in_memory"
    }

    async fn publish(&self, message: &QueuedNotification) -> Result<(), NotificationError> {
        let payload = serde_json::to_vec(message)?;
        self.publish_raw(Some(message.notification_id.clone()), payload)?;

        debug!(notification_id = %message.notification_id, "Message published to in-memory queue");
        Ok(())
    }

    async fn receive(&self) -> Result<Option<Delivery>, NotificationError> {
        loop {
            let notified = self.notify.notified();

            {
                let mut state = self.state.lock();
                if let Some(delivery) = state.ready.pop_front() {
                    state.unacked.insert(delivery.delivery_tag, delivery.clone());
                    return Ok(Some(delivery));
                }
                if state.closed {
                    return Ok(None);
                }
            }

            notified.await;
        }
    }

    async fn acknowledge(&self, delivery_tag: u64) -> Result<(), NotificationError> {
        self.state
            .lock()
            .unacked
            .remove(&delivery_tag)
            .map(|_| ())
            .ok_or_else(|| {
                NotificationError::DispatchQueue(format!("Unknown delivery tag {}", delivery_tag))
            })
    }

    async fn reject(&self, delivery_tag: u64, requeue: bool) -> Result<(), NotificationError> {
        let mut state = self.state.lock();

        let mut delivery = state.unacked.remove(&delivery_tag).ok_or_else(|| {
            NotificationError::DispatchQueue(format!("Unknown delivery tag {}", delivery_tag))
        })?;

        if requeue {
            delivery.redelivered = true;
            state.ready.push_front(delivery);
            drop(state);
            self.notify.notify_one();
        }

        Ok(())
    }

    async fn health_check(&self) -> Result<(), NotificationError> {
        if self.state.lock().closed {
            return Err(NotificationError::DispatchQueue(
                "Queue is closed".to_string(),
            ));
        }
        Ok(())
    }
}

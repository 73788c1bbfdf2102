use std::{sync::Arc, time::Duration};

use tokio::time::timeout;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    error::NotificationError,
    models::{
        message::{NotificationRequest, QueuedNotification},
        validation::validate_request,
    },
    queue::NotificationQueue,
    store::StatusStore,
};

pub struct NotificationService {
    store: Arc<dyn StatusStore>,
    queue: Arc<dyn NotificationQueue>,
    publish_timeout: Duration,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn StatusStore>,
        queue: Arc<dyn NotificationQueue>,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            store,
            queue,
            publish_timeout,
        }
    }

    /// Seeds the status record, then publishes the request keyed by its new
    /// identifier. The record exists before the message can be consumed, so a
    /// status lookup right after this returns never misses.
    pub async fn enqueue(&self, request: NotificationRequest) -> Result<String, NotificationError> {
        validate_request(&request)?;

        let notification_id = Uuid::new_v4().to_string();

        self.store.create(&notification_id, &request.channels).await?;

        info!(
            notification_id = %notification_id,
            channels = ?request.channels,
            recipients = request.recipient_ids.len(),
            "Enqueuing notification"
        );

        let message = QueuedNotification {
            notification_id: notification_id.clone(),
            request,
        };

        match timeout(self.publish_timeout, self.queue.publish(&message)).await {
            Ok(Ok(())) => Ok(notification_id),
            Ok(Err(e)) => {
                error!(notification_id = %notification_id, error = %e, "Failed to publish notification");
                Err(e)
            }
            Err(_) => {
                error!(
                    notification_id = %notification_id,
                    timeout_ms = self.publish_timeout.as_millis() as u64,
                    "Timed out publishing notification"
                );
                Err(NotificationError::DispatchQueue(format!(
                    "Publishing notification {} timed out after {}ms",
                    notification_id,
                    self.publish_timeout.as_millis()
                )))
            }
        }
    }
}

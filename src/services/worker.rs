use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, time::sleep};
use tracing::{error, info, warn};

use crate::{
    models::message::QueuedNotification,
    queue::{Delivery, NotificationQueue},
    services::dispatcher::Dispatcher,
};

const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_secs(1);
const REQUEUE_BACKOFF: Duration = Duration::from_secs(1);

/// What the worker told the queue about a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryAction {
    Acknowledged,
    /// Undecodable payload, dropped without requeue.
    Rejected,
    /// Left for redelivery after a status store failure.
    Requeued,
}

/// Consumes the queue until it closes or `shutdown` flips to `true`.
///
/// Shutdown is only observed between messages; a message that is being
/// dispatched always runs to completion first. After a receive error or a
/// requeue the worker pauses before pulling again, so a failing status store
/// is not hammered by its own redeliveries.
pub async fn run_worker(
    worker_id: usize,
    queue: Arc<dyn NotificationQueue>,
    dispatcher: Arc<Dispatcher>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(worker_id, backend = queue.backend(), "Worker started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let received = tokio::select! {
            _ = shutdown.changed() => break,
            received = queue.receive() => received,
        };

        let pause = match received {
            Ok(Some(delivery)) => {
                match process_delivery(queue.as_ref(), &dispatcher, delivery).await {
                    DeliveryAction::Requeued => Some(REQUEUE_BACKOFF),
                    DeliveryAction::Acknowledged | DeliveryAction::Rejected => None,
                }
            }
            Ok(None) => {
                info!(worker_id, "Queue closed");
                break;
            }
            Err(e) => {
                warn!(worker_id, error = %e, "Failed to receive from queue, backing off");
                Some(RECEIVE_ERROR_BACKOFF)
            }
        };

        if let Some(pause) = pause {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = sleep(pause) => {}
            }
        }
    }

    info!(worker_id, "Worker stopped");
}

pub async fn process_delivery(
    queue: &dyn NotificationQueue,
    dispatcher: &Dispatcher,
    delivery: Delivery,
) -> DeliveryAction {
    let delivery_tag = delivery.delivery_tag;

    let message = match serde_json::from_slice::<QueuedNotification>(&delivery.data) {
        Ok(message) => message,
        Err(e) => {
            error!(
                delivery_tag,
                key = ?delivery.key,
                error = %e,
                "Failed to parse notification payload, rejecting"
            );
            if let Err(e) = queue.reject(delivery_tag, false).await {
                error!(delivery_tag, error = %e, "Failed to reject message");
            }
            return DeliveryAction::Rejected;
        }
    };

    if delivery.redelivered {
        info!(
            delivery_tag,
            notification_id = %message.notification_id,
            "Reprocessing redelivered notification"
        );
    }

    match dispatcher.dispatch(&message).await {
        Ok(_) => {
            if let Err(e) = queue.acknowledge(delivery_tag).await {
                error!(delivery_tag, error = %e, "Failed to acknowledge message");
            }
            DeliveryAction::Acknowledged
        }
        Err(e) => {
            error!(
                delivery_tag,
                notification_id = %message.notification_id,
                error = %e,
                "Dispatch interrupted, requeueing message"
            );
            if let Err(e) = queue.reject(delivery_tag, true).await {
                error!(delivery_tag, error = %e, "Failed to requeue message");
            }
            DeliveryAction::Requeued
        }
    }
}

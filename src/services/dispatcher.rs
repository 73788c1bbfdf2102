use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, error, info, warn};

use crate::{
    channels::ChannelRegistry,
    error::NotificationError,
    models::{message::QueuedNotification, status::ChannelStatus},
    store::StatusStore,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelOutcome {
    pub channel: String,
    pub status: ChannelStatus,
    pub failed_recipients: Vec<String>,
    pub error: Option<String>,
}

impl ChannelOutcome {
    fn unsupported(channel: &str, error: &NotificationError) -> Self {
        Self {
            channel: channel.to_string(),
            status: ChannelStatus::Failed,
            failed_recipients: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub notification_id: String,
    pub channels: Vec<ChannelOutcome>,
}

impl DispatchReport {
    pub fn completed_count(&self) -> usize {
        self.channels
            .iter()
            .filter(|c| c.status == ChannelStatus::Completed)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.channels.len() - self.completed_count()
    }
}

pub struct Dispatcher {
    store: Arc<dyn StatusStore>,
    registry: Arc<ChannelRegistry>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn StatusStore>, registry: Arc<ChannelRegistry>) -> Self {
        Self { store, registry }
    }

    /// Delivers every channel of one queued notification, in request order.
    ///
    /// A channel failure is recorded against that channel only. The error
    /// path is reserved for status store failures, which leave the message
    /// unacknowledged so it can be redelivered.
    pub async fn dispatch(
        &self,
        message: &QueuedNotification,
    ) -> Result<DispatchReport, NotificationError> {
        let notification_id = message.notification_id.as_str();
        let request = &message.request;

        info!(
            notification_id,
            channels = ?request.channels,
            recipients = request.recipient_ids.len(),
            "Processing notification"
        );

        let mut outcomes = Vec::with_capacity(request.channels.len());

        for channel in &request.channels {
            self.record(notification_id, channel, ChannelStatus::Processing)
                .await?;

            let outcome = self
                .deliver_channel(notification_id, channel, &request.recipient_ids, &request.message)
                .await;

            self.record(notification_id, channel, outcome.status).await?;
            outcomes.push(outcome);
        }

        let report = DispatchReport {
            notification_id: notification_id.to_string(),
            channels: outcomes,
        };

        info!(
            notification_id,
            completed = report.completed_count(),
            failed = report.failed_count(),
            "Notification processed"
        );

        Ok(report)
    }

    async fn deliver_channel(
        &self,
        notification_id: &str,
        channel: &str,
        recipient_ids: &[String],
        message: &str,
    ) -> ChannelOutcome {
        let adapter = match self.registry.resolve(channel) {
            Ok(adapter) => adapter,
            Err(e) => {
                warn!(notification_id, channel, error = %e, "No adapter found for channel");
                return ChannelOutcome::unsupported(channel, &e);
            }
        };

        let results = join_all(
            recipient_ids
                .iter()
                .map(|recipient_id| adapter.deliver(recipient_id, message)),
        )
        .await;

        let mut failed_recipients = Vec::new();
        let mut last_error = None;

        for (recipient_id, result) in recipient_ids.iter().zip(results) {
            if let Err(e) = result {
                error!(
                    notification_id,
                    channel,
                    recipient_id = %recipient_id,
                    error = %e,
                    "Delivery failed"
                );
                failed_recipients.push(recipient_id.clone());
                last_error = Some(e.to_string());
            }
        }

        let status = if failed_recipients.is_empty() {
            ChannelStatus::Completed
        } else {
            ChannelStatus::Failed
        };

        ChannelOutcome {
            channel: channel.to_string(),
            status,
            failed_recipients,
            error: last_error,
        }
    }

    async fn record(
        &self,
        notification_id: &str,
        channel: &str,
        status: ChannelStatus,
    ) -> Result<(), NotificationError> {
        match self.store.update_channel(notification_id, channel, status).await {
            Ok(Some(record)) => {
                debug!(
                    notification_id,
                    channel,
                    channel_status = %status,
                    aggregate_status = %record.aggregate_status,
                    "Channel status recorded"
                );
                Ok(())
            }
            Ok(None) => {
                warn!(notification_id, channel, "Status record missing, transition not recorded");
                Ok(())
            }
            Err(e @ NotificationError::UnknownChannel { .. }) => {
                warn!(notification_id, channel, error = %e, "Channel not tracked by status record");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

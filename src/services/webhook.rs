use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    error::NotificationError,
    models::{
        status::{ChannelStatus, NotificationStatusRecord},
        validation::require_field,
        webhook::WebhookPayload,
    },
    store::StatusStore,
};

/// Entry point for delivery confirmations that arrive out of band. Writes go
/// through the same store primitive as the worker, so the aggregate is always
/// computed the same way.
pub struct WebhookReceiver {
    store: Arc<dyn StatusStore>,
}

impl WebhookReceiver {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self { store }
    }

    /// Returns `Ok(None)` when the notification is unknown; nothing is written.
    pub async fn receive(
        &self,
        payload: &WebhookPayload,
    ) -> Result<Option<NotificationStatusRecord>, NotificationError> {
        let notification_id = require_field("notification_id", payload.notification_id.as_deref())?;
        let channel = require_field("channel", payload.channel.as_deref())?;
        let status: ChannelStatus = require_field("status", payload.status.as_deref())?.parse()?;

        let updated = self
            .store
            .update_channel(notification_id, channel, status)
            .await?;

        match &updated {
            Some(record) => info!(
                notification_id,
                channel,
                channel_status = %status,
                aggregate_status = %record.aggregate_status,
                "Webhook status update applied"
            ),
            None => warn!(notification_id, channel, "Webhook for unknown notification ignored"),
        }

        Ok(updated)
    }
}

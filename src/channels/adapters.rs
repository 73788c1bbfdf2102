use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::info;

use crate::{channels::ChannelAdapter, error::DeliveryError};

// Stand-ins for provider calls. Each one only waits out a typical provider
// round trip before reporting success.

pub struct EmailAdapter {
    latency: Duration,
}

impl EmailAdapter {
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for EmailAdapter {
    fn default() -> Self {
        Self::with_latency(Duration::from_millis(200))
    }
}

#[async_trait]
impl ChannelAdapter for EmailAdapter {
    fn name(&self) -> &str {
        "email"
    }

    async fn deliver(&self, recipient_id: &str, message: &str) -> Result<(), DeliveryError> {
        info!(recipient_id, message_len = message.len(), "Sending email");
        sleep(self.latency).await;
        Ok(())
    }
}

pub struct SmsAdapter {
    latency: Duration,
}

impl SmsAdapter {
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for SmsAdapter {
    fn default() -> Self {
        Self::with_latency(Duration::from_millis(500))
    }
}

#[async_trait]
impl ChannelAdapter for SmsAdapter {
    fn name(&self) -> &str {
        "sms"
    }

    async fn deliver(&self, recipient_id: &str, message: &str) -> Result<(), DeliveryError> {
        info!(recipient_id, message_len = message.len(), "Sending SMS");
        sleep(self.latency).await;
        Ok(())
    }
}

pub struct PushAdapter {
    latency: Duration,
}

impl PushAdapter {
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for PushAdapter {
    fn default() -> Self {
        Self::with_latency(Duration::from_millis(100))
    }
}

#[async_trait]
impl ChannelAdapter for PushAdapter {
    fn name(&self) -> &str {
        "push"
    }

    async fn deliver(&self, recipient_id: &str, message: &str) -> Result<(), DeliveryError> {
        info!(recipient_id, message_len = message.len(), "Sending push notification");
        sleep(self.latency).await;
        Ok(())
    }
}

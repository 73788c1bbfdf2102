//! Delivery channels and the registry that resolves them.

mod adapters;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{DeliveryError, NotificationError};

pub use adapters::{EmailAdapter, PushAdapter, SmsAdapter};

#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Canonical channel name, e.g. `email`.
    fn name(&self) -> &str;

    fn supports(&self, channel: &str) -> bool {
        channel.trim().eq_ignore_ascii_case(self.name())
    }

    async fn deliver(&self, recipient_id: &str, message: &str) -> Result<(), DeliveryError>;
}

/// Ordered adapter list. Resolution is a first-match scan, so registration
/// order decides ties.
pub struct ChannelRegistry {
    adapters: Vec<Arc<dyn ChannelAdapter>>,
}

impl ChannelRegistry {
    pub fn new(adapters: Vec<Arc<dyn ChannelAdapter>>) -> Self {
        Self { adapters }
    }

    pub fn register(&mut self, adapter: Arc<dyn ChannelAdapter>) {
        self.adapters.push(adapter);
    }

    pub fn resolve(&self, channel: &str) -> Result<Arc<dyn ChannelAdapter>, NotificationError> {
        self.adapters
            .iter()
            .find(|adapter| adapter.supports(channel))
            .cloned()
            .ok_or_else(|| NotificationError::UnsupportedChannel(channel.to_string()))
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.name().to_string()).collect()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new(vec![
            Arc::new(EmailAdapter::default()),
            Arc::new(SmsAdapter::default()),
            Arc::new(PushAdapter::default()),
        ])
    }
}

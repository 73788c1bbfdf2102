use serde::{Deserialize, Serialize};

/// Out-of-band delivery confirmation. Fields are optional on the wire so a
/// missing one surfaces as a validation error rather than a decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub notification_id: Option<String>,
    pub channel: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookOutcome {
    Updated,
    Ignored,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: WebhookOutcome,
}

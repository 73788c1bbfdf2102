use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub channels: Vec<String>,

    #[serde(rename = "recipientIds", alias = "recipient_ids")]
    pub recipient_ids: Vec<String>,

    pub message: String,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, JsonValue>,
}

/// Queue payload: one message per notification, keyed by its identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedNotification {
    pub notification_id: String,
    pub request: NotificationRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueResponse {
    pub notification_id: String,
    pub status: String,
}

impl EnqueueResponse {
    pub fn enqueued(notification_id: String) -> Self {
        Self {
            notification_id,
            status: "enqueued".to_string(),
        }
    }
}

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::models::response::ApiResponse;

/// Adapter-level failure to deliver a message to one recipient.
#[derive(Debug, Clone, Error)]
#[error("{channel} delivery to '{recipient_id}' failed: {reason}")]
pub struct DeliveryError {
    pub channel: String,
    pub recipient_id: String,
    pub reason: String,
}

impl DeliveryError {
    pub fn new(channel: &str, recipient_id: &str, reason: impl Into<String>) -> Self {
        Self {
            channel: channel.to_string(),
            recipient_id: recipient_id.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Notification {0} already exists")]
    DuplicateNotification(String),

    #[error("Channel '{channel}' is not part of notification {notification_id}")]
    UnknownChannel {
        notification_id: String,
        channel: String,
    },

    #[error("Unsupported channel: {0}")]
    UnsupportedChannel(String),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("Dispatch queue error: {0}")]
    DispatchQueue(String),

    #[error("Notification {0} not found")]
    UnknownNotification(String),

    #[error("Status store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NotificationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            NotificationError::Validation(_) | NotificationError::UnknownChannel { .. } => {
                StatusCode::BAD_REQUEST
            }
            NotificationError::DuplicateNotification(_) => StatusCode::CONFLICT,
            NotificationError::UnknownNotification(_) => StatusCode::NOT_FOUND,
            NotificationError::DispatchQueue(_) => StatusCode::SERVICE_UNAVAILABLE,
            NotificationError::UnsupportedChannel(_)
            | NotificationError::Delivery(_)
            | NotificationError::Store(_)
            | NotificationError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for NotificationError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let message = match status {
            StatusCode::BAD_REQUEST => "Invalid request",
            StatusCode::CONFLICT => "Conflict",
            StatusCode::NOT_FOUND => "Not found",
            StatusCode::SERVICE_UNAVAILABLE => "Service unavailable",
            _ => "Internal server error",
        };

        let body = ApiResponse::<()>::error(self.to_string(), message.to_string());
        (status, Json(body)).into_response()
    }
}

use crate::{error::NotificationError, models::message::NotificationRequest};

pub fn validate_request(request: &NotificationRequest) -> Result<(), NotificationError> {
    if request.channels.is_empty() {
        return Err(NotificationError::Validation(
            "At least one channel is required".to_string(),
        ));
    }

    if request.recipient_ids.is_empty() {
        return Err(NotificationError::Validation(
            "At least one recipient is required".to_string(),
        ));
    }

    if request.channels.iter().any(|c| c.trim().is_empty()) {
        return Err(NotificationError::Validation(
            "Channel names cannot be empty".to_string(),
        ));
    }

    if request.recipient_ids.iter().any(|r| r.trim().is_empty()) {
        return Err(NotificationError::Validation(
            "Recipient ids cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Returns the trimmed value of a required webhook field.
pub fn require_field<'a>(name: &str, value: Option<&'a str>) -> Result<&'a str, NotificationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(NotificationError::Validation(format!(
            "Missing required field '{}'",
            name
        ))),
    }
}

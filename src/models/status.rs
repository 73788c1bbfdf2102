use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::NotificationError;

/// Delivery state of a single channel within a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Overall notification state, derived from every channel's [`ChannelStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregateStatus {
    Enqueued,
    Processing,
    Completed,
    Failed,
    PartialFailure,
}

impl ChannelStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ChannelStatus::Pending => "PENDING",
            ChannelStatus::Processing => "PROCESSING",
            ChannelStatus::Completed => "COMPLETED",
            ChannelStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ChannelStatus::Completed | ChannelStatus::Failed)
    }
}

impl FromStr for ChannelStatus {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(ChannelStatus::Pending),
            "PROCESSING" => Ok(ChannelStatus::Processing),
            "COMPLETED" => Ok(ChannelStatus::Completed),
            "FAILED" => Ok(ChannelStatus::Failed),
            _ => Err(NotificationError::Validation(format!(
                "Unknown channel status '{}'",
                s
            ))),
        }
    }
}

impl Display for ChannelStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl AggregateStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AggregateStatus::Enqueued => "ENQUEUED",
            AggregateStatus::Processing => "PROCESSING",
            AggregateStatus::Completed => "COMPLETED",
            AggregateStatus::Failed => "FAILED",
            AggregateStatus::PartialFailure => "PARTIAL_FAILURE",
        }
    }

    /// Applies the aggregation rule: all completed wins, then any failure
    /// (including every channel failing) is a partial failure, otherwise the
    /// notification is still processing.
    pub fn from_channels<'a, I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = &'a ChannelStatus>,
    {
        let mut all_completed = true;
        let mut any_failed = false;

        for status in statuses {
            if *status != ChannelStatus::Completed {
                all_completed = false;
            }
            if *status == ChannelStatus::Failed {
                any_failed = true;
            }
        }

        if all_completed {
            AggregateStatus::Completed
        } else if any_failed {
            AggregateStatus::PartialFailure
        } else {
            AggregateStatus::Processing
        }
    }
}

impl Display for AggregateStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationStatusRecord {
    pub notification_id: String,

    #[serde(rename = "status")]
    pub aggregate_status: AggregateStatus,

    pub channel_statuses: BTreeMap<String, ChannelStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationStatusRecord {
    pub fn new(notification_id: String, channels: &[String]) -> Self {
        let now = Utc::now();

        let channel_statuses = channels
            .iter()
            .map(|channel| (channel.clone(), ChannelStatus::Pending))
            .collect();

        Self {
            notification_id,
            aggregate_status: AggregateStatus::Enqueued,
            channel_statuses,
            created_at: now,
            updated_at: now,
        }
    }

    /// Finds the stored key for `channel`. Keys keep the spelling of the
    /// original request; lookups fall back to a trimmed, case-insensitive
    /// match the same way adapters resolve channel names.
    fn channel_key(&self, channel: &str) -> Option<String> {
        if self.channel_statuses.contains_key(channel) {
            return Some(channel.to_string());
        }

        let wanted = channel.trim();
        self.channel_statuses
            .keys()
            .find(|key| key.trim().eq_ignore_ascii_case(wanted))
            .cloned()
    }

    /// Overwrites one channel's status and recomputes the aggregate.
    ///
    /// The channel set is fixed at creation, so a channel that was not part of
    /// the original request is rejected instead of being inserted.
    pub fn apply_channel_status(
        &mut self,
        channel: &str,
        status: ChannelStatus,
    ) -> Result<(), NotificationError> {
        let slot = self
            .channel_key(channel)
            .and_then(|key| self.channel_statuses.get_mut(&key))
            .ok_or_else(|| NotificationError::UnknownChannel {
                notification_id: self.notification_id.clone(),
                channel: channel.to_string(),
            })?;

        *slot = status;
        self.aggregate_status = AggregateStatus::from_channels(self.channel_statuses.values());
        self.updated_at = Utc::now();

        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.channel_statuses.values().all(ChannelStatus::is_terminal)
    }
}

use chrono::{DateTime, Utc};
use plategate_core::{DeliveryStatus, NotificationKind, Plate, Severity};
use serde::{Deserialize, Serialize};

/// Stored notification with its delivery history.
///
/// `channels` is a comma-separated list of the channels that were attempted
/// on the last delivery. `digest_id` is set on queued events that were
/// folded into a quiet hours digest and points at the digest record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NotificationEvent {
    pub id: i64,
    #[sqlx(try_from = "String")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub plate: Option<String>,
    pub photo_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub severity: Severity,
    pub channels: String,
    #[sqlx(try_from = "String")]
    pub status: DeliveryStatus,
    pub error_message: Option<String>,
    pub retry_count: i64,
    pub digest_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub last_retry_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl NotificationEvent {
    pub fn channel_list(&self) -> Vec<&str> {
        split_channels(&self.channels)
    }
}

pub(crate) fn join_channels(channels: &[String]) -> String {
    channels.join(",")
}

pub(crate) fn split_channels(channels: &str) -> Vec<&str> {
    channels
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect()
}

/// Notification record to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotificationEvent {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub plate: Option<Plate>,
    pub photo_url: Option<String>,
    pub severity: Severity,
    pub status: DeliveryStatus,
    pub delivery: DeliveryRecord,
}

/// Result of one delivery attempt as persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryRecord {
    pub channels: Vec<String>,
    pub error_message: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl DeliveryRecord {
    /// Status this attempt leaves the event in.
    pub fn status(&self) -> DeliveryStatus {
        DeliveryStatus::from_delivery(self.sent_at.is_some())
    }
}

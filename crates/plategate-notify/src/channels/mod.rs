//! Delivery channels.
//!
//! Channels are rebuilt from [`DispatchSettings`] on every dispatch. Each
//! enabled channel is attempted independently; a notification counts as
//! sent when at least one channel accepts it.

#![allow(async_fn_in_trait)]

pub mod email;
pub mod simulated;
pub mod telegram;

pub use email::EmailChannel;
pub use simulated::SimulatedChannel;
pub use telegram::{TelegramChannel, TelegramIdentity};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use plategate_storage::models::DeliveryRecord;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::Result;
use crate::event::{Notification, sent_at};
use crate::settings::DispatchSettings;

pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, notification: &Notification) -> Result<()>;
}

#[derive(Debug, Clone)]
pub enum AnyChannel {
    Email(EmailChannel),
    Telegram(TelegramChannel),
    Simulated(SimulatedChannel),
}

impl Channel for AnyChannel {
    fn name(&self) -> &str {
        match self {
            Self::Email(c) => c.name(),
            Self::Telegram(c) => c.name(),
            Self::Simulated(c) => c.name(),
        }
    }

    async fn send(&self, notification: &Notification) -> Result<()> {
        match self {
            Self::Email(c) => c.send(notification).await,
            Self::Telegram(c) => c.send(notification).await,
            Self::Simulated(c) => c.send(notification).await,
        }
    }
}

impl From<SimulatedChannel> for AnyChannel {
    fn from(channel: SimulatedChannel) -> Self {
        Self::Simulated(channel)
    }
}

/// Channels enabled by `settings`.
pub fn enabled_channels(client: &Client, settings: &DispatchSettings) -> Vec<AnyChannel> {
    let mut channels = Vec::new();
    if settings.email.enabled {
        channels.push(AnyChannel::Email(EmailChannel::new(
            client.clone(),
            settings.email.clone(),
        )));
    }
    if settings.telegram.enabled {
        channels.push(AnyChannel::Telegram(TelegramChannel::new(
            client.clone(),
            settings.telegram.clone(),
        )));
    }
    channels
}

/// Per-channel results of one delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub attempted: Vec<String>,
    pub delivered: Vec<String>,
    pub failures: Vec<String>,
}

impl DeliveryReport {
    pub fn is_sent(&self) -> bool {
        !self.delivered.is_empty()
    }

    /// Failure detail for storage, one entry per failed channel.
    pub fn error_summary(&self) -> Option<String> {
        if self.attempted.is_empty() {
            return Some("no notification channels enabled".to_string());
        }
        (!self.failures.is_empty()).then(|| self.failures.join("; "))
    }

    pub fn into_record(self, at: DateTime<Utc>) -> DeliveryRecord {
        DeliveryRecord {
            error_message: self.error_summary(),
            sent_at: sent_at(self.is_sent(), at),
            channels: self.attempted,
        }
    }
}

/// Send through every channel concurrently. One channel failing never
/// affects the others.
pub async fn deliver(channels: &[AnyChannel], notification: &Notification) -> DeliveryReport {
    let results = join_all(channels.iter().map(|channel| async move {
        (channel.name().to_string(), channel.send(notification).await)
    }))
    .await;

    let mut report = DeliveryReport::default();
    for (name, result) in results {
        match result {
            Ok(()) => {
                debug!(channel = %name, kind = %notification.kind, "Notification delivered");
                report.delivered.push(name.clone());
            }
            Err(e) => {
                warn!(channel = %name, kind = %notification.kind, error = %e, "Notification channel failed");
                report.failures.push(e.to_string());
            }
        }
        report.attempted.push(name);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use plategate_core::NotificationKind;

    fn notification() -> Notification {
        Notification::new(NotificationKind::UnknownVehicle, "Unknown vehicle at gate")
    }

    #[tokio::test]
    async fn test_any_success_counts_as_sent() {
        let ok = SimulatedChannel::new("ok");
        let broken = SimulatedChannel::new("broken");
        broken.fail_with("mailbox full");

        let report = deliver(&[broken.clone().into(), ok.clone().into()], &notification()).await;

        assert!(report.is_sent());
        assert_eq!(report.attempted, vec!["broken", "ok"]);
        assert_eq!(report.delivered, vec!["ok"]);
        assert_eq!(report.error_summary().unwrap(), "broken delivery failed: mailbox full");
        assert_eq!(ok.delivery_count(), 1);
        assert_eq!(broken.delivery_count(), 0);
    }

    #[tokio::test]
    async fn test_all_failures_not_sent() {
        let a = SimulatedChannel::new("a");
        let b = SimulatedChannel::new("b");
        a.fail_with("down");
        b.fail_with("down");

        let report = deliver(&[a.into(), b.into()], &notification()).await;
        let record = report.clone().into_record(Utc::now());

        assert!(!report.is_sent());
        assert_eq!(record.sent_at, None);
        assert_eq!(record.channels, vec!["a", "b"]);
        assert!(record.error_message.unwrap().contains("; "));
    }

    #[tokio::test]
    async fn test_no_channels_is_a_failure() {
        let report = deliver(&[], &notification()).await;
        assert!(!report.is_sent());
        assert_eq!(
            report.error_summary().as_deref(),
            Some("no notification channels enabled")
        );
    }

    #[test]
    fn test_enabled_channels_follow_settings() {
        let client = Client::new();
        let mut settings = DispatchSettings::default();
        assert!(enabled_channels(&client, &settings).is_empty());

        settings.telegram.enabled = true;
        let channels = enabled_channels(&client, &settings);
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name(), "telegram");
    }
}

//! Notification router.
//!
//! Every event is either delivered immediately or, during quiet hours,
//! stored as `pending` for the next digest. High and critical events bypass
//! quiet hours when the bypass setting is on.
//!
//! ```text
//! dispatch(event)
//!     │
//!     ├── quiet hours active and not bypassed ──► stored as pending
//!     │
//!     └── deliver to every enabled channel ─────► stored as sent / failed
//! ```

use chrono::{Local, NaiveTime, Utc};
use plategate_storage::Database;
use plategate_storage::repositories::{
    NotificationRepository, SettingRepository, SqliteNotificationRepository,
    SqliteSettingRepository,
};
use reqwest::Client;
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::channels::{self, AnyChannel, DeliveryReport, TelegramChannel, TelegramIdentity};
use crate::error::{NotifyError, Result};
use crate::event::Notification;
use crate::quiet_hours;
use crate::settings::DispatchSettings;

/// Result of routing one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub id: i64,
    pub queued: bool,
    pub sent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResendOutcome {
    pub sent: bool,
    pub error_message: Option<String>,
}

pub struct NotificationRouter {
    pub(crate) pool: SqlitePool,
    pub(crate) settings: SqliteSettingRepository,
    pub(crate) events: SqliteNotificationRepository,
    client: Client,
    fixed_channels: Vec<AnyChannel>,
    pub(crate) drain_lock: Mutex<()>,
}

impl NotificationRouter {
    pub fn new(db: &Database, client: Client) -> Self {
        let pool = db.pool().clone();
        Self {
            settings: SqliteSettingRepository::new(pool.clone()),
            events: SqliteNotificationRepository::new(pool.clone()),
            pool,
            client,
            fixed_channels: Vec::new(),
            drain_lock: Mutex::new(()),
        }
    }

    /// Add a channel that is used on every delivery regardless of settings.
    pub fn with_channel(mut self, channel: impl Into<AnyChannel>) -> Self {
        self.fixed_channels.push(channel.into());
        self
    }

    pub fn events(&self) -> &SqliteNotificationRepository {
        &self.events
    }

    pub async fn settings(&self) -> Result<DispatchSettings> {
        DispatchSettings::load(&self.settings).await
    }

    /// Route an event using the local wall clock.
    pub async fn dispatch(&self, notification: Notification) -> Result<DispatchOutcome> {
        self.dispatch_at(notification, Local::now().time()).await
    }

    /// Route an event as if the local time were `now`.
    pub async fn dispatch_at(
        &self,
        notification: Notification,
        now: NaiveTime,
    ) -> Result<DispatchOutcome> {
        let settings = self.settings().await?;
        let severity = notification.severity();

        if quiet_hours::should_defer(severity, now, &settings.quiet_hours) {
            let id = self.events.create(&notification.queued_record()).await?;
            info!(id, kind = %notification.kind, %severity, "Notification queued for quiet hours digest");
            return Ok(DispatchOutcome {
                id,
                queued: true,
                sent: false,
            });
        }

        let id = self.events.create(&notification.in_flight_record()).await?;
        let report = self.deliver(&settings, &notification).await;
        let sent = report.is_sent();
        self.events
            .record_delivery(id, &report.into_record(Utc::now()))
            .await?;

        if sent {
            info!(id, kind = %notification.kind, %severity, "Notification sent");
        } else {
            warn!(id, kind = %notification.kind, %severity, "Notification delivery failed");
        }
        Ok(DispatchOutcome {
            id,
            queued: false,
            sent,
        })
    }

    /// Deliver a stored event again. Quiet hours are not consulted.
    pub async fn resend(&self, id: i64) -> Result<ResendOutcome> {
        let event = self
            .events
            .find_by_id(id)
            .await?
            .ok_or(NotifyError::NotFound { id })?;

        let settings = self.settings().await?;
        let report = self.deliver(&settings, &Notification::from_event(&event)).await;
        let record = report.into_record(Utc::now());
        let outcome = ResendOutcome {
            sent: record.sent_at.is_some(),
            error_message: record.error_message.clone(),
        };

        self.events.record_retry(id, &record, Utc::now()).await?;
        info!(id, sent = outcome.sent, retry = event.retry_count + 1, "Notification resent");
        Ok(outcome)
    }

    pub async fn pending_count(&self) -> Result<i64> {
        Ok(self.events.count_pending().await?)
    }

    /// Check the configured Telegram bot and chat.
    pub async fn verify_telegram(&self) -> Result<TelegramIdentity> {
        let settings = self.settings().await?;
        TelegramChannel::new(self.client.clone(), settings.telegram)
            .verify()
            .await
    }

    pub(crate) async fn deliver(
        &self,
        settings: &DispatchSettings,
        notification: &Notification,
    ) -> DeliveryReport {
        let mut enabled = channels::enabled_channels(&self.client, settings);
        enabled.extend(self.fixed_channels.iter().cloned());
        channels::deliver(&enabled, notification).await
    }
}

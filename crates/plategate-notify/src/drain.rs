//! Quiet hours digest.
//!
//! A drain takes a snapshot of the pending events, folds them into one
//! `quiet-hours-summary` notification and delivers it. Only when a channel
//! accepts the digest are the snapshot events marked sent, together with the
//! digest record, in a single transaction. Events queued while the drain
//! runs are not in the snapshot and stay pending.

use chrono::{Local, Utc};
use plategate_core::constants::DIGEST_MAX_LISTED_EVENTS;
use plategate_core::{NotificationKind, Severity};
use plategate_storage::models::NotificationEvent;
use plategate_storage::repositories::NotificationRepository;
use plategate_storage::transaction;
use serde::Serialize;
use std::fmt::Write;
use tracing::{info, warn};

use crate::error::Result;
use crate::event::Notification;
use crate::router::NotificationRouter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DrainReport {
    /// Events folded into a delivered digest.
    pub sent: usize,
    /// Events left pending because the digest could not be delivered.
    pub failed: usize,
    pub digest_id: Option<i64>,
}

impl NotificationRouter {
    /// Deliver everything queued during quiet hours as one digest.
    pub async fn drain(&self) -> Result<DrainReport> {
        let _guard = self.drain_lock.lock().await;

        let pending = self.events.find_pending().await?;
        if pending.is_empty() {
            return Ok(DrainReport::default());
        }

        let ids: Vec<i64> = pending.iter().map(|e| e.id).collect();
        let digest = compose_digest(&pending);
        let settings = self.settings().await?;
        let report = self.deliver(&settings, &digest).await;

        if !report.is_sent() {
            warn!(
                pending = pending.len(),
                error = ?report.error_summary(),
                "Quiet hours digest not delivered, events stay pending"
            );
            return Ok(DrainReport {
                sent: 0,
                failed: pending.len(),
                digest_id: None,
            });
        }

        let now = Utc::now();
        let record = digest.delivered_record(report.into_record(now));
        let mut tx = self.pool.begin().await?;
        let (digest_id, marked) = transaction::record_digest(&mut tx, &record, &ids, now).await?;
        tx.commit().await?;

        info!(digest_id, events = marked, "Quiet hours digest sent");
        Ok(DrainReport {
            sent: marked as usize,
            failed: 0,
            digest_id: Some(digest_id),
        })
    }
}

/// Build the digest for `events`, grouped by kind.
pub fn compose_digest(events: &[NotificationEvent]) -> Notification {
    let mut message = format!(
        "{} notification(s) were held during quiet hours.\n",
        events.len()
    );

    for kind in NotificationKind::ALL {
        let count = events.iter().filter(|e| e.kind == kind).count();
        if count > 0 {
            let _ = write!(message, "\n{}: {count}", kind.label());
        }
    }

    message.push('\n');
    for event in events.iter().take(DIGEST_MAX_LISTED_EVENTS) {
        let time = event.created_at.with_timezone(&Local).format("%H:%M");
        let _ = write!(message, "\n- {time} {}", event.kind.label());
        if let Some(plate) = &event.plate {
            let _ = write!(message, " {plate}");
        }
    }
    if events.len() > DIGEST_MAX_LISTED_EVENTS {
        let _ = write!(
            message,
            "\n... and {} more",
            events.len() - DIGEST_MAX_LISTED_EVENTS
        );
    }

    let severity = events
        .iter()
        .map(|e| e.severity)
        .max()
        .unwrap_or(Severity::Low);

    Notification::new(NotificationKind::QuietHoursSummary, message)
        .with_title(format!("Quiet hours summary ({} events)", events.len()))
        .with_severity(severity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::tests::{at, router_with_quiet_hours};
    use plategate_core::{DeliveryStatus, Plate};

    fn unknown(plate: &str) -> Notification {
        Notification::new(NotificationKind::UnknownVehicle, "Unknown vehicle at gate")
            .with_plate(Plate::new(plate).unwrap())
    }

    #[tokio::test]
    async fn test_drain_marks_snapshot_and_stores_digest() {
        let (router, channel) = router_with_quiet_hours(true).await;
        let first = router.dispatch_at(unknown("A123BC777"), at(23, 0)).await.unwrap();
        let second = router
            .dispatch_at(
                Notification::new(NotificationKind::ManualOpen, "Opened by guard"),
                at(23, 5),
            )
            .await
            .unwrap();

        let report = router.drain().await.unwrap();

        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(router.pending_count().await.unwrap(), 0);

        let digest_id = report.digest_id.unwrap();
        for id in [first.id, second.id] {
            let event = router.events.find_by_id(id).await.unwrap().unwrap();
            assert_eq!(event.status, DeliveryStatus::Sent);
            assert_eq!(event.digest_id, Some(digest_id));
        }

        let digest = router.events.find_by_id(digest_id).await.unwrap().unwrap();
        assert_eq!(digest.kind, NotificationKind::QuietHoursSummary);
        assert_eq!(digest.status, DeliveryStatus::Sent);

        let delivered = channel.delivered();
        assert_eq!(delivered.len(), 1);
        assert!(delivered[0].message.contains("Unknown vehicle: 1"));
        assert!(delivered[0].message.contains("Manual barrier open: 1"));
        assert!(delivered[0].message.contains("A123BC777"));
    }

    #[tokio::test]
    async fn test_failed_drain_marks_nothing() {
        let (router, channel) = router_with_quiet_hours(true).await;
        router.dispatch_at(unknown("A123BC777"), at(23, 0)).await.unwrap();
        channel.fail_with("offline");

        let report = router.drain().await.unwrap();

        assert_eq!(report.sent, 0);
        assert_eq!(report.failed, 1);
        assert_eq!(report.digest_id, None);
        assert_eq!(router.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_drain() {
        let (router, channel) = router_with_quiet_hours(true).await;

        assert_eq!(router.drain().await.unwrap(), DrainReport::default());
        assert_eq!(channel.attempt_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_drains_send_one_digest() {
        let (router, channel) = router_with_quiet_hours(true).await;
        router.dispatch_at(unknown("A123BC777"), at(23, 0)).await.unwrap();

        let (a, b) = tokio::join!(router.drain(), router.drain());
        let total = a.unwrap().sent + b.unwrap().sent;

        assert_eq!(total, 1);
        assert_eq!(channel.delivery_count(), 1);
    }

    #[test]
    fn test_digest_caps_listed_events() {
        let events: Vec<NotificationEvent> = (0..DIGEST_MAX_LISTED_EVENTS + 5)
            .map(|i| NotificationEvent {
                id: i as i64,
                kind: NotificationKind::UnknownVehicle,
                title: "Unknown vehicle".into(),
                message: String::new(),
                plate: None,
                photo_url: None,
                severity: if i == 3 { Severity::High } else { Severity::Low },
                channels: String::new(),
                status: DeliveryStatus::Pending,
                error_message: None,
                retry_count: 0,
                digest_id: None,
                created_at: Utc::now(),
                last_retry_at: None,
                sent_at: None,
            })
            .collect();

        let digest = compose_digest(&events);

        assert_eq!(digest.severity(), Severity::High);
        assert!(digest.message.contains("Unknown vehicle: 25"));
        assert!(digest.message.ends_with("... and 5 more"));
        assert_eq!(digest.message.matches("\n- ").count(), DIGEST_MAX_LISTED_EVENTS);
    }
}

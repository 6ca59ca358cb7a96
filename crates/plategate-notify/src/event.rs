//! Notification drafts handed to the router.

use chrono::{DateTime, Utc};
use plategate_core::{DeliveryStatus, NotificationKind, Plate, Severity};
use plategate_storage::models::{DeliveryRecord, NewNotificationEvent, NotificationEvent};

/// Error text on an event whose immediate delivery never reported back.
pub(crate) const DELIVERY_INTERRUPTED: &str = "Delivery interrupted";

/// A notification before it is routed and stored.
///
/// Severity is optional on the way in; the router falls back to
/// [`Severity::Medium`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub plate: Option<Plate>,
    pub photo_url: Option<String>,
    pub severity: Option<Severity>,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: kind.label().to_string(),
            message: message.into(),
            plate: None,
            photo_url: None,
            severity: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_plate(mut self, plate: Plate) -> Self {
        self.plate = Some(plate);
        self
    }

    pub fn with_photo_url(mut self, url: Option<String>) -> Self {
        self.photo_url = url;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity.unwrap_or(Severity::Medium)
    }

    /// Rebuild a draft from a stored event, for resends.
    ///
    /// The stored plate is carried as read, including reads outside the
    /// registry length limits.
    pub fn from_event(event: &NotificationEvent) -> Self {
        Self {
            kind: event.kind,
            title: event.title.clone(),
            message: event.message.clone(),
            plate: event.plate.as_deref().and_then(Plate::from_reading),
            photo_url: event.photo_url.clone(),
            severity: Some(event.severity),
        }
    }

    /// Plain text body used by every channel.
    pub fn render_text(&self) -> String {
        let mut text = format!("{}\n{}", self.title, self.message);
        if let Some(plate) = &self.plate {
            text.push_str(&format!("\nPlate: {plate}"));
        }
        text.push_str(&format!("\nSeverity: {}", self.severity()));
        if let Some(url) = &self.photo_url {
            text.push_str(&format!("\nPhoto: {url}"));
        }
        text
    }

    pub(crate) fn queued_record(&self) -> NewNotificationEvent {
        self.record(DeliveryStatus::Pending, DeliveryRecord::default())
    }

    /// Record written before an immediate delivery starts. It stays failed
    /// if the process stops mid-delivery, which keeps it resendable and out
    /// of the quiet hours queue.
    pub(crate) fn in_flight_record(&self) -> NewNotificationEvent {
        self.record(
            DeliveryStatus::Failed,
            DeliveryRecord {
                error_message: Some(DELIVERY_INTERRUPTED.to_string()),
                ..DeliveryRecord::default()
            },
        )
    }

    pub(crate) fn delivered_record(&self, delivery: DeliveryRecord) -> NewNotificationEvent {
        self.record(delivery.status(), delivery)
    }

    fn record(&self, status: DeliveryStatus, delivery: DeliveryRecord) -> NewNotificationEvent {
        NewNotificationEvent {
            kind: self.kind,
            title: self.title.clone(),
            message: self.message.clone(),
            plate: self.plate.clone(),
            photo_url: self.photo_url.clone(),
            severity: self.severity(),
            status,
            delivery,
        }
    }
}

/// Convenience for the time at which a delivery report is stamped.
pub(crate) fn sent_at(sent: bool, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    sent.then_some(at)
}

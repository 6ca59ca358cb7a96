use chrono::{DateTime, Utc};
use plategate_core::{Plate, Severity};
use serde::{Deserialize, Serialize};

/// Blacklisted plate.
///
/// An entry blocks a plate while it is *in force*: active and either without
/// an expiry or with an expiry still in the future. The blacklist is always
/// consulted before the allowlist.
///
/// `attempt_count` only ever grows, through
/// [`record_attempt`](crate::repositories::BlacklistRepository::record_attempt).
///
/// # Examples
///
/// ```
/// use plategate_storage::models::BlacklistEntry;
/// use plategate_core::{Plate, Severity};
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// let mut entry = BlacklistEntry {
///     id: 1,
///     plate: Plate::new("X999YY777").unwrap(),
///     reason: "Stolen".to_string(),
///     severity: Severity::Critical,
///     is_active: true,
///     notify_on_detection: true,
///     attempt_count: 0,
///     last_attempt_at: None,
///     expires_at: Some(now + Duration::days(1)),
///     created_at: now,
///     updated_at: now,
/// };
/// assert!(entry.is_in_force(now));
///
/// entry.expires_at = Some(now - Duration::seconds(1));
/// assert!(!entry.is_in_force(now));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BlacklistEntry {
    pub id: i64,
    #[sqlx(try_from = "String")]
    pub plate: Plate,
    pub reason: String,
    #[sqlx(try_from = "String")]
    pub severity: Severity,
    pub is_active: bool,
    pub notify_on_detection: bool,
    pub attempt_count: i64,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlacklistEntry {
    /// Active and not expired at `now`.
    pub fn is_in_force(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|expires| expires > now)
    }
}

/// Data for a blacklist entry that is not stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlacklistEntry {
    pub plate: Plate,
    pub reason: String,
    pub severity: Severity,
    pub is_active: bool,
    pub notify_on_detection: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewBlacklistEntry {
    /// Active entry with detection notifications enabled.
    pub fn new(plate: Plate, reason: impl Into<String>, severity: Severity) -> Self {
        Self {
            plate,
            reason: reason.into(),
            severity,
            is_active: true,
            notify_on_detection: true,
            expires_at: None,
        }
    }

    pub fn with_notify(mut self, notify: bool) -> Self {
        self.notify_on_detection = notify;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

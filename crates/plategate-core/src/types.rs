use crate::{
    Result,
    constants::{MAX_PLATE_LENGTH, MIN_PLATE_LENGTH},
    error::Error,
};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Normalized vehicle license plate.
///
/// The plate is the join key across the allowlist, the blacklist and the
/// passage ledger, so every plate entering the system goes through
/// [`Plate::new`]: all whitespace is removed and letters are uppercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Plate(String);

impl Plate {
    /// Create a new plate with normalization and validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidPlate` if the normalized plate is shorter than
    /// `MIN_PLATE_LENGTH` or longer than `MAX_PLATE_LENGTH` characters.
    pub fn new(raw: &str) -> Result<Self> {
        let plate = Self::normalize(raw);

        let len = plate.chars().count();
        if !(MIN_PLATE_LENGTH..=MAX_PLATE_LENGTH).contains(&len) {
            return Err(Error::InvalidPlate(format!(
                "Plate must be {MIN_PLATE_LENGTH}-{MAX_PLATE_LENGTH} chars, got {len}"
            )));
        }

        Ok(Plate(plate))
    }

    /// Plate as read by the classifier.
    ///
    /// Only a read that is empty after normalization is rejected. Length
    /// limits apply to registry entries, not to what the camera saw, so an
    /// out-of-range read still reaches the registry lookup and is reported.
    ///
    /// ```
    /// use plategate_core::Plate;
    ///
    /// assert_eq!(Plate::from_reading(" a ").unwrap().as_str(), "A");
    /// assert!(Plate::from_reading(" \t").is_none());
    /// ```
    #[must_use]
    pub fn from_reading(raw: &str) -> Option<Self> {
        let plate = Self::normalize(raw);
        (!plate.is_empty()).then_some(Plate(plate))
    }

    /// Normalize a raw plate string without validating it.
    ///
    /// ```
    /// use plategate_core::Plate;
    ///
    /// assert_eq!(Plate::normalize(" a 123 bc\t777 "), "A123BC777");
    /// ```
    #[must_use]
    pub fn normalize(raw: &str) -> String {
        raw.chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_uppercase)
            .collect()
    }

    /// Get the plate as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Plate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Plate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Plate::new(s)
    }
}

impl TryFrom<String> for Plate {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Plate::new(&value)
    }
}

impl From<Plate> for String {
    fn from(plate: Plate) -> String {
        plate.0
    }
}

/// Severity attached to blacklist entries and notification events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Storage and wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Returns `true` for severities that may bypass quiet hours.
    #[inline]
    #[must_use]
    pub fn is_elevated(self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(Error::InvalidSeverity(other.to_string())),
        }
    }
}

/// Kind of notification event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    UnknownVehicle,
    BlacklistDetected,
    ManualOpen,
    UnauthorizedAccess,
    AllowedPassage,
    DailySummary,
    QuietHoursSummary,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 7] = [
        NotificationKind::UnknownVehicle,
        NotificationKind::BlacklistDetected,
        NotificationKind::ManualOpen,
        NotificationKind::UnauthorizedAccess,
        NotificationKind::AllowedPassage,
        NotificationKind::DailySummary,
        NotificationKind::QuietHoursSummary,
    ];

    /// Storage and wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::UnknownVehicle => "unknown-vehicle",
            NotificationKind::BlacklistDetected => "blacklist-detected",
            NotificationKind::ManualOpen => "manual-open",
            NotificationKind::UnauthorizedAccess => "unauthorized-access",
            NotificationKind::AllowedPassage => "allowed-passage",
            NotificationKind::DailySummary => "daily-summary",
            NotificationKind::QuietHoursSummary => "quiet-hours-summary",
        }
    }

    /// Human readable label used in digests.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            NotificationKind::UnknownVehicle => "Unknown vehicle",
            NotificationKind::BlacklistDetected => "Blacklisted vehicle",
            NotificationKind::ManualOpen => "Manual barrier open",
            NotificationKind::UnauthorizedAccess => "Unauthorized access",
            NotificationKind::AllowedPassage => "Allowed passage",
            NotificationKind::DailySummary => "Daily summary",
            NotificationKind::QuietHoursSummary => "Quiet hours summary",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        NotificationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidNotificationKind(s.to_string()))
    }
}

/// Lifecycle status of a notification event.
///
/// `Pending` means queued during quiet hours and not yet delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
}

impl DeliveryStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }

    /// Status after a delivery attempt.
    #[must_use]
    pub fn from_delivery(sent: bool) -> Self {
        if sent {
            DeliveryStatus::Sent
        } else {
            DeliveryStatus::Failed
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(DeliveryStatus::Pending),
            "sent" => Ok(DeliveryStatus::Sent),
            "failed" => Ok(DeliveryStatus::Failed),
            other => Err(Error::InvalidDeliveryStatus(other.to_string())),
        }
    }
}

// Text column decoding (`#[sqlx(try_from = "String")]` in storage models).
macro_rules! impl_try_from_string {
    ($($ty:ty),+) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = Error;

                fn try_from(value: String) -> Result<Self> {
                    value.parse()
                }
            }
        )+
    };
}

impl_try_from_string!(Severity, NotificationKind, DeliveryStatus);

/// Outcome of classifying a recognized plate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Plate matched an active allowlisted vehicle.
    Allowed,
    /// Plate matched an active, non-expired blacklist entry.
    Blocked,
    /// No plate, or a plate found in neither list.
    Unknown,
}

impl Decision {
    #[inline]
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allowed)
    }

    #[inline]
    #[must_use]
    pub fn is_blocked(self) -> bool {
        matches!(self, Decision::Blocked)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Decision::Allowed => write!(f, "Allowed"),
            Decision::Blocked => write!(f, "Blocked"),
            Decision::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Parse an `HH:MM` time of day.
///
/// # Errors
/// Returns `Error::InvalidTimeOfDay` for anything that is not a valid
/// 24-hour `HH:MM` value.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| Error::InvalidTimeOfDay {
        value: value.to_string(),
    })
}

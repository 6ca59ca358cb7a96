//! Core constants for the plate-recognition access pipeline.
//!
//! This module centralizes values shared by every crate in the workspace:
//! plate limits, hardware timeouts, passage annotations and the keys of the
//! runtime settings store.
//!
//! # Settings Keys
//!
//! Runtime behaviour (quiet hours, notification channels) is stored in a flat
//! key/value table and read at dispatch time. The keys are grouped by
//! prefix:
//!
//! | Prefix | Purpose | Example |
//! |--------|---------|---------|
//! | `quiet_hours.` | Quiet hours window and bypass | `quiet_hours.start = 22:00` |
//! | `notifications.` | Channel toggles and credentials | `notifications.telegram.chat_id` |
//!
//! # Usage
//!
//! ```
//! use plategate_core::constants::*;
//!
//! assert_eq!(SETTING_QUIET_HOURS_START, "quiet_hours.start");
//!
//! use std::time::Duration;
//! let timeout = Duration::from_millis(DEFAULT_ADAPTER_TIMEOUT_MS);
//! assert_eq!(timeout.as_secs(), 10);
//! ```

// ============================================================================
// Plates
// ============================================================================

/// Minimum normalized plate length.
pub const MIN_PLATE_LENGTH: usize = 2;

/// Maximum normalized plate length.
pub const MAX_PLATE_LENGTH: usize = 16;

// ============================================================================
// Hardware
// ============================================================================

/// Default timeout for a single hardware adapter call, in milliseconds.
pub const DEFAULT_ADAPTER_TIMEOUT_MS: u64 = 10_000;

/// Default GPIO pulse length used to trigger a barrier relay, in milliseconds.
pub const DEFAULT_GPIO_PULSE_MS: u64 = 500;

// ============================================================================
// Passage annotations
// ============================================================================

/// Prefix written to a passage note when the plate was blacklisted.
///
/// ```
/// use plategate_core::constants::BLACKLIST_NOTE_PREFIX;
///
/// let note = format!("{BLACKLIST_NOTE_PREFIX}: stolen vehicle");
/// assert_eq!(note, "BLACKLISTED: stolen vehicle");
/// ```
pub const BLACKLIST_NOTE_PREFIX: &str = "BLACKLISTED";

/// Actor recorded for automatic recognition flows.
pub const SYSTEM_ACTOR: &str = "system";

// ============================================================================
// Settings keys
// ============================================================================

pub const SETTING_QUIET_HOURS_ENABLED: &str = "quiet_hours.enabled";
pub const SETTING_QUIET_HOURS_START: &str = "quiet_hours.start";
pub const SETTING_QUIET_HOURS_END: &str = "quiet_hours.end";
pub const SETTING_QUIET_HOURS_BYPASS_HIGH: &str = "quiet_hours.bypass_high_severity";

/// Emit an `allowed-passage` notice for allowlisted vehicles.
pub const SETTING_NOTIFY_ALLOWED_PASSAGE: &str = "notifications.allowed_passage";

pub const SETTING_EMAIL_ENABLED: &str = "notifications.email.enabled";
pub const SETTING_EMAIL_PROVIDER: &str = "notifications.email.provider";
pub const SETTING_EMAIL_API_URL: &str = "notifications.email.api_url";
pub const SETTING_EMAIL_API_KEY: &str = "notifications.email.api_key";
pub const SETTING_EMAIL_SENDER: &str = "notifications.email.sender";
pub const SETTING_EMAIL_RECIPIENT: &str = "notifications.email.recipient";

pub const SETTING_TELEGRAM_ENABLED: &str = "notifications.telegram.enabled";
pub const SETTING_TELEGRAM_BOT_TOKEN: &str = "notifications.telegram.bot_token";
pub const SETTING_TELEGRAM_CHAT_ID: &str = "notifications.telegram.chat_id";
pub const SETTING_TELEGRAM_API_URL: &str = "notifications.telegram.api_url";

// ============================================================================
// Quiet hours defaults
// ============================================================================

pub const DEFAULT_QUIET_HOURS_START: &str = "22:00";
pub const DEFAULT_QUIET_HOURS_END: &str = "07:00";

/// Maximum number of individual events listed in a quiet hours digest.
pub const DIGEST_MAX_LISTED_EVENTS: usize = 20;

//! Dispatch settings snapshot.
//!
//! Channel credentials and the quiet hours window live in the settings table
//! and are read on every dispatch, so a change takes effect on the next
//! event without a restart.

use chrono::NaiveTime;
use plategate_core::constants::*;
use plategate_core::parse_time_of_day;
use plategate_storage::repositories::SettingRepository;
use std::collections::HashMap;
use tracing::warn;

use crate::error::Result;

pub const DEFAULT_SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHoursConfig {
    pub enabled: bool,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub bypass_high_severity: bool,
}

impl Default for QuietHoursConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            start: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or(NaiveTime::MIN),
            bypass_high_severity: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmailProvider {
    /// Log the message instead of sending it.
    #[default]
    Console,
    Sendgrid,
}

impl EmailProvider {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "console" => Some(Self::Console),
            "sendgrid" => Some(Self::Sendgrid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmailSettings {
    pub enabled: bool,
    pub provider: EmailProvider,
    pub api_url: String,
    pub api_key: Option<String>,
    pub sender: Option<String>,
    pub recipient: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TelegramSettings {
    pub enabled: bool,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_url: String,
}

/// Everything the router needs for one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DispatchSettings {
    pub quiet_hours: QuietHoursConfig,
    pub email: EmailSettings,
    pub telegram: TelegramSettings,
}

impl DispatchSettings {
    /// Read the current values from the settings store.
    pub async fn load(settings: &impl SettingRepository) -> Result<Self> {
        let values = settings
            .all()
            .await?
            .into_iter()
            .map(|s| (s.key, s.value))
            .collect::<HashMap<_, _>>();
        Ok(Self::from_map(&values))
    }

    /// Build a snapshot from raw key/value pairs. Missing or malformed values
    /// fall back to their defaults.
    pub fn from_map(values: &HashMap<String, String>) -> Self {
        let text = |key: &str| {
            values
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let flag = |key: &str, default: bool| values.get(key).map_or(default, |v| parse_flag(v));
        let time = |key: &str, default: NaiveTime| match values.get(key) {
            Some(v) => parse_time_of_day(v).unwrap_or_else(|e| {
                warn!(key, error = %e, "Ignoring malformed quiet hours setting");
                default
            }),
            None => default,
        };

        let defaults = QuietHoursConfig::default();
        let quiet_hours = QuietHoursConfig {
            enabled: flag(SETTING_QUIET_HOURS_ENABLED, defaults.enabled),
            start: time(SETTING_QUIET_HOURS_START, defaults.start),
            end: time(SETTING_QUIET_HOURS_END, defaults.end),
            bypass_high_severity: flag(SETTING_QUIET_HOURS_BYPASS_HIGH, defaults.bypass_high_severity),
        };

        let provider = match text(SETTING_EMAIL_PROVIDER) {
            Some(raw) => EmailProvider::parse(&raw).unwrap_or_else(|| {
                warn!(provider = %raw, "Unknown email provider, using console");
                EmailProvider::Console
            }),
            None => EmailProvider::Console,
        };
        let email = EmailSettings {
            enabled: flag(SETTING_EMAIL_ENABLED, false),
            provider,
            api_url: text(SETTING_EMAIL_API_URL).unwrap_or_else(|| DEFAULT_SENDGRID_URL.to_string()),
            api_key: text(SETTING_EMAIL_API_KEY),
            sender: text(SETTING_EMAIL_SENDER),
            recipient: text(SETTING_EMAIL_RECIPIENT),
        };

        let telegram = TelegramSettings {
            enabled: flag(SETTING_TELEGRAM_ENABLED, false),
            bot_token: text(SETTING_TELEGRAM_BOT_TOKEN),
            chat_id: text(SETTING_TELEGRAM_CHAT_ID),
            api_url: text(SETTING_TELEGRAM_API_URL)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
        };

        Self {
            quiet_hours,
            email,
            telegram,
        }
    }
}

/// Settings store flags are free text; accept the usual spellings.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

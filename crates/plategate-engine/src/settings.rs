//! Access settings snapshot.

use plategate_core::constants::SETTING_NOTIFY_ALLOWED_PASSAGE;
use plategate_notify::settings::parse_flag;
use plategate_storage::repositories::SettingRepository;

use crate::error::Result;

/// Settings the decision engine consults, read once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessSettings {
    /// Emit an `allowed-passage` notice for allowlisted vehicles.
    pub notify_allowed_passage: bool,
}

impl AccessSettings {
    pub async fn load(settings: &impl SettingRepository) -> Result<Self> {
        Ok(Self {
            notify_allowed_passage: settings
                .get(SETTING_NOTIFY_ALLOWED_PASSAGE)
                .await?
                .is_some_and(|v| parse_flag(&v)),
        })
    }
}

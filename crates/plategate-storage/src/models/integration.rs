use chrono::{DateTime, Utc};
use plategate_hardware::{
    CommandTemplates, DeviceStatus, GpioPulse, HardwareError, IntegrationConfig, IntegrationKind,
    PrimaryCandidate, VendorKind,
};
use plategate_core::constants::DEFAULT_GPIO_PULSE_MS;
use serde::{Deserialize, Serialize};

/// Configured barrier controller or camera.
///
/// `vendor` keeps the raw type tag so a record with an unknown vendor still
/// loads and can be reported; [`Integration::to_config`] is where the tag is
/// resolved. Integrations are never deleted automatically.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Integration {
    pub id: i64,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub kind: IntegrationKind,
    pub vendor: String,
    pub host: Option<String>,
    pub port: Option<i64>,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    pub gpio_pin: Option<i64>,
    pub gpio_pulse_ms: Option<i64>,
    pub gpio_active_low: bool,
    pub open_path: Option<String>,
    pub close_path: Option<String>,
    pub status_path: Option<String>,
    pub snapshot_path: Option<String>,
    pub stream_path: Option<String>,
    pub timeout_ms: i64,
    pub is_active: bool,
    pub is_primary: bool,
    #[sqlx(try_from = "String")]
    pub last_status: DeviceStatus,
    pub last_error: Option<String>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Integration {
    /// Hardware view of this record.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown vendor tag or an
    /// out-of-range port or pin.
    pub fn to_config(&self) -> Result<IntegrationConfig, HardwareError> {
        let vendor: VendorKind = self.vendor.parse()?;

        let port = self
            .port
            .map(u16::try_from)
            .transpose()
            .map_err(|_| HardwareError::configuration(format!("port out of range on '{}'", self.name)))?;

        let gpio = self
            .gpio_pin
            .map(|pin| {
                let pin = u32::try_from(pin).map_err(|_| {
                    HardwareError::configuration(format!("GPIO pin out of range on '{}'", self.name))
                })?;
                Ok::<_, HardwareError>(GpioPulse {
                    pin,
                    pulse_ms: self
                        .gpio_pulse_ms
                        .and_then(|ms| u64::try_from(ms).ok())
                        .unwrap_or(DEFAULT_GPIO_PULSE_MS),
                    active_low: self.gpio_active_low,
                })
            })
            .transpose()?;

        Ok(IntegrationConfig {
            name: self.name.clone(),
            kind: self.kind,
            vendor,
            host: self.host.clone(),
            port,
            username: self.username.clone(),
            password: self.password.clone(),
            api_token: self.api_token.clone(),
            gpio,
            commands: CommandTemplates {
                open_path: self.open_path.clone(),
                close_path: self.close_path.clone(),
                status_path: self.status_path.clone(),
                snapshot_path: self.snapshot_path.clone(),
                stream_path: self.stream_path.clone(),
            },
            timeout_ms: u64::try_from(self.timeout_ms).unwrap_or(0),
        })
    }
}

impl PrimaryCandidate for Integration {
    fn is_active(&self) -> bool {
        self.is_active
    }

    fn is_primary(&self) -> bool {
        self.is_primary
    }
}

/// Integration record to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIntegration {
    pub config: IntegrationConfig,
    pub is_active: bool,
    pub is_primary: bool,
}

impl NewIntegration {
    pub fn new(config: IntegrationConfig) -> Self {
        Self {
            config,
            is_active: true,
            is_primary: false,
        }
    }

    pub fn primary(mut self, primary: bool) -> Self {
        self.is_primary = primary;
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }
}

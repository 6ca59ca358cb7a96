//! Common types shared across barrier and camera implementations.
//!
//! An [`IntegrationConfig`] is the hardware-side view of one configured
//! integration record. Vendor bindings are built from it on every call, so a
//! changed record takes effect without restarting anything.

use plategate_core::constants::{DEFAULT_ADAPTER_TIMEOUT_MS, DEFAULT_GPIO_PULSE_MS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::HardwareError;

/// Command sent to a barrier controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarrierAction {
    Open,
    Close,
    Status,
}

impl BarrierAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for BarrierAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BarrierAction {
    type Err = HardwareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "close" => Ok(Self::Close),
            "status" => Ok(Self::Status),
            other => Err(HardwareError::unsupported(format!("barrier action '{other}'"))),
        }
    }
}

/// Last observed health of an integration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    #[default]
    Unknown,
    Online,
    Offline,
    Error,
}

impl DeviceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = HardwareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            "error" => Ok(Self::Error),
            other => Err(HardwareError::invalid_data(format!("device status '{other}'"))),
        }
    }
}

/// Whether an integration drives a barrier or provides images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationKind {
    Barrier,
    Camera,
}

impl IntegrationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Barrier => "barrier",
            Self::Camera => "camera",
        }
    }
}

impl fmt::Display for IntegrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntegrationKind {
    type Err = HardwareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "barrier" => Ok(Self::Barrier),
            "camera" => Ok(Self::Camera),
            other => Err(HardwareError::configuration(format!(
                "unknown integration kind '{other}'"
            ))),
        }
    }
}

/// Vendor binding selected by the integration's type tag.
///
/// ```
/// use plategate_hardware::types::VendorKind;
///
/// assert_eq!("Hikvision".parse::<VendorKind>().unwrap(), VendorKind::Hikvision);
/// assert_eq!("mock".parse::<VendorKind>().unwrap(), VendorKind::Simulated);
/// assert!("acme".parse::<VendorKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorKind {
    /// Generic HTTP controller driven by command templates.
    Http,
    Hikvision,
    Dahua,
    /// Relay wired to a GPIO line.
    Gpio,
    /// In-process device for development and tests.
    Simulated,
}

impl VendorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Hikvision => "hikvision",
            Self::Dahua => "dahua",
            Self::Gpio => "gpio",
            Self::Simulated => "simulated",
        }
    }
}

impl fmt::Display for VendorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VendorKind {
    type Err = HardwareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" | "generic" => Ok(Self::Http),
            "hikvision" => Ok(Self::Hikvision),
            "dahua" => Ok(Self::Dahua),
            "gpio" => Ok(Self::Gpio),
            "simulated" | "mock" => Ok(Self::Simulated),
            other => Err(HardwareError::configuration(format!("unknown vendor '{other}'"))),
        }
    }
}

// Text column decoding for storage models.
macro_rules! impl_try_from_string {
    ($($ty:ty),+) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = HardwareError;

                fn try_from(value: String) -> Result<Self, HardwareError> {
                    value.parse()
                }
            }
        )+
    };
}

impl_try_from_string!(DeviceStatus, IntegrationKind, VendorKind);

/// Per-integration request paths.
///
/// Generic HTTP controllers require the templates for the operations they
/// are asked to perform. Vendor bindings use their own defaults for any
/// template left unset. A template may start with an HTTP method, as in
/// `"PUT /api/relay/1"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplates {
    pub open_path: Option<String>,
    pub close_path: Option<String>,
    pub status_path: Option<String>,
    pub snapshot_path: Option<String>,
    pub stream_path: Option<String>,
}

impl CommandTemplates {
    /// Template for a barrier action, if configured.
    pub fn for_action(&self, action: BarrierAction) -> Option<&str> {
        match action {
            BarrierAction::Open => self.open_path.as_deref(),
            BarrierAction::Close => self.close_path.as_deref(),
            BarrierAction::Status => self.status_path.as_deref(),
        }
    }
}

/// GPIO relay pulse descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpioPulse {
    /// Line number exported under the sysfs GPIO root.
    pub pin: u32,

    /// How long the relay is held, in milliseconds.
    pub pulse_ms: u64,

    /// Drive the line low instead of high while pulsing.
    pub active_low: bool,
}

impl GpioPulse {
    pub fn new(pin: u32) -> Self {
        Self {
            pin,
            pulse_ms: DEFAULT_GPIO_PULSE_MS,
            active_low: false,
        }
    }

    pub fn pulse(&self) -> Duration {
        Duration::from_millis(self.pulse_ms)
    }
}

/// Hardware-side view of one configured integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationConfig {
    pub name: String,
    pub kind: IntegrationKind,
    pub vendor: VendorKind,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_token: Option<String>,
    pub gpio: Option<GpioPulse>,
    pub commands: CommandTemplates,
    pub timeout_ms: u64,
}

impl IntegrationConfig {
    /// Create a config with no connection details and the default timeout.
    pub fn new(name: impl Into<String>, kind: IntegrationKind, vendor: VendorKind) -> Self {
        Self {
            name: name.into(),
            kind,
            vendor,
            host: None,
            port: None,
            username: None,
            password: None,
            api_token: None,
            gpio: None,
            commands: CommandTemplates::default(),
            timeout_ms: DEFAULT_ADAPTER_TIMEOUT_MS,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_gpio(mut self, gpio: GpioPulse) -> Self {
        self.gpio = Some(gpio);
        self
    }

    pub fn with_commands(mut self, commands: CommandTemplates) -> Self {
        self.commands = commands;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Call timeout, falling back to the default for a zero value.
    pub fn timeout(&self) -> Duration {
        if self.timeout_ms == 0 {
            Duration::from_millis(DEFAULT_ADAPTER_TIMEOUT_MS)
        } else {
            Duration::from_millis(self.timeout_ms)
        }
    }
}

/// Live stream location for a camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub url: String,
    pub protocol: String,
}

impl StreamInfo {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let protocol = url
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .unwrap_or_else(|| "http".to_string());
        Self { url, protocol }
    }
}

/// Result of a barrier command. Never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub status: DeviceStatus,
    pub error: Option<String>,
}

impl ExecutionOutcome {
    pub fn ok(status: DeviceStatus) -> Self {
        Self {
            success: true,
            status,
            error: None,
        }
    }

    pub fn failed(err: &HardwareError) -> Self {
        Self {
            success: false,
            status: err.device_status(),
            error: Some(err.to_string()),
        }
    }
}

/// Result of a camera snapshot. Never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotOutcome {
    pub success: bool,
    pub status: DeviceStatus,
    pub image: Option<bytes::Bytes>,
    pub error: Option<String>,
}

impl SnapshotOutcome {
    pub fn ok(image: bytes::Bytes) -> Self {
        Self {
            success: true,
            status: DeviceStatus::Online,
            image: Some(image),
            error: None,
        }
    }

    pub fn failed(err: &HardwareError) -> Self {
        Self {
            success: false,
            status: err.device_status(),
            image: None,
            error: Some(err.to_string()),
        }
    }
}

/// Result of a stream location query. Never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOutcome {
    pub success: bool,
    pub status: DeviceStatus,
    pub stream: Option<StreamInfo>,
    pub error: Option<String>,
}

impl StreamOutcome {
    pub fn ok(stream: StreamInfo) -> Self {
        Self {
            success: true,
            status: DeviceStatus::Online,
            stream: Some(stream),
            error: None,
        }
    }

    pub fn failed(err: &HardwareError) -> Self {
        Self {
            success: false,
            status: err.device_status(),
            stream: None,
            error: Some(err.to_string()),
        }
    }
}

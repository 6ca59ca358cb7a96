//! Error types for hardware operations.
//!
//! Vendor bindings return these errors; the [`Adapter`](crate::adapter::Adapter)
//! converts them into structured outcomes so nothing escapes to callers on the
//! barrier path.

use crate::types::DeviceStatus;

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while talking to a barrier or camera.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device did not answer or refused the connection.
    #[error("Device unreachable: {device}")]
    Disconnected { device: String },

    /// Operation timed out after specified duration.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Operation is not supported by this vendor or integration kind.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// Transport-level failure while the device was reachable.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Device answered with a non-success HTTP status.
    #[error("Device responded with HTTP {code}: {body}")]
    Status { code: u16, body: String },

    /// Invalid data received from device.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Integration record is missing a field the vendor requires.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Generic I/O error (GPIO sysfs).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Status the integration should be flagged with after this failure.
    ///
    /// Unreachable devices are `offline`; a device that answered but
    /// misbehaved, or a broken integration record, is `error`.
    pub fn device_status(&self) -> DeviceStatus {
        match self {
            Self::Disconnected { .. } | Self::Timeout { .. } => DeviceStatus::Offline,
            Self::Io(err) if err.kind() == std::io::ErrorKind::NotFound => DeviceStatus::Offline,
            _ => DeviceStatus::Error,
        }
    }

    /// Map a reqwest failure for the named device.
    pub(crate) fn from_reqwest(device: &str, timeout_ms: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(timeout_ms)
        } else if err.is_connect() {
            Self::disconnected(device)
        } else if let Some(status) = err.status() {
            Self::Status {
                code: status.as_u16(),
                body: String::new(),
            }
        } else {
            Self::communication(err.to_string())
        }
    }
}

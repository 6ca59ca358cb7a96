use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Plate errors
    #[error("Invalid plate: {0}")]
    InvalidPlate(String),

    // Enumerated values stored as text
    #[error("Invalid severity: {0}")]
    InvalidSeverity(String),

    #[error("Invalid notification kind: {0}")]
    InvalidNotificationKind(String),

    #[error("Invalid delivery status: {0}")]
    InvalidDeliveryStatus(String),

    // Time-of-day parsing
    #[error("Invalid time of day '{value}': expected HH:MM")]
    InvalidTimeOfDay { value: String },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

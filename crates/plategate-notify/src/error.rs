use plategate_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Core(#[from] plategate_core::Error),

    #[error("Notification not found: {id}")]
    NotFound { id: i64 },

    #[error("{channel} channel not configured: {missing}")]
    NotConfigured {
        channel: &'static str,
        missing: &'static str,
    },

    #[error("{channel} delivery failed: {message}")]
    Delivery {
        channel: &'static str,
        message: String,
    },

    #[error("Notification queue is full")]
    QueueFull,

    #[error("Notification worker stopped")]
    WorkerStopped,
}

impl NotifyError {
    pub fn not_configured(channel: &'static str, missing: &'static str) -> Self {
        Self::NotConfigured { channel, missing }
    }

    pub fn delivery(channel: &'static str, message: impl Into<String>) -> Self {
        Self::Delivery {
            channel,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NotifyError>;

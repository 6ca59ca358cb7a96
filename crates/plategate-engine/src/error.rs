use plategate_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Request rejected before any side effect.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Recognition failed: {0}")]
    Classifier(String),

    #[error("Image capture failed: {0}")]
    Capture(String),

    #[error("Photo storage failed: {0}")]
    Photo(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Notify(#[from] plategate_notify::NotifyError),

    #[error(transparent)]
    Hardware(#[from] plategate_hardware::HardwareError),

    #[error(transparent)]
    Core(#[from] plategate_core::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Caller mistakes, whichever layer caught them.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Storage(StorageError::Validation(_)) | Self::Core(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Storage(e) => e.is_not_found(),
            Self::Notify(plategate_notify::NotifyError::NotFound { .. }) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

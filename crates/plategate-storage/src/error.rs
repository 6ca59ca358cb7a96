use thiserror::Error;

/// Storage-specific error types for the access pipeline.
///
/// These errors represent failures in database operations, validation and
/// decoding of stored values.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database connection or query execution failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration execution failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Entity not found in database
    #[error("Entity not found: {entity_type} with {field}={value}")]
    NotFound {
        entity_type: String,
        field: String,
        value: String,
    },

    /// Data validation failed (duplicate plate, malformed value)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Domain value rejected by the core types
    #[error("Invalid value: {0}")]
    Core(#[from] plategate_core::Error),

    /// Stored integration cannot be turned into a hardware config
    #[error("Integration error: {0}")]
    Hardware(#[from] plategate_hardware::HardwareError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StorageError {
    pub(crate) fn not_found(entity_type: &str, field: &str, value: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Turn a UNIQUE violation into a validation error, pass anything else through.
    pub(crate) fn unique_as_validation(err: sqlx::Error, message: impl FnOnce() -> String) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Validation(message()),
            _ => Self::Database(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

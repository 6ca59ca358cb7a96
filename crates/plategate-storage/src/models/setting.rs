use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Runtime key/value setting.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

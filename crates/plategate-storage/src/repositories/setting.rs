#![allow(async_fn_in_trait)]

use crate::error::StorageResult;
use crate::models::Setting;
use chrono::Utc;
use sqlx::SqlitePool;

/// Flat key/value settings store.
pub trait SettingRepository: Send + Sync {
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Insert or overwrite a value.
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    async fn all(&self) -> StorageResult<Vec<Setting>>;
}

/// SQLite implementation of SettingRepository
pub struct SqliteSettingRepository {
    pool: SqlitePool,
}

impl SqliteSettingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl SettingRepository for SqliteSettingRepository {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let value: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value.map(|(v,)| v))
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn all(&self) -> StorageResult<Vec<Setting>> {
        let settings = sqlx::query_as::<_, Setting>(
            "SELECT key, value, description, updated_at FROM settings ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use plategate_core::constants::{SETTING_QUIET_HOURS_ENABLED, SETTING_QUIET_HOURS_START};

    #[tokio::test]
    async fn test_defaults_are_seeded() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteSettingRepository::new(db.pool().clone());

        assert_eq!(repo.get(SETTING_QUIET_HOURS_ENABLED).await.unwrap().as_deref(), Some("false"));
        assert_eq!(repo.get(SETTING_QUIET_HOURS_START).await.unwrap().as_deref(), Some("22:00"));
        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteSettingRepository::new(db.pool().clone());

        repo.set(SETTING_QUIET_HOURS_ENABLED, "true").await.unwrap();
        repo.set("custom.key", "1").await.unwrap();

        assert_eq!(repo.get(SETTING_QUIET_HOURS_ENABLED).await.unwrap().as_deref(), Some("true"));
        let all = repo.all().await.unwrap();
        let seeded = all.iter().find(|s| s.key == SETTING_QUIET_HOURS_ENABLED).unwrap();
        assert!(seeded.description.is_some());
        assert!(all.iter().any(|s| s.key == "custom.key"));
    }
}

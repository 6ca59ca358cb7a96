#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::{Integration, NewIntegration};
use crate::transaction;
use chrono::{DateTime, Utc};
use plategate_hardware::{DeviceStatus, IntegrationKind};
use sqlx::SqlitePool;

/// Hardware integration records.
pub trait IntegrationRepository: Send + Sync {
    /// Create an integration. A primary integration clears the primary flag
    /// on every other integration of the same kind.
    async fn create(&self, integration: &NewIntegration) -> StorageResult<i64>;

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Integration>>;

    /// All integrations, optionally of one kind, ordered by id.
    async fn list(&self, kind: Option<IntegrationKind>) -> StorageResult<Vec<Integration>>;

    /// Record the outcome of the latest call to the device.
    async fn update_status(
        &self,
        id: i64,
        status: DeviceStatus,
        error: Option<&str>,
        at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Make `id` the only primary of its kind.
    async fn set_primary(&self, id: i64) -> StorageResult<()>;

    async fn set_active(&self, id: i64, active: bool) -> StorageResult<()>;
}

/// SQLite implementation of IntegrationRepository
pub struct SqliteIntegrationRepository {
    pool: SqlitePool,
}

impl SqliteIntegrationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

pub(crate) const SELECT_INTEGRATION: &str = r#"
    SELECT id, name, kind, vendor, host, port, username, password, api_token,
           gpio_pin, gpio_pulse_ms, gpio_active_low,
           open_path, close_path, status_path, snapshot_path, stream_path,
           timeout_ms, is_active, is_primary, last_status, last_error, last_checked_at,
           created_at, updated_at
    FROM integrations
"#;

impl IntegrationRepository for SqliteIntegrationRepository {
    async fn create(&self, integration: &NewIntegration) -> StorageResult<i64> {
        let mut tx = self.pool.begin().await?;
        let id = transaction::create_integration(&mut tx, integration).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Integration>> {
        let integration =
            sqlx::query_as::<_, Integration>(&format!("{SELECT_INTEGRATION} WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(integration)
    }

    async fn list(&self, kind: Option<IntegrationKind>) -> StorageResult<Vec<Integration>> {
        let integrations = match kind {
            Some(kind) => {
                sqlx::query_as::<_, Integration>(&format!(
                    "{SELECT_INTEGRATION} WHERE kind = ? ORDER BY id"
                ))
                .bind(kind.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Integration>(&format!("{SELECT_INTEGRATION} ORDER BY id"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(integrations)
    }

    async fn update_status(
        &self,
        id: i64,
        status: DeviceStatus,
        error: Option<&str>,
        at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE integrations
            SET last_status = ?, last_error = ?, last_checked_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(error)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Integration", "id", id));
        }

        Ok(())
    }

    async fn set_primary(&self, id: i64) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;
        transaction::set_primary_integration(&mut tx, id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn set_active(&self, id: i64, active: bool) -> StorageResult<()> {
        let result = sqlx::query("UPDATE integrations SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Integration", "id", id));
        }

        Ok(())
    }
}

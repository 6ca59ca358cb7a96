//! Transaction-aware operations for atomic multi-step writes.
//!
//! These functions take an open SQLite transaction so callers decide where
//! the atomic boundary sits. Dropping the transaction without `commit()`
//! rolls everything back.
//!
//! # Usage Pattern
//!
//! ```no_run
//! use plategate_storage::{Database, DatabaseConfig, transaction};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("plategate.db")).await?;
//!
//! let mut tx = db.pool().begin().await?;
//! transaction::set_primary_integration(&mut tx, 3).await?;
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{StorageError, StorageResult};
use crate::models::{NewIntegration, NewNotificationEvent};
use crate::repositories::notification::bind_insert;
use chrono::{DateTime, Utc};
use plategate_core::DeliveryStatus;
use plategate_hardware::IntegrationKind;
use sqlx::{QueryBuilder, Sqlite, Transaction};

/// Insert an integration; a primary one demotes the other primaries of its kind.
pub async fn create_integration(
    tx: &mut Transaction<'_, Sqlite>,
    integration: &NewIntegration,
) -> StorageResult<i64> {
    let config = &integration.config;
    let now = Utc::now();

    if integration.is_primary {
        clear_primary(tx, config.kind).await?;
    }

    let gpio = config.gpio.as_ref();
    let result = sqlx::query(
        r#"
        INSERT INTO integrations (
            name, kind, vendor, host, port, username, password, api_token,
            gpio_pin, gpio_pulse_ms, gpio_active_low,
            open_path, close_path, status_path, snapshot_path, stream_path,
            timeout_ms, is_active, is_primary, last_status, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'unknown', ?, ?)
        "#,
    )
    .bind(&config.name)
    .bind(config.kind.as_str())
    .bind(config.vendor.as_str())
    .bind(&config.host)
    .bind(config.port.map(i64::from))
    .bind(&config.username)
    .bind(&config.password)
    .bind(&config.api_token)
    .bind(gpio.map(|g| i64::from(g.pin)))
    .bind(gpio.map(|g| g.pulse_ms as i64))
    .bind(gpio.is_some_and(|g| g.active_low))
    .bind(&config.commands.open_path)
    .bind(&config.commands.close_path)
    .bind(&config.commands.status_path)
    .bind(&config.commands.snapshot_path)
    .bind(&config.commands.stream_path)
    .bind(config.timeout_ms as i64)
    .bind(integration.is_active)
    .bind(integration.is_primary)
    .bind(now)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Make `id` the only primary integration of its kind.
pub async fn set_primary_integration(tx: &mut Transaction<'_, Sqlite>, id: i64) -> StorageResult<()> {
    let kind: Option<(String,)> = sqlx::query_as("SELECT kind FROM integrations WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    let (kind,) = kind.ok_or_else(|| StorageError::not_found("Integration", "id", id))?;
    let kind: IntegrationKind = kind.parse()?;

    clear_primary(tx, kind).await?;

    sqlx::query("UPDATE integrations SET is_primary = 1, updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

async fn clear_primary(tx: &mut Transaction<'_, Sqlite>, kind: IntegrationKind) -> StorageResult<()> {
    sqlx::query(
        "UPDATE integrations SET is_primary = 0, updated_at = ? WHERE kind = ? AND is_primary = 1",
    )
    .bind(Utc::now())
    .bind(kind.as_str())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Store a quiet hours digest and mark the events it covered as sent.
///
/// Only ids that are still pending are marked, so an event resent by hand
/// in the meantime keeps its own status. Returns the digest id and the
/// number of events marked.
pub async fn record_digest(
    tx: &mut Transaction<'_, Sqlite>,
    digest: &NewNotificationEvent,
    drained_ids: &[i64],
    at: DateTime<Utc>,
) -> StorageResult<(i64, u64)> {
    let digest_id = bind_insert(digest, at)
        .execute(&mut **tx)
        .await?
        .last_insert_rowid();

    if drained_ids.is_empty() {
        return Ok((digest_id, 0));
    }

    let mut query = QueryBuilder::<Sqlite>::new("UPDATE notification_events SET status = ");
    query
        .push_bind(DeliveryStatus::Sent.as_str())
        .push(", sent_at = ")
        .push_bind(at)
        .push(", digest_id = ")
        .push_bind(digest_id)
        .push(" WHERE status = ")
        .push_bind(DeliveryStatus::Pending.as_str())
        .push(" AND id IN (");
    let mut ids = query.separated(", ");
    for id in drained_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(")");

    let marked = query.build().execute(&mut **tx).await?.rows_affected();
    Ok((digest_id, marked))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use crate::models::DeliveryRecord;
    use crate::repositories::{NotificationRepository, SqliteNotificationRepository};
    use plategate_core::{NotificationKind, Severity};

    fn pending(kind: NotificationKind) -> NewNotificationEvent {
        NewNotificationEvent {
            kind,
            title: kind.label().to_string(),
            message: "queued".to_string(),
            plate: None,
            photo_url: None,
            severity: Severity::Low,
            status: DeliveryStatus::Pending,
            delivery: DeliveryRecord::default(),
        }
    }

    #[tokio::test]
    async fn test_record_digest_marks_only_snapshot() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteNotificationRepository::new(db.pool().clone());

        let a = repo.create(&pending(NotificationKind::UnknownVehicle)).await.unwrap();
        let b = repo.create(&pending(NotificationKind::ManualOpen)).await.unwrap();
        let late = repo.create(&pending(NotificationKind::UnknownVehicle)).await.unwrap();

        let now = Utc::now();
        let digest = NewNotificationEvent {
            status: DeliveryStatus::Sent,
            delivery: DeliveryRecord {
                channels: vec!["email".to_string()],
                error_message: None,
                sent_at: Some(now),
            },
            ..pending(NotificationKind::QuietHoursSummary)
        };

        let mut tx = db.pool().begin().await.unwrap();
        let (digest_id, marked) = record_digest(&mut tx, &digest, &[a, b], now).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(marked, 2);
        for id in [a, b] {
            let event = repo.find_by_id(id).await.unwrap().unwrap();
            assert_eq!(event.status, DeliveryStatus::Sent);
            assert_eq!(event.digest_id, Some(digest_id));
        }
        let late = repo.find_by_id(late).await.unwrap().unwrap();
        assert_eq!(late.status, DeliveryStatus::Pending);

        let stored_digest = repo.find_by_id(digest_id).await.unwrap().unwrap();
        assert_eq!(stored_digest.kind, NotificationKind::QuietHoursSummary);
        assert_eq!(stored_digest.status, DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn test_rolled_back_digest_leaves_events_pending() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteNotificationRepository::new(db.pool().clone());
        let a = repo.create(&pending(NotificationKind::UnknownVehicle)).await.unwrap();

        let digest = pending(NotificationKind::QuietHoursSummary);
        {
            let mut tx = db.pool().begin().await.unwrap();
            record_digest(&mut tx, &digest, &[a], Utc::now()).await.unwrap();
            // dropped without commit
        }

        assert_eq!(repo.count_pending().await.unwrap(), 1);
        assert_eq!(repo.find_recent(10).await.unwrap().len(), 1);
    }
}

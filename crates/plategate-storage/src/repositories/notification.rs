#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::notification::join_channels;
use crate::models::{DeliveryRecord, NewNotificationEvent, NotificationEvent};
use chrono::{DateTime, Utc};
use plategate_core::{DeliveryStatus, Plate};
use sqlx::SqlitePool;

/// Notification audit history.
///
/// Status only changes through [`record_delivery`](Self::record_delivery),
/// [`record_retry`](Self::record_retry) and the digest transaction in
/// [`crate::transaction`].
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, event: &NewNotificationEvent) -> StorageResult<i64>;

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<NotificationEvent>>;

    /// Queued events, oldest first.
    async fn find_pending(&self) -> StorageResult<Vec<NotificationEvent>>;

    async fn count_pending(&self) -> StorageResult<i64>;

    /// Most recent events first.
    async fn find_recent(&self, limit: i64) -> StorageResult<Vec<NotificationEvent>>;

    /// Store the result of the first delivery of an event created before it
    /// was sent. `retry_count` is left alone.
    async fn record_delivery(&self, id: i64, delivery: &DeliveryRecord) -> StorageResult<()>;

    /// Store the result of a manual resend: bumps `retry_count` and
    /// `last_retry_at`, and sets status, channels and error from `delivery`.
    async fn record_retry(
        &self,
        id: i64,
        delivery: &DeliveryRecord,
        at: DateTime<Utc>,
    ) -> StorageResult<()>;
}

/// SQLite implementation of NotificationRepository
pub struct SqliteNotificationRepository {
    pool: SqlitePool,
}

impl SqliteNotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

pub(crate) const SELECT_EVENT: &str = r#"
    SELECT id, kind, title, message, plate, photo_url, severity, channels, status,
           error_message, retry_count, digest_id, created_at, last_retry_at, sent_at
    FROM notification_events
"#;

pub(crate) const INSERT_EVENT: &str = r#"
    INSERT INTO notification_events (
        kind, title, message, plate, photo_url, severity, channels, status,
        error_message, retry_count, created_at, sent_at
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
"#;

/// Bind a new event to [`INSERT_EVENT`].
pub(crate) fn bind_insert<'q>(
    event: &'q NewNotificationEvent,
    created_at: DateTime<Utc>,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    sqlx::query(INSERT_EVENT)
        .bind(event.kind.as_str())
        .bind(&event.title)
        .bind(&event.message)
        .bind(event.plate.as_ref().map(Plate::as_str))
        .bind(&event.photo_url)
        .bind(event.severity.as_str())
        .bind(join_channels(&event.delivery.channels))
        .bind(event.status.as_str())
        .bind(&event.delivery.error_message)
        .bind(created_at)
        .bind(event.delivery.sent_at)
}

impl NotificationRepository for SqliteNotificationRepository {
    async fn create(&self, event: &NewNotificationEvent) -> StorageResult<i64> {
        let result = bind_insert(event, Utc::now()).execute(&self.pool).await?;
        Ok(result.last_insert_rowid())
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<NotificationEvent>> {
        let event = sqlx::query_as::<_, NotificationEvent>(&format!("{SELECT_EVENT} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

    async fn find_pending(&self) -> StorageResult<Vec<NotificationEvent>> {
        let events = sqlx::query_as::<_, NotificationEvent>(&format!(
            "{SELECT_EVENT} WHERE status = ? ORDER BY id"
        ))
        .bind(DeliveryStatus::Pending.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn count_pending(&self) -> StorageResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM notification_events WHERE status = ?")
                .bind(DeliveryStatus::Pending.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn find_recent(&self, limit: i64) -> StorageResult<Vec<NotificationEvent>> {
        let events =
            sqlx::query_as::<_, NotificationEvent>(&format!("{SELECT_EVENT} ORDER BY id DESC LIMIT ?"))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;

        Ok(events)
    }

    async fn record_delivery(&self, id: i64, delivery: &DeliveryRecord) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE notification_events
            SET status = ?, channels = ?, error_message = ?, sent_at = ?
            WHERE id = ?
            "#,
        )
        .bind(delivery.status().as_str())
        .bind(join_channels(&delivery.channels))
        .bind(&delivery.error_message)
        .bind(delivery.sent_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("NotificationEvent", "id", id));
        }

        Ok(())
    }

    async fn record_retry(
        &self,
        id: i64,
        delivery: &DeliveryRecord,
        at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE notification_events
            SET status = ?, channels = ?, error_message = ?,
                retry_count = retry_count + 1, last_retry_at = ?,
                sent_at = COALESCE(?, sent_at)
            WHERE id = ?
            "#,
        )
        .bind(delivery.status().as_str())
        .bind(join_channels(&delivery.channels))
        .bind(&delivery.error_message)
        .bind(at)
        .bind(delivery.sent_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("NotificationEvent", "id", id));
        }

        Ok(())
    }
}

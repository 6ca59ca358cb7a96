#![allow(async_fn_in_trait)]

use crate::error::StorageResult;
use crate::models::{NewPassage, Passage, PassageCounts};
use chrono::{DateTime, Utc};
use plategate_core::Plate;
use plategate_core::constants::BLACKLIST_NOTE_PREFIX;
use sqlx::SqlitePool;

/// Passage ledger.
///
/// Append-only: there is deliberately no update or delete method, and the
/// schema rejects both.
pub trait PassageRepository: Send + Sync {
    /// Append a passage stamped with the current time.
    async fn record(&self, passage: &NewPassage) -> StorageResult<i64>;

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Passage>>;

    /// Most recent passages first.
    async fn find_recent(&self, limit: i64) -> StorageResult<Vec<Passage>>;

    async fn find_by_plate(&self, plate: &Plate, limit: i64) -> StorageResult<Vec<Passage>>;

    async fn find_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<Vec<Passage>>;

    /// Totals by outcome for passages at or after `since`.
    async fn count_by_outcome_since(&self, since: DateTime<Utc>) -> StorageResult<PassageCounts>;
}

/// SQLite implementation of PassageRepository
pub struct SqlitePassageRepository {
    pool: SqlitePool,
}

impl SqlitePassageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const SELECT_PASSAGE: &str = r#"
    SELECT id, plate, confidence, is_allowed, was_manual_open, barrier_opened,
           photo_url, notes, actor, created_at
    FROM passages
"#;

impl PassageRepository for SqlitePassageRepository {
    async fn record(&self, passage: &NewPassage) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO passages (
                plate, confidence, is_allowed, was_manual_open, barrier_opened,
                photo_url, notes, actor, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(passage.plate.as_ref().map(Plate::as_str))
        .bind(passage.confidence)
        .bind(passage.is_allowed)
        .bind(passage.was_manual_open)
        .bind(passage.barrier_opened)
        .bind(&passage.photo_url)
        .bind(&passage.notes)
        .bind(&passage.actor)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Passage>> {
        let passage = sqlx::query_as::<_, Passage>(&format!("{SELECT_PASSAGE} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(passage)
    }

    async fn find_recent(&self, limit: i64) -> StorageResult<Vec<Passage>> {
        let passages =
            sqlx::query_as::<_, Passage>(&format!("{SELECT_PASSAGE} ORDER BY id DESC LIMIT ?"))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;

        Ok(passages)
    }

    async fn find_by_plate(&self, plate: &Plate, limit: i64) -> StorageResult<Vec<Passage>> {
        let passages = sqlx::query_as::<_, Passage>(&format!(
            "{SELECT_PASSAGE} WHERE plate = ? ORDER BY id DESC LIMIT ?"
        ))
        .bind(plate.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(passages)
    }

    async fn find_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<Vec<Passage>> {
        let passages = sqlx::query_as::<_, Passage>(&format!(
            "{SELECT_PASSAGE} WHERE created_at >= ? AND created_at <= ? ORDER BY id DESC"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(passages)
    }

    async fn count_by_outcome_since(&self, since: DateTime<Utc>) -> StorageResult<PassageCounts> {
        let (total, allowed, manual_opens, blacklist_hits): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN is_allowed = 1 AND was_manual_open = 0 THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(CASE WHEN was_manual_open = 1 THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(CASE WHEN notes LIKE ? THEN 1 ELSE 0 END), 0)
            FROM passages
            WHERE created_at >= ?
            "#,
        )
        .bind(format!("{BLACKLIST_NOTE_PREFIX}%"))
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(PassageCounts {
            total,
            allowed,
            denied: total - allowed - manual_opens,
            manual_opens,
            blacklist_hits,
        })
    }
}

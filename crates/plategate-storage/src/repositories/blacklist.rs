#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::{BlacklistEntry, NewBlacklistEntry};
use chrono::{DateTime, Utc};
use plategate_core::Plate;
use sqlx::SqlitePool;

/// Blacklist half of the access registry.
pub trait BlacklistRepository: Send + Sync {
    /// Create an entry. A plate that is already listed is a validation error.
    async fn create(&self, entry: &NewBlacklistEntry) -> StorageResult<i64>;

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<BlacklistEntry>>;

    /// Find an entry by plate regardless of state.
    async fn find_by_plate(&self, plate: &Plate) -> StorageResult<Option<BlacklistEntry>>;

    /// Find an entry that is active and not expired at `now`.
    async fn find_active_by_plate(
        &self,
        plate: &Plate,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<BlacklistEntry>>;

    /// Increment the attempt counter and stamp the attempt time.
    ///
    /// Runs as a single statement, so concurrent detections never lose an
    /// increment. Returns the new count.
    async fn record_attempt(&self, id: i64, at: DateTime<Utc>) -> StorageResult<i64>;

    /// Update reason, severity, flags and expiry. The attempt counter is
    /// left untouched.
    async fn update(&self, entry: &BlacklistEntry) -> StorageResult<()>;

    async fn list(&self, include_inactive: bool) -> StorageResult<Vec<BlacklistEntry>>;
}

/// SQLite implementation of BlacklistRepository
pub struct SqliteBlacklistRepository {
    pool: SqlitePool,
}

impl SqliteBlacklistRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const SELECT_ENTRY: &str = r#"
    SELECT id, plate, reason, severity, is_active, notify_on_detection,
           attempt_count, last_attempt_at, expires_at, created_at, updated_at
    FROM blacklist
"#;

impl BlacklistRepository for SqliteBlacklistRepository {
    async fn create(&self, entry: &NewBlacklistEntry) -> StorageResult<i64> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO blacklist (
                plate, reason, severity, is_active, notify_on_detection,
                attempt_count, expires_at, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?)
            "#,
        )
        .bind(entry.plate.as_str())
        .bind(&entry.reason)
        .bind(entry.severity.as_str())
        .bind(entry.is_active)
        .bind(entry.notify_on_detection)
        .bind(entry.expires_at)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            StorageError::unique_as_validation(e, || {
                format!("Plate {} is already blacklisted", entry.plate)
            })
        })?;

        Ok(result.last_insert_rowid())
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<BlacklistEntry>> {
        let entry = sqlx::query_as::<_, BlacklistEntry>(&format!("{SELECT_ENTRY} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(entry)
    }

    async fn find_by_plate(&self, plate: &Plate) -> StorageResult<Option<BlacklistEntry>> {
        let entry = sqlx::query_as::<_, BlacklistEntry>(&format!("{SELECT_ENTRY} WHERE plate = ?"))
            .bind(plate.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(entry)
    }

    async fn find_active_by_plate(
        &self,
        plate: &Plate,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<BlacklistEntry>> {
        // Expiry is compared in Rust: stored timestamps are not guaranteed to
        // share one textual format.
        let entry = self.find_by_plate(plate).await?;
        Ok(entry.filter(|e| e.is_in_force(now)))
    }

    async fn record_attempt(&self, id: i64, at: DateTime<Utc>) -> StorageResult<i64> {
        let count: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE blacklist
            SET attempt_count = attempt_count + 1, last_attempt_at = ?
            WHERE id = ?
            RETURNING attempt_count
            "#,
        )
        .bind(at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        count
            .map(|(count,)| count)
            .ok_or_else(|| StorageError::not_found("BlacklistEntry", "id", id))
    }

    async fn update(&self, entry: &BlacklistEntry) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE blacklist
            SET reason = ?, severity = ?, is_active = ?, notify_on_detection = ?,
                expires_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&entry.reason)
        .bind(entry.severity.as_str())
        .bind(entry.is_active)
        .bind(entry.notify_on_detection)
        .bind(entry.expires_at)
        .bind(Utc::now())
        .bind(entry.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("BlacklistEntry", "id", entry.id));
        }

        Ok(())
    }

    async fn list(&self, include_inactive: bool) -> StorageResult<Vec<BlacklistEntry>> {
        let filter = if include_inactive { "" } else { "WHERE is_active = 1" };
        let entries =
            sqlx::query_as::<_, BlacklistEntry>(&format!("{SELECT_ENTRY} {filter} ORDER BY plate"))
                .fetch_all(&self.pool)
                .await?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use chrono::Duration;
    use plategate_core::Severity;

    async fn setup_test_db() -> Database {
        Database::in_memory().await.unwrap()
    }

    fn plate(raw: &str) -> Plate {
        Plate::new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_active() {
        let db = setup_test_db().await;
        let repo = SqliteBlacklistRepository::new(db.pool().clone());

        repo.create(&NewBlacklistEntry::new(plate("X999YY777"), "Stolen", Severity::Critical))
            .await
            .unwrap();

        let entry = repo
            .find_active_by_plate(&plate("x999yy777"), Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.severity, Severity::Critical);
        assert_eq!(entry.attempt_count, 0);
        assert!(entry.notify_on_detection);
    }

    #[tokio::test]
    async fn test_expired_and_inactive_entries_are_not_in_force() {
        let db = setup_test_db().await;
        let repo = SqliteBlacklistRepository::new(db.pool().clone());
        let now = Utc::now();

        repo.create(
            &NewBlacklistEntry::new(plate("EXP001"), "Old", Severity::Low)
                .with_expiry(now - Duration::hours(1)),
        )
        .await
        .unwrap();
        repo.create(&NewBlacklistEntry::new(plate("OFF001"), "Lifted", Severity::Low).with_active(false))
            .await
            .unwrap();
        repo.create(
            &NewBlacklistEntry::new(plate("FUT001"), "Ban", Severity::High)
                .with_expiry(now + Duration::days(7)),
        )
        .await
        .unwrap();

        assert!(repo.find_active_by_plate(&plate("EXP001"), now).await.unwrap().is_none());
        assert!(repo.find_active_by_plate(&plate("OFF001"), now).await.unwrap().is_none());
        assert!(repo.find_active_by_plate(&plate("FUT001"), now).await.unwrap().is_some());
        assert_eq!(repo.list(false).await.unwrap().len(), 2);
        assert_eq!(repo.list(true).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_record_attempt_increments() {
        let db = setup_test_db().await;
        let repo = SqliteBlacklistRepository::new(db.pool().clone());

        let id = repo
            .create(&NewBlacklistEntry::new(plate("K111KK11"), "Fraud", Severity::High))
            .await
            .unwrap();

        assert_eq!(repo.record_attempt(id, Utc::now()).await.unwrap(), 1);
        assert_eq!(repo.record_attempt(id, Utc::now()).await.unwrap(), 2);

        let entry = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(entry.attempt_count, 2);
        assert!(entry.last_attempt_at.is_some());
    }

    #[tokio::test]
    async fn test_record_attempt_missing_entry() {
        let db = setup_test_db().await;
        let repo = SqliteBlacklistRepository::new(db.pool().clone());

        assert!(repo.record_attempt(7, Utc::now()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_update_keeps_attempt_count() {
        let db = setup_test_db().await;
        let repo = SqliteBlacklistRepository::new(db.pool().clone());

        let id = repo
            .create(&NewBlacklistEntry::new(plate("M222MM22"), "Debt", Severity::Medium))
            .await
            .unwrap();
        repo.record_attempt(id, Utc::now()).await.unwrap();

        let mut entry = repo.find_by_id(id).await.unwrap().unwrap();
        entry.attempt_count = 0;
        entry.reason = "Paid".to_string();
        entry.is_active = false;
        repo.update(&entry).await.unwrap();

        let stored = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.reason, "Paid");
        assert!(!stored.is_active);
        assert_eq!(stored.attempt_count, 1);
    }
}

//! SQLite pool setup.
//!
//! File databases run in WAL mode so the passage ledger can be appended while
//! the notification worker reads and updates events. Migrations are embedded
//! from the workspace `migrations/` directory.

use crate::error::{StorageError, StorageResult};
use serde::Serialize;
use sqlx::ConnectOptions;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite file. Parent directories are created on open.
    pub database_path: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
    /// Wait for a free pooled connection before failing.
    pub acquire_timeout: Duration,
    /// Wait on a locked database before `SQLITE_BUSY` is returned.
    pub busy_timeout: Duration,
    pub create_if_missing: bool,
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_path: "plategate.db".to_string(),
            max_connections: 10,
            min_connections: 2,
            max_lifetime: Duration::from_secs(30 * 60),
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(10),
            create_if_missing: true,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    pub fn new(database_path: impl Into<String>) -> Self {
        Self {
            database_path: database_path.into(),
            ..Self::default()
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub fn auto_migrate(mut self, migrate: bool) -> Self {
        self.auto_migrate = migrate;
        self
    }
}

/// Row counts used by status reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseStats {
    pub vehicles: i64,
    pub blacklist_entries: i64,
    pub passages: i64,
    pub pending_notifications: i64,
    pub integrations: i64,
}

/// Shared handle to the pool. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the pool, creating the file and running migrations as configured.
    ///
    /// ```no_run
    /// use plategate_storage::connection::{Database, DatabaseConfig};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let db = Database::new(DatabaseConfig::new("data/plategate.db").max_connections(5)).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(config: DatabaseConfig) -> StorageResult<Self> {
        let path = Path::new(&config.database_path);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| {
                StorageError::Configuration(format!("cannot create {}: {e}", dir.display()))
            })?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", config.database_path))
            .map_err(|e| {
                StorageError::Configuration(format!("bad database path '{}': {e}", config.database_path))
            })?
            .create_if_missing(config.create_if_missing)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .max_lifetime(Some(config.max_lifetime))
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        if config.auto_migrate {
            db.migrate().await?;
        }

        info!(path = %config.database_path, max_connections = config.max_connections, "Database opened");
        Ok(db)
    }

    /// Migrated in-memory database on a single connection.
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // A second connection would open a second, empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        debug!("Migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn stats(&self) -> StorageResult<DatabaseStats> {
        let row: (i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM vehicles),
                (SELECT COUNT(*) FROM blacklist),
                (SELECT COUNT(*) FROM passages),
                (SELECT COUNT(*) FROM notification_events WHERE status = 'pending'),
                (SELECT COUNT(*) FROM integrations)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DatabaseStats {
            vehicles: row.0,
            blacklist_entries: row.1,
            passages: row.2,
            pending_notifications: row.3,
            integrations: row.4,
        })
    }
}

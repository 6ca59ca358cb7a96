//! Storage layer for the plate-recognition access pipeline.
//!
//! This crate provides SQLite-backed persistence for the access registry
//! (allowlisted vehicles and the blacklist), the passage ledger, notification
//! history, hardware integrations and runtime settings.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool manager with embedded migrations
//! - Repository traits with SQLite implementations, one per table
//! - [`transaction`] - Multi-step writes that must be atomic
//!
//! # Invariants kept here
//!
//! - Plates are stored normalized and are unique per table.
//! - Blacklist attempt counters are incremented by a single `UPDATE ...
//!   RETURNING` statement, never read-modify-write.
//! - The passage ledger is append-only; triggers reject updates and deletes.
//! - Setting an integration as primary demotes every other primary of the
//!   same kind in the same transaction.
//!
//! # Example
//!
//! ```no_run
//! use plategate_core::{Plate, Severity};
//! use plategate_storage::{Database, DatabaseConfig};
//! use plategate_storage::models::NewBlacklistEntry;
//! use plategate_storage::repositories::{BlacklistRepository, SqliteBlacklistRepository};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("plategate.db")).await?;
//! let blacklist = SqliteBlacklistRepository::new(db.pool().clone());
//!
//! let plate = Plate::new("X999YY777")?;
//! blacklist
//!     .create(&NewBlacklistEntry::new(plate.clone(), "Stolen", Severity::Critical))
//!     .await?;
//!
//! if let Some(entry) = blacklist.find_active_by_plate(&plate, chrono::Utc::now()).await? {
//!     let attempts = blacklist.record_attempt(entry.id, chrono::Utc::now()).await?;
//!     println!("{plate} seen {attempts} times");
//! }
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;
pub mod transaction;

pub use connection::{Database, DatabaseConfig, DatabaseStats};
pub use error::{StorageError, StorageResult};
pub use models::{
    BlacklistEntry, DeliveryRecord, Integration, NewBlacklistEntry, NewIntegration,
    NewNotificationEvent, NewPassage, NewVehicle, NotificationEvent, Passage, PassageCounts,
    Setting, Vehicle,
};
pub use repositories::{
    BlacklistRepository, IntegrationRepository, NotificationRepository, PassageRepository,
    SettingRepository, SqliteBlacklistRepository, SqliteIntegrationRepository,
    SqliteNotificationRepository, SqlitePassageRepository, SqliteSettingRepository,
    SqliteVehicleRepository, VehicleRepository,
};

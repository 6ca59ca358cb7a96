pub mod blacklist;
pub mod integration;
pub mod notification;
pub mod passage;
pub mod setting;
pub mod vehicle;

pub use blacklist::{BlacklistRepository, SqliteBlacklistRepository};
pub use integration::{IntegrationRepository, SqliteIntegrationRepository};
pub use notification::{NotificationRepository, SqliteNotificationRepository};
pub use passage::{PassageRepository, SqlitePassageRepository};
pub use setting::{SettingRepository, SqliteSettingRepository};
pub use vehicle::{SqliteVehicleRepository, VehicleRepository};

pub mod blacklist;
pub mod integration;
pub mod notification;
pub mod passage;
pub mod setting;
pub mod vehicle;

pub use blacklist::{BlacklistEntry, NewBlacklistEntry};
pub use integration::{Integration, NewIntegration};
pub use notification::{DeliveryRecord, NewNotificationEvent, NotificationEvent};
pub use passage::{NewPassage, Passage, PassageCounts};
pub use setting::Setting;
pub use vehicle::{NewVehicle, Vehicle};

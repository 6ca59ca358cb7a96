//! Notification routing for the plate-recognition access pipeline.
//!
//! - [`router`] - quiet hours aware dispatch and manual resend
//! - [`channels`] - email, Telegram and simulated delivery channels
//! - [`drain`] - quiet hours digest
//! - [`scheduler`] - periodic drain once quiet hours end
//! - [`worker`] - bounded background queue used by the access flows
//!
//! Channel configuration and the quiet hours window are read from the
//! settings table on every dispatch.

pub mod channels;
pub mod drain;
pub mod error;
pub mod event;
pub mod quiet_hours;
pub mod router;
pub mod scheduler;
pub mod settings;
pub mod worker;

pub use channels::{AnyChannel, Channel, DeliveryReport, SimulatedChannel, TelegramIdentity};
pub use drain::DrainReport;
pub use error::{NotifyError, Result};
pub use event::Notification;
pub use router::{DispatchOutcome, NotificationRouter, ResendOutcome};
pub use scheduler::{DrainScheduler, SchedulerConfig, SchedulerHandle};
pub use settings::{DispatchSettings, QuietHoursConfig};
pub use worker::{NotificationWorker, NotifierHandle, WorkerConfig};

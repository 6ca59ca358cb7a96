//! Hardware adapter layer for the plate-recognition access pipeline.
//!
//! This crate provides the capability interface for vehicle barriers and
//! cameras, vendor bindings behind it, and the [`Adapter`] facade the rest of
//! the system calls.
//!
//! # Design
//!
//! - **Async-first**: device traits use native `async fn` (Edition 2024 RPITIT).
//! - **Enum dispatch**: a vendor tag selects an [`AnyBarrier`] or
//!   [`AnyCamera`] variant in a single lookup.
//! - **Bounded**: every adapter call runs under the integration's timeout.
//! - **Total**: adapter calls return outcomes, never errors.
//!
//! # Example
//!
//! ```
//! use plategate_hardware::{Adapter, AdapterConfig, BarrierAction, IntegrationConfig};
//! use plategate_hardware::types::{IntegrationKind, VendorKind};
//!
//! #[tokio::main]
//! async fn main() -> plategate_hardware::Result<()> {
//!     let adapter = Adapter::new(AdapterConfig::default())?;
//!     let gate = IntegrationConfig::new("gate", IntegrationKind::Barrier, VendorKind::Simulated);
//!
//!     let outcome = adapter.execute(&gate, BarrierAction::Open).await;
//!     assert!(outcome.success);
//!     Ok(())
//! }
//! ```
//!
//! [`AnyBarrier`]: devices::AnyBarrier
//! [`AnyCamera`]: devices::AnyCamera

pub mod adapter;
pub mod devices;
pub mod error;
pub mod mock;
pub mod primary;
pub mod traits;
pub mod types;
pub mod vendors;

pub use adapter::{Adapter, AdapterConfig};
pub use error::{HardwareError, Result};
pub use primary::{PrimaryCandidate, PrimarySelection, select_primary};
pub use types::{
    BarrierAction, CommandTemplates, DeviceStatus, ExecutionOutcome, GpioPulse, IntegrationConfig,
    IntegrationKind, SnapshotOutcome, StreamInfo, StreamOutcome, VendorKind,
};

//! Access decisions for the plate-recognition barrier.
//!
//! A recognition goes through the classifier, the photo store and the
//! decision engine; the engine consults the registry, drives the primary
//! barrier through the hardware gateway, appends to the passage ledger and
//! queues notifications. [`AccessService`] exposes every operation.
//!
//! ```text
//! image ──► classifier ──► decision engine ──► passage ledger
//!                               │     │
//!                               │     └──► notification worker ──► router
//!                               └──► hardware gateway ──► barrier
//! ```

pub mod blacklist_csv;
pub mod classifier;
pub mod decision;
pub mod error;
pub mod gateway;
pub mod photos;
pub mod service;
pub mod settings;
pub mod summary;

pub use blacklist_csv::{ImportOptions, ImportReport, RowError};
pub use classifier::{
    AnyClassifier, ClassifierConfig, HttpClassifier, MockClassifier, PlateClassifier, Recognition,
};
pub use decision::{
    DecisionEngine, DecisionOutcome, DecisionRequest, ManualOpenRequest, ManualOpenResponse,
};
pub use error::{EngineError, Result};
pub use gateway::HardwareGateway;
pub use photos::{PhotoConfig, PhotoStore};
pub use service::{
    AccessService, AnalyzeResponse, BlacklistCheck, IntegrationResponse, ResendResponse,
    ServiceBuilder,
};
pub use settings::AccessSettings;

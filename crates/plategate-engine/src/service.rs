//! Access service facade.
//!
//! One entry point per external operation. The service owns the decision
//! engine, the hardware gateway and the notification router, and is built
//! together with the background notification worker.
//!
//! # Example
//!
//! ```no_run
//! use plategate_engine::AccessService;
//! use plategate_storage::{Database, DatabaseConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("plategate.db")).await?;
//! let (service, worker) = AccessService::builder(db).build()?;
//!
//! let response = service.open_barrier(true, Some("Delivery".into()), "guard").await?;
//! println!("barrier opened: {}", response.success);
//!
//! worker.shutdown().await;
//! # Ok(())
//! # }
//! ```

use chrono::Utc;
use plategate_core::{Decision, Plate};
use plategate_hardware::{
    Adapter, AdapterConfig, BarrierAction, DeviceStatus, IntegrationKind, StreamOutcome,
};
use plategate_notify::{
    AnyChannel, DispatchOutcome, DrainReport, NotificationRouter, NotificationWorker,
    NotifierHandle, TelegramIdentity, WorkerConfig,
};
use plategate_storage::Database;
use plategate_storage::models::{BlacklistEntry, Integration};
use plategate_storage::repositories::{
    BlacklistRepository, IntegrationRepository, SqliteBlacklistRepository,
    SqliteIntegrationRepository, SqlitePassageRepository, SqliteSettingRepository,
    SqliteVehicleRepository,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::blacklist_csv::{self, ImportOptions, ImportReport};
use crate::classifier::{AnyClassifier, MockClassifier, PlateClassifier};
use crate::decision::{DecisionEngine, DecisionRequest, ManualOpenRequest, ManualOpenResponse};
use crate::error::{EngineError, Result};
use crate::gateway::HardwareGateway;
use crate::photos::{PhotoConfig, PhotoStore};
use crate::summary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyzeResponse {
    pub plate: Option<String>,
    pub confidence: i32,
    pub decision: Decision,
    pub is_allowed: bool,
    pub is_blacklisted: bool,
    pub barrier_opened: bool,
    pub passage_id: i64,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlacklistCheck {
    pub is_blacklisted: bool,
    pub entry: Option<BlacklistEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResendResponse {
    pub success: bool,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrationResponse {
    pub success: bool,
    pub status: DeviceStatus,
    pub error: Option<String>,
}

pub struct ServiceBuilder {
    db: Database,
    adapter: AdapterConfig,
    photos: PhotoConfig,
    worker: WorkerConfig,
    classifier: Option<AnyClassifier>,
    channels: Vec<AnyChannel>,
    http: reqwest::Client,
}

impl ServiceBuilder {
    pub fn adapter(mut self, config: AdapterConfig) -> Self {
        self.adapter = config;
        self
    }

    pub fn photos(mut self, config: PhotoConfig) -> Self {
        self.photos = config;
        self
    }

    pub fn worker(mut self, config: WorkerConfig) -> Self {
        self.worker = config;
        self
    }

    pub fn classifier(mut self, classifier: impl Into<AnyClassifier>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// Channel used on every delivery in addition to the configured ones.
    pub fn channel(mut self, channel: impl Into<AnyChannel>) -> Self {
        self.channels.push(channel.into());
        self
    }

    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Build the service and start its notification worker. Must be called
    /// from within a Tokio runtime.
    pub fn build(self) -> Result<(AccessService, NotificationWorker)> {
        let adapter = Adapter::new(self.adapter)?;
        let gateway = Arc::new(HardwareGateway::new(&self.db, adapter));

        let router = self
            .channels
            .into_iter()
            .fold(NotificationRouter::new(&self.db, self.http), |router, channel| {
                router.with_channel(channel)
            });
        let router = Arc::new(router);
        let (worker, notifier) = NotificationWorker::spawn(router.clone(), self.worker);

        let classifier = self.classifier.unwrap_or_else(|| {
            warn!("No plate classifier configured, recognition will read no plates");
            AnyClassifier::Mock(MockClassifier::new())
        });

        let pool = self.db.pool().clone();
        let service = AccessService {
            engine: DecisionEngine::new(&self.db, gateway.clone(), notifier.clone()),
            gateway,
            router,
            notifier,
            classifier,
            photos: PhotoStore::new(self.photos),
            vehicles: SqliteVehicleRepository::new(pool.clone()),
            blacklist: SqliteBlacklistRepository::new(pool.clone()),
            passages: SqlitePassageRepository::new(pool.clone()),
            settings: SqliteSettingRepository::new(pool),
        };
        Ok((service, worker))
    }
}

pub struct AccessService {
    engine: DecisionEngine,
    gateway: Arc<HardwareGateway>,
    router: Arc<NotificationRouter>,
    notifier: NotifierHandle,
    classifier: AnyClassifier,
    photos: PhotoStore,
    vehicles: SqliteVehicleRepository,
    blacklist: SqliteBlacklistRepository,
    passages: SqlitePassageRepository,
    settings: SqliteSettingRepository,
}

impl AccessService {
    pub fn builder(db: Database) -> ServiceBuilder {
        ServiceBuilder {
            db,
            adapter: AdapterConfig::default(),
            photos: PhotoConfig::default(),
            worker: WorkerConfig::default(),
            classifier: None,
            channels: Vec::new(),
            http: reqwest::Client::new(),
        }
    }

    // ------------------------------------------------------------------
    // Recognition and barrier
    // ------------------------------------------------------------------

    /// Recognize the plate in `image`, store the photo and decide.
    pub async fn analyze(&self, image: &[u8], auto_open: bool, actor: &str) -> Result<AnalyzeResponse> {
        let recognition = self.classifier.classify(image).await?;

        let photo_url = match self.photos.save(image).await {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Photo not stored, continuing without it");
                None
            }
        };

        let outcome = self
            .engine
            .decide(DecisionRequest {
                recognition,
                auto_open,
                actor: actor.to_string(),
                photo_url: photo_url.clone(),
            })
            .await?;

        Ok(AnalyzeResponse {
            plate: outcome.plate.map(String::from),
            confidence: outcome.confidence,
            decision: outcome.decision,
            is_allowed: outcome.decision.is_allowed(),
            is_blacklisted: outcome.decision.is_blocked(),
            barrier_opened: outcome.barrier_opened,
            passage_id: outcome.passage_id,
            photo_url,
        })
    }

    /// Take a snapshot from the primary camera and analyze it.
    pub async fn capture_and_analyze(&self, auto_open: bool, actor: &str) -> Result<AnalyzeResponse> {
        let camera = self
            .gateway
            .primary(IntegrationKind::Camera)
            .await?
            .ok_or_else(|| EngineError::Capture("no camera integration configured".to_string()))?;

        let snapshot = self.gateway.snapshot(&camera).await;
        let image = match snapshot.image {
            Some(image) if snapshot.success => image,
            _ => {
                return Err(EngineError::Capture(
                    snapshot.error.unwrap_or_else(|| "camera returned no image".to_string()),
                ));
            }
        };

        self.analyze(&image, auto_open, actor).await
    }

    pub async fn open_barrier(
        &self,
        confirm: bool,
        notes: Option<String>,
        actor: &str,
    ) -> Result<ManualOpenResponse> {
        self.engine
            .manual_open(ManualOpenRequest {
                confirm,
                notes,
                actor: actor.to_string(),
            })
            .await
    }

    // ------------------------------------------------------------------
    // Blacklist
    // ------------------------------------------------------------------

    /// Read-only lookup; does not count as a detection.
    pub async fn check_blacklist(&self, plate: &str) -> Result<BlacklistCheck> {
        let plate = Plate::new(plate)?;
        let entry = self.blacklist.find_active_by_plate(&plate, Utc::now()).await?;
        Ok(BlacklistCheck {
            is_blacklisted: entry.is_some(),
            entry,
        })
    }

    pub async fn export_blacklist(&self, include_inactive: bool) -> Result<String> {
        blacklist_csv::export(&self.blacklist, include_inactive).await
    }

    pub async fn import_blacklist(&self, csv: &str, options: ImportOptions) -> Result<ImportReport> {
        blacklist_csv::import(&self.blacklist, csv, options).await
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    pub async fn resend_notification(&self, id: i64) -> Result<ResendResponse> {
        let outcome = self.router.resend(id).await?;
        Ok(ResendResponse {
            success: outcome.sent,
            error_message: outcome.error_message,
        })
    }

    pub async fn drain_quiet_hours(&self) -> Result<DrainReport> {
        Ok(self.router.drain().await?)
    }

    /// Build and route the summary of the last 24 hours.
    pub async fn send_daily_summary(&self) -> Result<DispatchOutcome> {
        let counts = summary::daily_counts(&self.passages, Utc::now()).await?;
        let outcome = self.router.dispatch(summary::compose(&counts)).await?;
        info!(total = counts.total, queued = outcome.queued, sent = outcome.sent, "Daily summary routed");
        Ok(outcome)
    }

    pub async fn verify_telegram(&self) -> Result<TelegramIdentity> {
        Ok(self.router.verify_telegram().await?)
    }

    /// Wait until queued notifications have been routed.
    pub async fn flush_notifications(&self) -> Result<()> {
        Ok(self.notifier.flush().await?)
    }

    // ------------------------------------------------------------------
    // Integrations
    // ------------------------------------------------------------------

    pub async fn list_integrations(&self, kind: Option<IntegrationKind>) -> Result<Vec<Integration>> {
        Ok(self.gateway.integrations().list(kind).await?)
    }

    pub async fn test_integration(&self, id: i64) -> Result<IntegrationResponse> {
        let integration = self.integration(id).await?;
        Ok(self.gateway.test(&integration).await.into())
    }

    pub async fn execute_integration(&self, id: i64, action: BarrierAction) -> Result<IntegrationResponse> {
        let integration = self.integration(id).await?;
        Ok(self.gateway.execute(&integration, action).await.into())
    }

    pub async fn integration_stream(&self, id: i64) -> Result<StreamOutcome> {
        let integration = self.integration(id).await?;
        Ok(self.gateway.stream_info(&integration).await)
    }

    /// Make `id` the only primary of its kind.
    pub async fn set_primary_integration(&self, id: i64) -> Result<()> {
        self.gateway.integrations().set_primary(id).await?;
        info!(integration_id = id, "Primary integration changed");
        Ok(())
    }

    async fn integration(&self, id: i64) -> Result<Integration> {
        self.gateway
            .integrations()
            .find_by_id(id)
            .await?
            .ok_or(EngineError::NotFound {
                entity: "Integration",
                id,
            })
    }

    // ------------------------------------------------------------------
    // Registry access for administration
    // ------------------------------------------------------------------

    pub fn vehicles(&self) -> &SqliteVehicleRepository {
        &self.vehicles
    }

    pub fn blacklist(&self) -> &SqliteBlacklistRepository {
        &self.blacklist
    }

    pub fn passages(&self) -> &SqlitePassageRepository {
        &self.passages
    }

    pub fn settings(&self) -> &SqliteSettingRepository {
        &self.settings
    }

    pub fn integrations(&self) -> &SqliteIntegrationRepository {
        self.gateway.integrations()
    }

    /// Shared router, for running a [`plategate_notify::DrainScheduler`]
    /// alongside the service.
    pub fn router(&self) -> &Arc<NotificationRouter> {
        &self.router
    }

    pub fn adapter(&self) -> &Adapter {
        self.gateway.adapter()
    }
}

impl From<plategate_hardware::ExecutionOutcome> for IntegrationResponse {
    fn from(outcome: plategate_hardware::ExecutionOutcome) -> Self {
        Self {
            success: outcome.success,
            status: outcome.status,
            error: outcome.error,
        }
    }
}

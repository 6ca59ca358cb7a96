//! Access decision engine.
//!
//! Precedence is fixed: no readable plate means `Unknown`, an in-force
//! blacklist entry means `Blocked` even for allowlisted vehicles, an active
//! allowlist entry means `Allowed`, anything else is `Unknown`. Only
//! `Allowed` with auto-open ever moves the barrier.
//!
//! Each call appends exactly one passage once the outcome is final.
//! Notifications are queued on the background worker; the decision never
//! waits for delivery.

use chrono::Utc;
use plategate_core::constants::BLACKLIST_NOTE_PREFIX;
use plategate_core::{Decision, NotificationKind, Plate, Severity};
use plategate_hardware::{BarrierAction, IntegrationKind};
use plategate_notify::{Notification, NotifierHandle};
use plategate_storage::Database;
use plategate_storage::models::{BlacklistEntry, NewPassage, Vehicle};
use plategate_storage::repositories::{
    BlacklistRepository, PassageRepository, SqliteBlacklistRepository, SqlitePassageRepository,
    SqliteSettingRepository, SqliteVehicleRepository, VehicleRepository,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::classifier::Recognition;
use crate::error::{EngineError, Result};
use crate::gateway::HardwareGateway;
use crate::settings::AccessSettings;

/// One recognition to decide on.
#[derive(Debug, Clone)]
pub struct DecisionRequest {
    pub recognition: Recognition,
    pub auto_open: bool,
    pub actor: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub decision: Decision,
    pub plate: Option<Plate>,
    pub confidence: i32,
    pub barrier_opened: bool,
    pub passage_id: i64,
    pub blacklist_entry: Option<BlacklistEntry>,
    pub vehicle: Option<Vehicle>,
}

#[derive(Debug, Clone)]
pub struct ManualOpenRequest {
    pub confirm: bool,
    pub notes: Option<String>,
    pub actor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManualOpenResponse {
    pub success: bool,
    pub passage_id: i64,
    pub error: Option<String>,
}

pub struct DecisionEngine {
    vehicles: SqliteVehicleRepository,
    blacklist: SqliteBlacklistRepository,
    passages: SqlitePassageRepository,
    settings: SqliteSettingRepository,
    gateway: Arc<HardwareGateway>,
    notifier: NotifierHandle,
}

/// Intermediate result before the passage is written.
struct Verdict {
    decision: Decision,
    passage: NewPassage,
    notification: Option<Notification>,
    blacklist_entry: Option<BlacklistEntry>,
    vehicle: Option<Vehicle>,
}

impl DecisionEngine {
    pub fn new(db: &Database, gateway: Arc<HardwareGateway>, notifier: NotifierHandle) -> Self {
        let pool = db.pool().clone();
        Self {
            vehicles: SqliteVehicleRepository::new(pool.clone()),
            blacklist: SqliteBlacklistRepository::new(pool.clone()),
            passages: SqlitePassageRepository::new(pool.clone()),
            settings: SqliteSettingRepository::new(pool),
            gateway,
            notifier,
        }
    }

    pub async fn decide(&self, request: DecisionRequest) -> Result<DecisionOutcome> {
        let DecisionRequest {
            recognition,
            auto_open,
            actor,
            photo_url,
        } = request;
        let confidence = recognition.confidence;

        let plate = recognition.plate.as_deref().and_then(Plate::from_reading);

        let verdict = match &plate {
            None => Verdict {
                decision: Decision::Unknown,
                passage: NewPassage::recognition(None, confidence, &actor),
                notification: None,
                blacklist_entry: None,
                vehicle: None,
            },
            Some(plate) => self.evaluate(plate, confidence, auto_open, &actor).await?,
        };

        let passage_id = self
            .passages
            .record(&verdict.passage.clone().with_photo_url(photo_url.clone()))
            .await?;

        info!(
            plate = ?plate.as_ref().map(Plate::as_str),
            decision = %verdict.decision,
            barrier_opened = verdict.passage.barrier_opened,
            passage_id,
            %actor,
            "Access decision"
        );

        if let Some(notification) = verdict.notification {
            self.notify(notification.with_photo_url(photo_url));
        }

        Ok(DecisionOutcome {
            decision: verdict.decision,
            plate,
            confidence,
            barrier_opened: verdict.passage.barrier_opened,
            passage_id,
            blacklist_entry: verdict.blacklist_entry,
            vehicle: verdict.vehicle,
        })
    }

    async fn evaluate(
        &self,
        plate: &Plate,
        confidence: i32,
        auto_open: bool,
        actor: &str,
    ) -> Result<Verdict> {
        let now = Utc::now();

        if let Some(entry) = self.blacklist.find_active_by_plate(plate, now).await? {
            let attempts = self.blacklist.record_attempt(entry.id, now).await?;
            warn!(%plate, severity = %entry.severity, attempts, "Blacklisted plate detected");

            let notification = entry.notify_on_detection.then(|| {
                Notification::new(
                    NotificationKind::BlacklistDetected,
                    format!(
                        "Blacklisted vehicle {plate} at the gate: {} (attempt #{attempts})",
                        entry.reason
                    ),
                )
                .with_plate(plate.clone())
                .with_severity(entry.severity)
            });

            return Ok(Verdict {
                decision: Decision::Blocked,
                passage: NewPassage::recognition(Some(plate.clone()), confidence, actor)
                    .with_notes(Some(format!("{BLACKLIST_NOTE_PREFIX}: {}", entry.reason))),
                notification,
                blacklist_entry: Some(entry),
                vehicle: None,
            });
        }

        if let Some(vehicle) = self.vehicles.find_active_by_plate(plate).await? {
            // Settings are read before the barrier moves so a failed read
            // cannot leave an opened barrier without a passage record.
            let notify_allowed = match AccessSettings::load(&self.settings).await {
                Ok(settings) => settings.notify_allowed_passage,
                Err(e) => {
                    warn!(error = %e, "Access settings unavailable, allowed-passage notice skipped");
                    false
                }
            };

            let barrier_opened = auto_open && self.open_primary_barrier().await.is_ok();

            let notification = notify_allowed.then(|| {
                let owner = vehicle.owner_name.as_deref().unwrap_or("registered vehicle");
                Notification::new(
                    NotificationKind::AllowedPassage,
                    format!("{plate} ({owner}) passed the gate"),
                )
                .with_plate(plate.clone())
                .with_severity(Severity::Low)
            });

            return Ok(Verdict {
                decision: Decision::Allowed,
                passage: NewPassage::recognition(Some(plate.clone()), confidence, actor)
                    .allowed(true)
                    .barrier_opened(barrier_opened),
                notification,
                blacklist_entry: None,
                vehicle: Some(vehicle),
            });
        }

        Ok(Verdict {
            decision: Decision::Unknown,
            passage: NewPassage::recognition(Some(plate.clone()), confidence, actor),
            notification: Some(
                Notification::new(
                    NotificationKind::UnknownVehicle,
                    format!("Unknown vehicle {plate} at the gate (confidence {confidence}%)"),
                )
                .with_plate(plate.clone()),
            ),
            blacklist_entry: None,
            vehicle: None,
        })
    }

    /// Operator-initiated open. Requires explicit confirmation.
    pub async fn manual_open(&self, request: ManualOpenRequest) -> Result<ManualOpenResponse> {
        if !request.confirm {
            return Err(EngineError::validation("manual open requires confirmation"));
        }

        let result = self.open_primary_barrier().await;
        let success = result.is_ok();
        let error = result.err();

        let passage = NewPassage::manual_open(&request.actor)
            .barrier_opened(success)
            .with_notes(request.notes.clone());
        let passage_id = self.passages.record(&passage).await?;

        info!(actor = %request.actor, success, passage_id, "Manual barrier open");

        let mut message = format!("Barrier opened manually by {}", request.actor);
        if let Some(notes) = &request.notes {
            message.push_str(&format!(": {notes}"));
        }
        if let Some(error) = &error {
            message.push_str(&format!(" (barrier error: {error})"));
        }
        self.notify(Notification::new(NotificationKind::ManualOpen, message));

        Ok(ManualOpenResponse {
            success,
            passage_id,
            error,
        })
    }

    /// Open the primary barrier. Never fails the caller; the error string is
    /// returned for reporting.
    async fn open_primary_barrier(&self) -> std::result::Result<(), String> {
        match self.gateway.primary(IntegrationKind::Barrier).await {
            Ok(Some(barrier)) => {
                let outcome = self.gateway.execute(&barrier, BarrierAction::Open).await;
                match outcome.error {
                    None if outcome.success => Ok(()),
                    error => Err(error.unwrap_or_else(|| "barrier did not open".to_string())),
                }
            }
            Ok(None) => {
                warn!("No primary barrier configured, barrier not opened");
                Err("no barrier integration configured".to_string())
            }
            Err(e) => {
                warn!(error = %e, "Primary barrier lookup failed");
                Err(e.to_string())
            }
        }
    }

    fn notify(&self, notification: Notification) {
        if let Err(e) = self.notifier.enqueue(notification) {
            warn!(error = %e, "Notification not queued");
        }
    }
}

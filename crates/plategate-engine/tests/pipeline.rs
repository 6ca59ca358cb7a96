//! End-to-end access pipeline scenarios: classifier, decision engine,
//! simulated hardware and the notification worker against an in-memory
//! database.
//!
//! Run with: cargo test --package plategate-engine --test pipeline

use chrono::{Duration, Local};
use futures::future::join_all;
use plategate_core::constants::*;
use plategate_core::{Decision, DeliveryStatus, NotificationKind, Plate, Severity};
use plategate_engine::{AccessService, AnalyzeResponse, MockClassifier, PhotoConfig, Recognition};
use plategate_hardware::mock::{MockBarrierHandle, MockFailure};
use plategate_hardware::{BarrierAction, DeviceStatus, IntegrationConfig, IntegrationKind, VendorKind};
use plategate_notify::{NotificationWorker, SimulatedChannel};
use plategate_storage::Database;
use plategate_storage::models::{NewBlacklistEntry, NewIntegration, NewVehicle};
use plategate_storage::repositories::{
    BlacklistRepository, IntegrationRepository, NotificationRepository, PassageRepository,
    SettingRepository, VehicleRepository,
};
use rstest::rstest;
use std::sync::Arc;
use tempfile::TempDir;

const IMAGE: &[u8] = &[0xFF, 0xD8, 0xFF, 0xD9];

struct Harness {
    db: Database,
    service: AccessService,
    worker: NotificationWorker,
    channel: SimulatedChannel,
    classifier: MockClassifier,
    _photos: TempDir,
}

impl Harness {
    async fn new() -> Self {
        let db = Database::in_memory().await.unwrap();
        let photos = tempfile::tempdir().unwrap();
        let channel = SimulatedChannel::new("sim");
        let classifier = MockClassifier::new();

        let (service, worker) = AccessService::builder(db.clone())
            .photos(PhotoConfig::new(photos.path(), "/photos"))
            .classifier(classifier.clone())
            .channel(channel.clone())
            .build()
            .unwrap();

        Self {
            db,
            service,
            worker,
            channel,
            classifier,
            _photos: photos,
        }
    }

    async fn with_gate() -> Self {
        let harness = Self::new().await;
        harness.add_integration("gate", IntegrationKind::Barrier, true).await;
        harness
    }

    async fn add_integration(&self, name: &str, kind: IntegrationKind, primary: bool) -> i64 {
        self.service
            .integrations()
            .create(
                &NewIntegration::new(IntegrationConfig::new(name, kind, VendorKind::Simulated))
                    .primary(primary),
            )
            .await
            .unwrap()
    }

    fn barrier(&self, name: &str) -> MockBarrierHandle {
        self.service.adapter().bench().barrier(name)
    }

    async fn allow(&self, plate: &str) {
        self.service
            .vehicles()
            .create(&NewVehicle::new(Plate::new(plate).unwrap()).with_owner("Resident", None))
            .await
            .unwrap();
    }

    async fn blacklist(&self, plate: &str, severity: Severity) {
        self.service
            .blacklist()
            .create(&NewBlacklistEntry::new(Plate::new(plate).unwrap(), "Stolen", severity))
            .await
            .unwrap();
    }

    async fn analyze(&self, plate: Option<&str>, confidence: i32, auto_open: bool) -> AnalyzeResponse {
        self.classifier.push(Recognition::new(plate, confidence));
        self.service.analyze(IMAGE, auto_open, SYSTEM_ACTOR).await.unwrap()
    }

    async fn delivered_kinds(&self) -> Vec<NotificationKind> {
        self.service.flush_notifications().await.unwrap();
        self.channel.delivered().iter().map(|n| n.kind).collect()
    }

    /// Quiet hours window around the current local time.
    async fn enable_quiet_hours_now(&self) {
        let now = Local::now();
        let settings = self.service.settings();
        settings.set(SETTING_QUIET_HOURS_ENABLED, "true").await.unwrap();
        settings
            .set(SETTING_QUIET_HOURS_START, &(now - Duration::hours(2)).format("%H:%M").to_string())
            .await
            .unwrap();
        settings
            .set(SETTING_QUIET_HOURS_END, &(now + Duration::hours(2)).format("%H:%M").to_string())
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_unknown_plate_is_denied_and_reported() {
    let h = Harness::with_gate().await;

    let response = h.analyze(Some("A123BC777"), 92, true).await;

    assert_eq!(response.decision, Decision::Unknown);
    assert!(!response.is_allowed);
    assert!(!response.barrier_opened);
    assert_eq!(response.plate.as_deref(), Some("A123BC777"));
    assert!(response.photo_url.as_deref().unwrap().starts_with("/photos/"));

    let passage = h.service.passages().find_by_id(response.passage_id).await.unwrap().unwrap();
    assert!(!passage.is_allowed);
    assert_eq!(passage.confidence, 92);
    assert_eq!(passage.photo_url, response.photo_url);

    assert_eq!(h.delivered_kinds().await, vec![NotificationKind::UnknownVehicle]);
    assert_eq!(h.barrier("gate").invocation_count(), 0);
    h.worker.shutdown().await;
}

#[tokio::test]
async fn test_blacklist_wins_over_allowlist() {
    let h = Harness::with_gate().await;
    h.allow("X999YY777").await;
    h.blacklist("X999YY777", Severity::High).await;

    let response = h.analyze(Some("x999 yy777"), 95, true).await;

    assert_eq!(response.decision, Decision::Blocked);
    assert!(response.is_blacklisted);
    assert!(!response.barrier_opened);
    assert_eq!(h.barrier("gate").invocation_count(), 0);

    let passage = h.service.passages().find_by_id(response.passage_id).await.unwrap().unwrap();
    assert_eq!(passage.notes.as_deref(), Some("BLACKLISTED: Stolen"));

    let entry = h.service.check_blacklist("X999YY777").await.unwrap().entry.unwrap();
    assert_eq!(entry.attempt_count, 1);
    assert!(entry.last_attempt_at.is_some());
    h.worker.shutdown().await;
}

#[tokio::test]
async fn test_critical_blacklist_bypasses_quiet_hours() {
    let h = Harness::with_gate().await;
    h.blacklist("X999YY777", Severity::Critical).await;
    h.enable_quiet_hours_now().await;

    let response = h.analyze(Some("X999YY777"), 97, true).await;

    assert_eq!(response.decision, Decision::Blocked);
    assert_eq!(h.delivered_kinds().await, vec![NotificationKind::BlacklistDetected]);
    assert_eq!(h.service.router().pending_count().await.unwrap(), 0);

    let events = h.service.router().events().find_recent(10).await.unwrap();
    assert_eq!(events[0].status, DeliveryStatus::Sent);
    assert_eq!(events[0].severity, Severity::Critical);

    let entry = h.service.check_blacklist("X999YY777").await.unwrap().entry.unwrap();
    assert_eq!(entry.attempt_count, 1);
    h.worker.shutdown().await;
}

#[tokio::test]
async fn test_unknown_vehicle_queued_during_quiet_hours_then_drained() {
    let h = Harness::with_gate().await;
    h.enable_quiet_hours_now().await;

    h.analyze(Some("A123BC777"), 80, false).await;
    h.analyze(Some("B222CC777"), 81, false).await;

    assert!(h.delivered_kinds().await.is_empty());
    assert_eq!(h.service.router().pending_count().await.unwrap(), 2);

    let report = h.service.drain_quiet_hours().await.unwrap();

    assert_eq!(report.sent, 2);
    assert_eq!(h.channel.delivered()[0].kind, NotificationKind::QuietHoursSummary);
    assert_eq!(h.service.router().pending_count().await.unwrap(), 0);
    h.worker.shutdown().await;
}

#[tokio::test]
async fn test_allowed_without_auto_open_leaves_barrier_alone() {
    let h = Harness::with_gate().await;
    h.allow("A123BC777").await;

    let response = h.analyze(Some("A123BC777"), 90, false).await;

    assert_eq!(response.decision, Decision::Allowed);
    assert!(!response.barrier_opened);
    assert_eq!(h.barrier("gate").invocation_count(), 0);
    assert!(h.delivered_kinds().await.is_empty());
    h.worker.shutdown().await;
}

#[tokio::test]
async fn test_allowed_with_auto_open_opens_barrier() {
    let h = Harness::with_gate().await;
    h.allow("A123BC777").await;

    let response = h.analyze(Some("A123BC777"), 90, true).await;

    assert!(response.is_allowed);
    assert!(response.barrier_opened);
    assert_eq!(h.barrier("gate").invocation_count(), 1);
    let passage = h.service.passages().find_by_id(response.passage_id).await.unwrap().unwrap();
    assert!(passage.barrier_opened);
    h.worker.shutdown().await;
}

#[tokio::test]
async fn test_offline_barrier_degrades_gracefully() {
    let h = Harness::with_gate().await;
    h.allow("A123BC777").await;
    h.barrier("gate").fail_with(MockFailure::Offline);

    let response = h.analyze(Some("A123BC777"), 90, true).await;

    assert!(response.is_allowed);
    assert!(!response.barrier_opened);
    let gate = &h.service.list_integrations(Some(IntegrationKind::Barrier)).await.unwrap()[0];
    assert_eq!(gate.last_status, DeviceStatus::Offline);
    h.worker.shutdown().await;
}

#[tokio::test]
async fn test_missing_barrier_still_records_passage() {
    let h = Harness::new().await;
    h.allow("A123BC777").await;

    let response = h.analyze(Some("A123BC777"), 90, true).await;

    assert!(response.is_allowed);
    assert!(!response.barrier_opened);
    assert!(h.service.passages().find_by_id(response.passage_id).await.unwrap().is_some());
    h.worker.shutdown().await;
}

#[tokio::test]
async fn test_ambiguous_primaries_do_not_open() {
    let h = Harness::new().await;
    h.allow("A123BC777").await;
    h.add_integration("gate", IntegrationKind::Barrier, true).await;
    h.add_integration("side", IntegrationKind::Barrier, false).await;
    // Bypass the write-time rule, as a hand edit would.
    sqlx::query("UPDATE integrations SET is_primary = 1")
        .execute(h.db.pool())
        .await
        .unwrap();

    let response = h.analyze(Some("A123BC777"), 90, true).await;

    assert!(!response.barrier_opened);
    assert_eq!(h.barrier("gate").invocation_count(), 0);
    assert_eq!(h.barrier("side").invocation_count(), 0);
    h.worker.shutdown().await;
}

#[tokio::test]
async fn test_missing_plate_is_unknown_without_notification() {
    let h = Harness::with_gate().await;

    let response = h.analyze(None, 0, true).await;

    assert_eq!(response.decision, Decision::Unknown);
    assert_eq!(response.plate, None);
    assert!(h.delivered_kinds().await.is_empty());
    let passage = h.service.passages().find_by_id(response.passage_id).await.unwrap().unwrap();
    assert_eq!(passage.plate, None);
    h.worker.shutdown().await;
}

#[rstest]
#[case::single_character("A")]
#[case::longer_than_registry_limit("ABCDEFGHIJKLMNOPQ")]
#[tokio::test]
async fn test_out_of_range_plate_is_reported_as_unknown(#[case] plate: &str) {
    let h = Harness::with_gate().await;

    let response = h.analyze(Some(&plate.to_lowercase()), 70, true).await;

    assert_eq!(response.decision, Decision::Unknown);
    assert_eq!(response.plate.as_deref(), Some(plate));
    assert!(!response.barrier_opened);
    assert_eq!(h.barrier("gate").invocation_count(), 0);
    let passage = h.service.passages().find_by_id(response.passage_id).await.unwrap().unwrap();
    assert_eq!(passage.plate.as_deref(), Some(plate));
    assert_eq!(h.delivered_kinds().await, vec![NotificationKind::UnknownVehicle]);
    assert_eq!(h.channel.delivered()[0].plate.as_ref().map(Plate::as_str), Some(plate));
    h.worker.shutdown().await;
}

#[tokio::test]
async fn test_settings_read_failure_after_match_still_records_passage() {
    let h = Harness::with_gate().await;
    h.allow("A123BC777").await;
    sqlx::query("DROP TABLE settings").execute(h.db.pool()).await.unwrap();

    h.classifier.push(Recognition::new(Some("A123BC777"), 90));
    let response = h.service.analyze(IMAGE, true, SYSTEM_ACTOR).await.unwrap();

    assert!(response.is_allowed);
    assert!(response.barrier_opened);
    assert_eq!(h.barrier("gate").invocation_count(), 1);
    let passage = h.service.passages().find_by_id(response.passage_id).await.unwrap().unwrap();
    assert!(passage.is_allowed);
    assert!(passage.barrier_opened);
    h.worker.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_detections_count_every_attempt() {
    let h = Arc::new(Harness::with_gate().await);
    h.blacklist("X999YY777", Severity::Medium).await;
    const N: usize = 20;
    for _ in 0..N {
        h.classifier.push(Recognition::new(Some("X999YY777"), 90));
    }

    let results = join_all((0..N).map(|_| h.service.analyze(IMAGE, true, SYSTEM_ACTOR))).await;

    assert!(results.iter().all(|r| r.as_ref().unwrap().is_blacklisted));
    let entry = h.service.check_blacklist("X999YY777").await.unwrap().entry.unwrap();
    assert_eq!(entry.attempt_count, N as i64);
    assert_eq!(
        h.service
            .passages()
            .find_by_plate(&Plate::new("X999YY777").unwrap(), 100)
            .await
            .unwrap()
            .len(),
        N
    );
}

#[tokio::test]
async fn test_manual_open_requires_confirmation() {
    let h = Harness::with_gate().await;

    let err = h.service.open_barrier(false, None, "guard").await.unwrap_err();
    assert!(err.is_validation());
    assert!(h.service.passages().find_recent(10).await.unwrap().is_empty());
    assert_eq!(h.barrier("gate").invocation_count(), 0);

    let response = h
        .service
        .open_barrier(true, Some("Courier".into()), "guard")
        .await
        .unwrap();
    assert!(response.success);

    let passage = h.service.passages().find_by_id(response.passage_id).await.unwrap().unwrap();
    assert!(passage.was_manual_open);
    assert!(passage.barrier_opened);
    assert_eq!(passage.actor, "guard");
    assert_eq!(h.delivered_kinds().await, vec![NotificationKind::ManualOpen]);
    h.worker.shutdown().await;
}

#[tokio::test]
async fn test_manual_open_with_failed_barrier_still_recorded() {
    let h = Harness::with_gate().await;
    h.barrier("gate").fail_with(MockFailure::Error);

    let response = h.service.open_barrier(true, None, "guard").await.unwrap();

    assert!(!response.success);
    assert!(response.error.is_some());
    let passage = h.service.passages().find_by_id(response.passage_id).await.unwrap().unwrap();
    assert!(passage.was_manual_open);
    assert!(!passage.barrier_opened);
    assert_eq!(h.delivered_kinds().await, vec![NotificationKind::ManualOpen]);
    h.worker.shutdown().await;
}

#[tokio::test]
async fn test_resend_failed_notification() {
    let h = Harness::with_gate().await;
    h.channel.fail_with("smtp down");
    h.analyze(Some("A123BC777"), 92, false).await;
    h.service.flush_notifications().await.unwrap();

    let event = h.service.router().events().find_recent(1).await.unwrap().remove(0);
    assert_eq!(event.status, DeliveryStatus::Failed);

    h.channel.recover();
    let response = h.service.resend_notification(event.id).await.unwrap();

    assert!(response.success);
    let event = h.service.router().events().find_by_id(event.id).await.unwrap().unwrap();
    assert_eq!(event.retry_count, 1);
    assert_eq!(event.status, DeliveryStatus::Sent);
    h.worker.shutdown().await;
}

#[tokio::test]
async fn test_allowed_passage_notice_is_opt_in() {
    let h = Harness::with_gate().await;
    h.allow("A123BC777").await;
    h.service
        .settings()
        .set(SETTING_NOTIFY_ALLOWED_PASSAGE, "true")
        .await
        .unwrap();

    h.analyze(Some("A123BC777"), 90, false).await;

    assert_eq!(h.delivered_kinds().await, vec![NotificationKind::AllowedPassage]);
    assert_eq!(h.channel.delivered()[0].severity(), Severity::Low);
    h.worker.shutdown().await;
}

#[tokio::test]
async fn test_capture_and_analyze_uses_primary_camera() {
    let h = Harness::with_gate().await;
    h.add_integration("cam", IntegrationKind::Camera, true).await;
    h.allow("A123BC777").await;
    h.classifier.push(Recognition::new(Some("A123BC777"), 88));

    let response = h.service.capture_and_analyze(true, SYSTEM_ACTOR).await.unwrap();

    assert!(response.barrier_opened);
    assert!(response.photo_url.is_some());
    assert_eq!(h.service.adapter().bench().camera("cam").snapshot_count(), 1);
    h.worker.shutdown().await;
}

#[tokio::test]
async fn test_capture_without_camera_fails() {
    let h = Harness::with_gate().await;

    let err = h.service.capture_and_analyze(true, SYSTEM_ACTOR).await.unwrap_err();

    assert!(err.to_string().contains("no camera"));
    assert_eq!(h.classifier.calls(), 0);
    h.worker.shutdown().await;
}

#[tokio::test]
async fn test_set_primary_integration() {
    let h = Harness::new().await;
    let gate = h.add_integration("gate", IntegrationKind::Barrier, true).await;
    let side = h.add_integration("side", IntegrationKind::Barrier, false).await;

    h.service.set_primary_integration(side).await.unwrap();

    let gate = h.service.integrations().find_by_id(gate).await.unwrap().unwrap();
    let side = h.service.integrations().find_by_id(side).await.unwrap().unwrap();
    assert!(!gate.is_primary);
    assert!(side.is_primary);

    let err = h.service.set_primary_integration(999).await.unwrap_err();
    assert!(err.is_not_found());
    h.worker.shutdown().await;
}

#[tokio::test]
async fn test_integration_probe_and_commands() {
    let h = Harness::new().await;
    let gate = h.add_integration("gate", IntegrationKind::Barrier, true).await;

    let probe = h.service.test_integration(gate).await.unwrap();
    assert!(probe.success);
    assert_eq!(probe.status, DeviceStatus::Online);

    let close = h
        .service
        .execute_integration(gate, BarrierAction::Close)
        .await
        .unwrap();
    assert!(close.success);
    assert_eq!(
        h.barrier("gate").actions(),
        vec![
            BarrierAction::Status,
            BarrierAction::Close
        ]
    );

    assert!(h.service.test_integration(999).await.unwrap_err().is_not_found());
    h.worker.shutdown().await;
}

#[tokio::test]
async fn test_daily_summary_is_routed() {
    let h = Harness::with_gate().await;
    h.allow("A123BC777").await;
    h.analyze(Some("A123BC777"), 90, true).await;
    h.analyze(Some("B222CC777"), 90, true).await;
    h.service.flush_notifications().await.unwrap();

    let outcome = h.service.send_daily_summary().await.unwrap();

    assert!(outcome.sent);
    let summary = h.channel.delivered().pop().unwrap();
    assert_eq!(summary.kind, NotificationKind::DailySummary);
    assert!(summary.message.contains("Allowed: 1"));
    assert!(summary.message.contains("Denied: 1"));
    h.worker.shutdown().await;
}

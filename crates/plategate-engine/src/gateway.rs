//! Hardware access with status tracking.
//!
//! Every call through the gateway stores the device's last status and error
//! on its integration record, so the integration list doubles as a health
//! view.

use chrono::Utc;
use plategate_hardware::{
    Adapter, BarrierAction, DeviceStatus, ExecutionOutcome, IntegrationKind, PrimarySelection,
    SnapshotOutcome, StreamOutcome, select_primary,
};
use plategate_storage::Database;
use plategate_storage::models::Integration;
use plategate_storage::repositories::{IntegrationRepository, SqliteIntegrationRepository};
use tracing::{error, warn};

use crate::error::Result;

pub struct HardwareGateway {
    adapter: Adapter,
    integrations: SqliteIntegrationRepository,
}

impl HardwareGateway {
    pub fn new(db: &Database, adapter: Adapter) -> Self {
        Self {
            adapter,
            integrations: SqliteIntegrationRepository::new(db.pool().clone()),
        }
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    pub fn integrations(&self) -> &SqliteIntegrationRepository {
        &self.integrations
    }

    /// The integration automatic flows use for `kind`.
    ///
    /// Several active primaries is a setup error: it is logged and treated
    /// as no integration.
    pub async fn primary(&self, kind: IntegrationKind) -> Result<Option<Integration>> {
        let candidates = self.integrations.list(Some(kind)).await?;
        match select_primary(&candidates) {
            PrimarySelection::Selected(integration) => Ok(Some(integration.clone())),
            PrimarySelection::None => Ok(None),
            PrimarySelection::Ambiguous(flagged) => {
                let ids: Vec<i64> = flagged.iter().map(|i| i.id).collect();
                error!(%kind, ?ids, "Several primary integrations configured, none used");
                Ok(None)
            }
        }
    }

    pub async fn execute(&self, integration: &Integration, action: BarrierAction) -> ExecutionOutcome {
        let outcome = match integration.to_config() {
            Ok(config) => self.adapter.execute(&config, action).await,
            Err(e) => ExecutionOutcome::failed(&e),
        };
        self.record_status(integration, outcome.status, outcome.error.as_deref())
            .await;
        outcome
    }

    pub async fn snapshot(&self, integration: &Integration) -> SnapshotOutcome {
        let outcome = match integration.to_config() {
            Ok(config) => self.adapter.snapshot(&config).await,
            Err(e) => SnapshotOutcome::failed(&e),
        };
        self.record_status(integration, outcome.status, outcome.error.as_deref())
            .await;
        outcome
    }

    pub async fn stream_info(&self, integration: &Integration) -> StreamOutcome {
        let outcome = match integration.to_config() {
            Ok(config) => self.adapter.stream_info(&config).await,
            Err(e) => StreamOutcome::failed(&e),
        };
        self.record_status(integration, outcome.status, outcome.error.as_deref())
            .await;
        outcome
    }

    /// Probe a device: cameras take a snapshot, barriers answer a status
    /// command.
    pub async fn test(&self, integration: &Integration) -> ExecutionOutcome {
        match integration.kind {
            IntegrationKind::Barrier => self.execute(integration, BarrierAction::Status).await,
            IntegrationKind::Camera => {
                let snapshot = self.snapshot(integration).await;
                ExecutionOutcome {
                    success: snapshot.success,
                    status: snapshot.status,
                    error: snapshot.error,
                }
            }
        }
    }

    async fn record_status(&self, integration: &Integration, status: DeviceStatus, error: Option<&str>) {
        if let Err(e) = self
            .integrations
            .update_status(integration.id, status, error, Utc::now())
            .await
        {
            warn!(integration_id = integration.id, error = %e, "Failed to store integration status");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plategate_hardware::mock::MockFailure;
    use plategate_hardware::{AdapterConfig, IntegrationConfig, VendorKind};
    use plategate_storage::models::NewIntegration;

    async fn gateway() -> (HardwareGateway, Database) {
        let db = Database::in_memory().await.unwrap();
        let gateway = HardwareGateway::new(&db, Adapter::new(AdapterConfig::default()).unwrap());
        (gateway, db)
    }

    async fn add(gateway: &HardwareGateway, name: &str, kind: IntegrationKind, primary: bool) -> Integration {
        let id = gateway
            .integrations
            .create(
                &NewIntegration::new(IntegrationConfig::new(name, kind, VendorKind::Simulated))
                    .primary(primary),
            )
            .await
            .unwrap();
        gateway.integrations.find_by_id(id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_primary_prefers_flagged() {
        let (gateway, _db) = gateway().await;
        add(&gateway, "side", IntegrationKind::Barrier, false).await;
        let main = add(&gateway, "main", IntegrationKind::Barrier, true).await;
        add(&gateway, "cam", IntegrationKind::Camera, true).await;

        let primary = gateway.primary(IntegrationKind::Barrier).await.unwrap().unwrap();
        assert_eq!(primary.id, main.id);
    }

    #[tokio::test]
    async fn test_no_integrations() {
        let (gateway, _db) = gateway().await;
        assert!(gateway.primary(IntegrationKind::Barrier).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_execute_records_status() {
        let (gateway, _db) = gateway().await;
        let gate = add(&gateway, "gate", IntegrationKind::Barrier, true).await;

        let outcome = gateway.execute(&gate, BarrierAction::Open).await;
        assert!(outcome.success);
        let stored = gateway.integrations.find_by_id(gate.id).await.unwrap().unwrap();
        assert_eq!(stored.last_status, DeviceStatus::Online);
        assert!(stored.last_checked_at.is_some());

        gateway.adapter.bench().barrier("gate").fail_with(MockFailure::Offline);
        let outcome = gateway.execute(&gate, BarrierAction::Open).await;
        assert!(!outcome.success);
        let stored = gateway.integrations.find_by_id(gate.id).await.unwrap().unwrap();
        assert_eq!(stored.last_status, DeviceStatus::Offline);
        assert!(stored.last_error.is_some());
    }

    #[tokio::test]
    async fn test_unknown_vendor_reports_error_status() {
        let (gateway, db) = gateway().await;
        let gate = add(&gateway, "gate", IntegrationKind::Barrier, true).await;
        sqlx::query("UPDATE integrations SET vendor = 'acme' WHERE id = ?")
            .bind(gate.id)
            .execute(db.pool())
            .await
            .unwrap();
        let gate = gateway.integrations.find_by_id(gate.id).await.unwrap().unwrap();

        let outcome = gateway.execute(&gate, BarrierAction::Open).await;

        assert!(!outcome.success);
        assert_eq!(outcome.status, DeviceStatus::Error);
        let stored = gateway.integrations.find_by_id(gate.id).await.unwrap().unwrap();
        assert_eq!(stored.last_status, DeviceStatus::Error);
    }

    #[tokio::test]
    async fn test_camera_probe_takes_snapshot() {
        let (gateway, _db) = gateway().await;
        let cam = add(&gateway, "cam", IntegrationKind::Camera, true).await;

        let outcome = gateway.test(&cam).await;

        assert!(outcome.success);
        assert_eq!(gateway.adapter.bench().camera("cam").snapshot_count(), 1);
    }
}

//! Timeout-bounded, never-failing facade over the vendor bindings.
//!
//! Every call builds the binding for the given integration, runs it under the
//! integration's timeout and folds any failure into the returned outcome.
//! Callers on the barrier path therefore never see an error.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use crate::devices::{AnyBarrier, AnyCamera, DeviceContext};
use crate::error::{HardwareError, Result};
use crate::mock::MockBench;
use crate::traits::{BarrierDevice, CameraDevice};
use crate::types::{
    BarrierAction, ExecutionOutcome, IntegrationConfig, IntegrationKind, SnapshotOutcome,
    StreamOutcome,
};

/// Adapter configuration.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Root of the sysfs GPIO tree.
    pub gpio_root: PathBuf,

    /// User agent sent to HTTP devices.
    pub user_agent: String,

    /// TCP connect timeout for HTTP devices.
    pub connect_timeout: Duration,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            gpio_root: PathBuf::from("/sys/class/gpio"),
            user_agent: format!("plategate/{}", plategate_core::VERSION),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl AdapterConfig {
    pub fn with_gpio_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.gpio_root = root.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Hardware adapter shared by the decision engine and the service layer.
#[derive(Debug, Clone)]
pub struct Adapter {
    ctx: DeviceContext,
}

impl Adapter {
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: AdapterConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| HardwareError::configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            ctx: DeviceContext {
                client,
                gpio_root: config.gpio_root,
                bench: MockBench::new(),
            },
        })
    }

    /// Simulated devices backing `simulated` integrations.
    pub fn bench(&self) -> &MockBench {
        &self.ctx.bench
    }

    /// Send a barrier command.
    pub async fn execute(
        &self,
        integration: &IntegrationConfig,
        action: BarrierAction,
    ) -> ExecutionOutcome {
        let result = self
            .bounded(integration, async {
                require_kind(integration, IntegrationKind::Barrier)?;
                let barrier = AnyBarrier::from_config(integration, &self.ctx)?;
                barrier.execute(action).await
            })
            .await;

        match result {
            Ok(status) => {
                debug!(integration = %integration.name, %action, %status, "Barrier command done");
                ExecutionOutcome::ok(status)
            }
            Err(e) => {
                warn!(integration = %integration.name, %action, error = %e, "Barrier command failed");
                ExecutionOutcome::failed(&e)
            }
        }
    }

    /// Capture a still image.
    pub async fn snapshot(&self, integration: &IntegrationConfig) -> SnapshotOutcome {
        let result = self
            .bounded(integration, async {
                require_kind(integration, IntegrationKind::Camera)?;
                AnyCamera::from_config(integration, &self.ctx)?.snapshot().await
            })
            .await;

        match result {
            Ok(image) => {
                debug!(integration = %integration.name, bytes = image.len(), "Snapshot captured");
                SnapshotOutcome::ok(image)
            }
            Err(e) => {
                warn!(integration = %integration.name, error = %e, "Snapshot failed");
                SnapshotOutcome::failed(&e)
            }
        }
    }

    /// Resolve the live stream location.
    pub async fn stream_info(&self, integration: &IntegrationConfig) -> StreamOutcome {
        let result = self
            .bounded(integration, async {
                require_kind(integration, IntegrationKind::Camera)?;
                AnyCamera::from_config(integration, &self.ctx)?.stream_info().await
            })
            .await;

        match result {
            Ok(stream) => StreamOutcome::ok(stream),
            Err(e) => {
                warn!(integration = %integration.name, error = %e, "Stream lookup failed");
                StreamOutcome::failed(&e)
            }
        }
    }

    async fn bounded<T>(
        &self,
        integration: &IntegrationConfig,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let timeout = integration.timeout();
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(HardwareError::timeout(timeout.as_millis() as u64)),
        }
    }
}

fn require_kind(integration: &IntegrationConfig, expected: IntegrationKind) -> Result<()> {
    if integration.kind != expected {
        return Err(HardwareError::unsupported(format!(
            "integration '{}' is a {}, not a {expected}",
            integration.name, integration.kind
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFailure;
    use crate::types::{DeviceStatus, VendorKind};

    fn adapter() -> Adapter {
        Adapter::new(AdapterConfig::default()).unwrap()
    }

    fn simulated_barrier(name: &str) -> IntegrationConfig {
        IntegrationConfig::new(name, IntegrationKind::Barrier, VendorKind::Simulated)
    }

    #[tokio::test]
    async fn test_execute_success() {
        let adapter = adapter();
        let outcome = adapter.execute(&simulated_barrier("gate"), BarrierAction::Open).await;

        assert!(outcome.success);
        assert_eq!(outcome.status, DeviceStatus::Online);
        assert_eq!(adapter.bench().barrier("gate").actions(), vec![BarrierAction::Open]);
    }

    #[tokio::test]
    async fn test_failure_becomes_outcome() {
        let adapter = adapter();
        adapter.bench().barrier("gate").fail_with(MockFailure::Error);

        let outcome = adapter.execute(&simulated_barrier("gate"), BarrierAction::Open).await;

        assert!(!outcome.success);
        assert_eq!(outcome.status, DeviceStatus::Error);
        assert!(outcome.error.unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_slow_device_times_out_offline() {
        let adapter = adapter();
        adapter.bench().barrier("gate").set_latency(Duration::from_secs(5));

        let config = simulated_barrier("gate").with_timeout_ms(50);
        let outcome = adapter.execute(&config, BarrierAction::Open).await;

        assert!(!outcome.success);
        assert_eq!(outcome.status, DeviceStatus::Offline);
        assert_eq!(outcome.error.as_deref(), Some("Operation timeout after 50ms"));
    }

    #[tokio::test]
    async fn test_barrier_command_on_camera_is_rejected() {
        let adapter = adapter();
        let camera = IntegrationConfig::new("cam", IntegrationKind::Camera, VendorKind::Simulated);

        let outcome = adapter.execute(&camera, BarrierAction::Open).await;

        assert!(!outcome.success);
        assert_eq!(adapter.bench().barrier("cam").invocation_count(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_http_device_is_offline() {
        let adapter = Adapter::new(
            AdapterConfig::default().with_connect_timeout(Duration::from_millis(500)),
        )
        .unwrap();
        // Port 9 (discard) on localhost is closed in test environments.
        let config = IntegrationConfig::new("gate", IntegrationKind::Barrier, VendorKind::Hikvision)
            .with_host("127.0.0.1")
            .with_port(9)
            .with_timeout_ms(2_000);

        let outcome = adapter.execute(&config, BarrierAction::Status).await;

        assert!(!outcome.success);
        assert_eq!(outcome.status, DeviceStatus::Offline);
    }

    #[tokio::test]
    async fn test_snapshot_and_stream() {
        let adapter = adapter();
        let camera = IntegrationConfig::new("cam", IntegrationKind::Camera, VendorKind::Simulated);
        adapter.bench().camera("cam").set_frame(vec![0xFF, 0xD8]);

        let snapshot = adapter.snapshot(&camera).await;
        assert!(snapshot.success);
        assert_eq!(snapshot.image.unwrap().as_ref(), &[0xFF, 0xD8]);

        let stream = adapter.stream_info(&camera).await;
        assert_eq!(stream.stream.unwrap().url, "sim://cam/live");
    }
}

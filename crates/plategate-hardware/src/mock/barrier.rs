//! Simulated barrier for development and testing.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::error::{HardwareError, Result};
use crate::traits::BarrierDevice;
use crate::types::{BarrierAction, DeviceStatus};

/// Failure mode injected into a simulated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Behave as if the device did not answer.
    Offline,
    /// Answer with an HTTP 500.
    Error,
}

impl MockFailure {
    pub(crate) fn into_error(self, device: &str) -> HardwareError {
        match self {
            Self::Offline => HardwareError::disconnected(device),
            Self::Error => HardwareError::Status {
                code: 500,
                body: "simulated failure".to_string(),
            },
        }
    }
}

#[derive(Debug, Default)]
struct BarrierState {
    failure: Option<MockFailure>,
    latency: Duration,
    actions: Vec<BarrierAction>,
}

/// In-process barrier that records every command it receives.
///
/// A barrier and its handles share state, so a test can hold a
/// [`MockBarrierHandle`] while the adapter builds a fresh device per call.
///
/// # Examples
///
/// ```
/// use plategate_hardware::mock::MockBarrier;
/// use plategate_hardware::traits::BarrierDevice;
/// use plategate_hardware::types::BarrierAction;
///
/// #[tokio::main]
/// async fn main() -> plategate_hardware::Result<()> {
///     let (barrier, handle) = MockBarrier::new("gate");
///
///     barrier.execute(BarrierAction::Open).await?;
///
///     assert_eq!(handle.actions(), vec![BarrierAction::Open]);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockBarrier {
    name: String,
    state: Arc<Mutex<BarrierState>>,
}

impl MockBarrier {
    pub fn new(name: impl Into<String>) -> (Self, MockBarrierHandle) {
        let handle = MockBarrierHandle {
            name: name.into(),
            state: Arc::default(),
        };
        (handle.device(), handle)
    }
}

impl BarrierDevice for MockBarrier {
    async fn execute(&self, action: BarrierAction) -> Result<DeviceStatus> {
        let (latency, failure) = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.actions.push(action);
            (state.latency, state.failure)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        match failure {
            Some(failure) => Err(failure.into_error(&self.name)),
            None => Ok(DeviceStatus::Online),
        }
    }
}

/// Handle for controlling and inspecting a mock barrier.
#[derive(Debug, Clone)]
pub struct MockBarrierHandle {
    name: String,
    state: Arc<Mutex<BarrierState>>,
}

impl MockBarrierHandle {
    /// A new device attached to this handle's state.
    pub fn device(&self) -> MockBarrier {
        MockBarrier {
            name: self.name.clone(),
            state: Arc::clone(&self.state),
        }
    }

    /// Make every subsequent command fail.
    pub fn fail_with(&self, failure: MockFailure) {
        self.lock().failure = Some(failure);
    }

    pub fn recover(&self) {
        self.lock().failure = None;
    }

    /// Delay every subsequent command.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Commands received so far, in order.
    pub fn actions(&self) -> Vec<BarrierAction> {
        self.lock().actions.clone()
    }

    pub fn invocation_count(&self) -> usize {
        self.lock().actions.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BarrierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

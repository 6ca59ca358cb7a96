//! Simulated devices for development and testing.
//!
//! Devices are addressed by integration name through a [`MockBench`]. The
//! adapter resolves `simulated` integrations against its bench, so tests and
//! development setups can inject failures and observe commands.

pub mod barrier;
pub mod camera;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

pub use barrier::{MockBarrier, MockBarrierHandle, MockFailure};
pub use camera::{MockCamera, MockCameraHandle};

/// Registry of simulated devices keyed by integration name.
#[derive(Debug, Clone, Default)]
pub struct MockBench {
    barriers: Arc<Mutex<HashMap<String, MockBarrierHandle>>>,
    cameras: Arc<Mutex<HashMap<String, MockCameraHandle>>>,
}

impl MockBench {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for the named barrier, created on first use.
    pub fn barrier(&self, name: &str) -> MockBarrierHandle {
        let mut barriers = self.barriers.lock().unwrap_or_else(PoisonError::into_inner);
        barriers
            .entry(name.to_string())
            .or_insert_with(|| MockBarrier::new(name).1)
            .clone()
    }

    /// Handle for the named camera, created on first use.
    pub fn camera(&self, name: &str) -> MockCameraHandle {
        let mut cameras = self.cameras.lock().unwrap_or_else(PoisonError::into_inner);
        cameras
            .entry(name.to_string())
            .or_insert_with(|| MockCamera::new(name).1)
            .clone()
    }
}

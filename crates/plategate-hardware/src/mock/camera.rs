//! Simulated camera for development and testing.

use bytes::Bytes;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::barrier::MockFailure;
use crate::error::Result;
use crate::traits::CameraDevice;
use crate::types::StreamInfo;

/// Minimal JPEG (SOI + EOI markers) returned when no frame is configured.
const PLACEHOLDER_FRAME: &[u8] = &[0xFF, 0xD8, 0xFF, 0xD9];

#[derive(Debug)]
struct CameraState {
    frame: Bytes,
    failure: Option<MockFailure>,
    latency: Duration,
    snapshots: usize,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            frame: Bytes::from_static(PLACEHOLDER_FRAME),
            failure: None,
            latency: Duration::ZERO,
            snapshots: 0,
        }
    }
}

/// In-process camera serving a configurable frame.
#[derive(Debug, Clone)]
pub struct MockCamera {
    name: String,
    state: Arc<Mutex<CameraState>>,
}

impl MockCamera {
    pub fn new(name: impl Into<String>) -> (Self, MockCameraHandle) {
        let handle = MockCameraHandle {
            name: name.into(),
            state: Arc::default(),
        };
        (handle.device(), handle)
    }
}

impl CameraDevice for MockCamera {
    async fn snapshot(&self) -> Result<Bytes> {
        let (latency, failure, frame) = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.snapshots += 1;
            (state.latency, state.failure, state.frame.clone())
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        match failure {
            Some(failure) => Err(failure.into_error(&self.name)),
            None => Ok(frame),
        }
    }

    async fn stream_info(&self) -> Result<StreamInfo> {
        let failure = self.state.lock().unwrap_or_else(PoisonError::into_inner).failure;
        match failure {
            Some(failure) => Err(failure.into_error(&self.name)),
            None => Ok(StreamInfo::new(format!("sim://{}/live", self.name))),
        }
    }
}

/// Handle for controlling and inspecting a mock camera.
#[derive(Debug, Clone)]
pub struct MockCameraHandle {
    name: String,
    state: Arc<Mutex<CameraState>>,
}

impl MockCameraHandle {
    pub fn device(&self) -> MockCamera {
        MockCamera {
            name: self.name.clone(),
            state: Arc::clone(&self.state),
        }
    }

    /// Frame returned by subsequent snapshots.
    pub fn set_frame(&self, frame: impl Into<Bytes>) {
        self.lock().frame = frame.into();
    }

    pub fn fail_with(&self, failure: MockFailure) {
        self.lock().failure = Some(failure);
    }

    pub fn recover(&self) {
        self.lock().failure = None;
    }

    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    pub fn snapshot_count(&self) -> usize {
        self.lock().snapshots
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CameraState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

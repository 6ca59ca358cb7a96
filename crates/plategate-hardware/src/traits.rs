//! Hardware device trait definitions.
//!
//! These traits are the capability interface between the access pipeline and
//! physical devices. Vendor bindings and the simulated devices implement them;
//! [`crate::devices`] dispatches across implementations.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT).

#![allow(async_fn_in_trait)]

use bytes::Bytes;

use crate::error::Result;
use crate::types::{BarrierAction, DeviceStatus, StreamInfo};

/// A controller that can raise, lower and report on a vehicle barrier.
pub trait BarrierDevice: Send + Sync {
    /// Perform `action` and return the device status it leaves behind.
    ///
    /// # Errors
    ///
    /// Returns an error when the device is unreachable, rejects the command
    /// or the integration is misconfigured.
    async fn execute(&self, action: BarrierAction) -> Result<DeviceStatus>;
}

/// A camera that can hand out still images and a live stream location.
pub trait CameraDevice: Send + Sync {
    /// Capture a single JPEG frame.
    ///
    /// # Errors
    ///
    /// Returns an error when the camera is unreachable or returns no image.
    async fn snapshot(&self) -> Result<Bytes>;

    /// Location of the live stream. Usually computed without network I/O.
    ///
    /// # Errors
    ///
    /// Returns an error when the integration lacks the data to build a URL.
    async fn stream_info(&self) -> Result<StreamInfo>;
}

//! Enum wrappers for vendor dispatch.
//!
//! Native `async fn` in traits is not object-safe, so vendor bindings are
//! wrapped in enums instead of `Box<dyn BarrierDevice>`. The vendor tag of an
//! integration selects the variant in exactly one place:
//! [`AnyBarrier::from_config`] and [`AnyCamera::from_config`].
//!
//! # Examples
//!
//! ```
//! use plategate_hardware::devices::{AnyBarrier, DeviceContext};
//! use plategate_hardware::traits::BarrierDevice;
//! use plategate_hardware::types::{BarrierAction, IntegrationConfig, IntegrationKind, VendorKind};
//!
//! #[tokio::main]
//! async fn main() -> plategate_hardware::Result<()> {
//!     let ctx = DeviceContext::default();
//!     let config = IntegrationConfig::new("gate", IntegrationKind::Barrier, VendorKind::Simulated);
//!
//!     let barrier = AnyBarrier::from_config(&config, &ctx)?;
//!     barrier.execute(BarrierAction::Open).await?;
//!
//!     assert_eq!(ctx.bench.barrier("gate").invocation_count(), 1);
//!     Ok(())
//! }
//! ```

use bytes::Bytes;
use std::path::PathBuf;

use crate::error::{HardwareError, Result};
use crate::mock::{MockBarrier, MockBench, MockCamera};
use crate::traits::{BarrierDevice, CameraDevice};
use crate::types::{BarrierAction, DeviceStatus, IntegrationConfig, StreamInfo, VendorKind};
use crate::vendors::{
    DahuaBarrier, DahuaCamera, GpioBarrier, HikvisionBarrier, HikvisionCamera, HttpBarrier,
    HttpCamera,
};

/// Shared resources vendor bindings are built from.
#[derive(Debug, Clone)]
pub struct DeviceContext {
    pub client: reqwest::Client,
    pub gpio_root: PathBuf,
    pub bench: MockBench,
}

impl Default for DeviceContext {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
            gpio_root: PathBuf::from("/sys/class/gpio"),
            bench: MockBench::new(),
        }
    }
}

/// Any supported barrier controller.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyBarrier {
    Http(HttpBarrier),
    Hikvision(HikvisionBarrier),
    Dahua(DahuaBarrier),
    Gpio(GpioBarrier),
    Mock(MockBarrier),
}

impl AnyBarrier {
    /// Build the binding selected by the integration's vendor tag.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the integration lacks what the
    /// vendor needs (host, GPIO pin).
    pub fn from_config(config: &IntegrationConfig, ctx: &DeviceContext) -> Result<Self> {
        Ok(match config.vendor {
            VendorKind::Http => Self::Http(HttpBarrier::new(&ctx.client, config)?),
            VendorKind::Hikvision => Self::Hikvision(HikvisionBarrier::new(&ctx.client, config)?),
            VendorKind::Dahua => Self::Dahua(DahuaBarrier::new(&ctx.client, config)?),
            VendorKind::Gpio => Self::Gpio(GpioBarrier::new(config, &ctx.gpio_root)?),
            VendorKind::Simulated => Self::Mock(ctx.bench.barrier(&config.name).device()),
        })
    }
}

impl BarrierDevice for AnyBarrier {
    async fn execute(&self, action: BarrierAction) -> Result<DeviceStatus> {
        match self {
            Self::Http(device) => device.execute(action).await,
            Self::Hikvision(device) => device.execute(action).await,
            Self::Dahua(device) => device.execute(action).await,
            Self::Gpio(device) => device.execute(action).await,
            Self::Mock(device) => device.execute(action).await,
        }
    }
}

/// Any supported camera.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyCamera {
    Http(HttpCamera),
    Hikvision(HikvisionCamera),
    Dahua(DahuaCamera),
    Mock(MockCamera),
}

impl AnyCamera {
    /// Build the binding selected by the integration's vendor tag.
    ///
    /// # Errors
    ///
    /// Returns an unsupported error for vendors without a camera binding.
    pub fn from_config(config: &IntegrationConfig, ctx: &DeviceContext) -> Result<Self> {
        Ok(match config.vendor {
            VendorKind::Http => Self::Http(HttpCamera::new(&ctx.client, config)?),
            VendorKind::Hikvision => Self::Hikvision(HikvisionCamera::new(&ctx.client, config)?),
            VendorKind::Dahua => Self::Dahua(DahuaCamera::new(&ctx.client, config)?),
            VendorKind::Simulated => Self::Mock(ctx.bench.camera(&config.name).device()),
            VendorKind::Gpio => {
                return Err(HardwareError::unsupported("camera on a gpio integration"));
            }
        })
    }
}

impl CameraDevice for AnyCamera {
    async fn snapshot(&self) -> Result<Bytes> {
        match self {
            Self::Http(device) => device.snapshot().await,
            Self::Hikvision(device) => device.snapshot().await,
            Self::Dahua(device) => device.snapshot().await,
            Self::Mock(device) => device.snapshot().await,
        }
    }

    async fn stream_info(&self) -> Result<StreamInfo> {
        match self {
            Self::Http(device) => device.stream_info().await,
            Self::Hikvision(device) => device.stream_info().await,
            Self::Dahua(device) => device.stream_info().await,
            Self::Mock(device) => device.stream_info().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IntegrationKind;

    #[test]
    fn test_vendor_selects_variant() {
        let ctx = DeviceContext::default();
        let base = IntegrationConfig::new("gate", IntegrationKind::Barrier, VendorKind::Hikvision)
            .with_host("10.0.0.2");

        assert!(matches!(
            AnyBarrier::from_config(&base, &ctx).unwrap(),
            AnyBarrier::Hikvision(_)
        ));

        let dahua = IntegrationConfig {
            vendor: VendorKind::Dahua,
            ..base.clone()
        };
        assert!(matches!(
            AnyBarrier::from_config(&dahua, &ctx).unwrap(),
            AnyBarrier::Dahua(_)
        ));
    }

    #[test]
    fn test_gpio_camera_is_unsupported() {
        let config = IntegrationConfig::new("relay", IntegrationKind::Camera, VendorKind::Gpio);
        let err = AnyCamera::from_config(&config, &DeviceContext::default()).unwrap_err();
        assert!(matches!(err, HardwareError::Unsupported { .. }));
    }
}

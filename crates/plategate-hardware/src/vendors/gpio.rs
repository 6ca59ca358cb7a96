//! Relay driven through the Linux sysfs GPIO interface.
//!
//! The line must already be exported and configured as an output; this
//! binding only writes `<root>/gpio<pin>/value`. Open and close both pulse
//! the relay, which suits the common single-input gate controllers that
//! toggle on each pulse.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{HardwareError, Result};
use crate::traits::BarrierDevice;
use crate::types::{BarrierAction, DeviceStatus, GpioPulse, IntegrationConfig};

#[derive(Debug, Clone)]
pub struct GpioBarrier {
    name: String,
    pulse: GpioPulse,
    value_path: PathBuf,
}

impl GpioBarrier {
    /// # Errors
    ///
    /// Returns a configuration error when the integration has no GPIO pin.
    pub fn new(config: &IntegrationConfig, sysfs_root: &Path) -> Result<Self> {
        let pulse = config.gpio.ok_or_else(|| {
            HardwareError::configuration(format!("integration '{}' has no GPIO pin", config.name))
        })?;

        Ok(Self {
            name: config.name.clone(),
            pulse,
            value_path: sysfs_root.join(format!("gpio{}", pulse.pin)).join("value"),
        })
    }

    fn level(&self, active: bool) -> &'static str {
        if active != self.pulse.active_low { "1" } else { "0" }
    }

    async fn write_level(&self, active: bool) -> Result<()> {
        tokio::fs::write(&self.value_path, self.level(active)).await?;
        Ok(())
    }
}

impl BarrierDevice for GpioBarrier {
    async fn execute(&self, action: BarrierAction) -> Result<DeviceStatus> {
        match action {
            BarrierAction::Open | BarrierAction::Close => {
                debug!(device = %self.name, pin = self.pulse.pin, %action, "Pulsing relay");
                self.write_level(true).await?;
                tokio::time::sleep(self.pulse.pulse()).await;
                self.write_level(false).await?;
            }
            BarrierAction::Status => {
                let value = tokio::fs::read_to_string(&self.value_path).await?;
                if !matches!(value.trim(), "0" | "1") {
                    return Err(HardwareError::invalid_data(format!(
                        "unexpected GPIO value '{}'",
                        value.trim()
                    )));
                }
            }
        }
        Ok(DeviceStatus::Online)
    }
}

//! Dahua CGI bindings.
//!
//! Dahua controllers answer `OK` on success and may return HTTP 200 with an
//! `Error` body when a command is refused.

use bytes::Bytes;
use reqwest::{Client, Method};

use super::http::{Auth, HttpEndpoint, bare_host, parse_template, rtsp_userinfo};
use crate::error::{HardwareError, Result};
use crate::traits::{BarrierDevice, CameraDevice};
use crate::types::{BarrierAction, DeviceStatus, IntegrationConfig, StreamInfo};

const OPEN_PATH: &str = "/cgi-bin/accessControl.cgi?action=openDoor&channel=1&UserID=101&Type=Remote";
const CLOSE_PATH: &str = "/cgi-bin/accessControl.cgi?action=closeDoor&channel=1";
const STATUS_PATH: &str = "/cgi-bin/magicBox.cgi?action=getSystemInfo";
const SNAPSHOT_PATH: &str = "/cgi-bin/snapshot.cgi?channel=1";
const STREAM_PATH: &str = "/cam/realmonitor?channel=1&subtype=0";
const RTSP_PORT: u16 = 554;

#[derive(Debug, Clone)]
pub struct DahuaBarrier {
    endpoint: HttpEndpoint,
    config: IntegrationConfig,
}

impl DahuaBarrier {
    pub fn new(client: &Client, config: &IntegrationConfig) -> Result<Self> {
        Ok(Self {
            endpoint: HttpEndpoint::new(client, config, Auth::basic(config))?,
            config: config.clone(),
        })
    }
}

impl BarrierDevice for DahuaBarrier {
    async fn execute(&self, action: BarrierAction) -> Result<DeviceStatus> {
        let default_path = match action {
            BarrierAction::Open => OPEN_PATH,
            BarrierAction::Close => CLOSE_PATH,
            BarrierAction::Status => STATUS_PATH,
        };
        let template = self.config.commands.for_action(action).unwrap_or(default_path);
        let (method, path) = parse_template(template, Method::GET);

        let body = self.endpoint.send_text(method, &path, None).await?;
        if body.trim_start().starts_with("Error") {
            return Err(HardwareError::invalid_data(format!(
                "{action} refused: {}",
                body.trim()
            )));
        }
        Ok(DeviceStatus::Online)
    }
}

#[derive(Debug, Clone)]
pub struct DahuaCamera {
    endpoint: HttpEndpoint,
    config: IntegrationConfig,
}

impl DahuaCamera {
    pub fn new(client: &Client, config: &IntegrationConfig) -> Result<Self> {
        Ok(Self {
            endpoint: HttpEndpoint::new(client, config, Auth::basic(config))?,
            config: config.clone(),
        })
    }
}

impl CameraDevice for DahuaCamera {
    async fn snapshot(&self) -> Result<Bytes> {
        let path = self.config.commands.snapshot_path.as_deref().unwrap_or(SNAPSHOT_PATH);
        self.endpoint.get_image(path).await
    }

    async fn stream_info(&self) -> Result<StreamInfo> {
        if let Some(url) = self.config.commands.stream_path.as_deref().filter(|p| p.contains("://")) {
            return Ok(StreamInfo::new(url));
        }
        let path = self.config.commands.stream_path.as_deref().unwrap_or(STREAM_PATH);
        let host = bare_host(self.endpoint.base_url());
        Ok(StreamInfo::new(format!(
            "rtsp://{}{host}:{RTSP_PORT}{path}",
            rtsp_userinfo(&self.config)
        )))
    }
}

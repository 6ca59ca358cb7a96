//! HTTP transport shared by the networked vendor bindings, plus the generic
//! template-driven controller.

use bytes::Bytes;
use reqwest::{Client, Method, RequestBuilder};
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{HardwareError, Result};
use crate::traits::{BarrierDevice, CameraDevice};
use crate::types::{BarrierAction, DeviceStatus, IntegrationConfig, StreamInfo};

/// Longest response body kept in a [`HardwareError::Status`].
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Auth {
    None,
    Basic { username: String, password: Option<String> },
    Bearer(String),
}

impl Auth {
    /// Bearer token first, then basic credentials.
    pub(crate) fn token_or_basic(config: &IntegrationConfig) -> Self {
        if let Some(token) = config.api_token.as_deref().filter(|t| !t.is_empty()) {
            return Self::Bearer(token.to_string());
        }
        Self::basic(config)
    }

    pub(crate) fn basic(config: &IntegrationConfig) -> Self {
        match config.username.as_deref().filter(|u| !u.is_empty()) {
            Some(username) => Self::Basic {
                username: username.to_string(),
                password: config.password.clone(),
            },
            None => Self::None,
        }
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::None => request,
            Self::Basic { username, password } => request.basic_auth(username, password.as_ref()),
            Self::Bearer(token) => request.bearer_auth(token),
        }
    }
}

/// Split an optional leading HTTP method off a command template.
///
/// `"PUT /relay/1"` yields `(PUT, "/relay/1")`; `"/relay/1"` yields the
/// default method.
pub(crate) fn parse_template(template: &str, default: Method) -> (Method, String) {
    let template = template.trim();
    if let Some((head, rest)) = template.split_once(char::is_whitespace) {
        let method = match head {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "PATCH" => Some(Method::PATCH),
            "DELETE" => Some(Method::DELETE),
            _ => None,
        };
        if let Some(method) = method {
            return (method, rest.trim().to_string());
        }
    }
    (default, template.to_string())
}

/// Host portion of an integration host, without scheme, port or path.
pub(crate) fn bare_host(host: &str) -> &str {
    let host = host.split_once("://").map_or(host, |(_, rest)| rest);
    let host = host.split('/').next().unwrap_or(host);
    host.rsplit_once(':').map_or(host, |(name, _)| name)
}

/// Credentials prefix for an RTSP URL, e.g. `admin:secret@`.
pub(crate) fn rtsp_userinfo(config: &IntegrationConfig) -> String {
    match (config.username.as_deref(), config.password.as_deref()) {
        (Some(user), Some(pass)) if !user.is_empty() => format!("{user}:{pass}@"),
        (Some(user), _) if !user.is_empty() => format!("{user}@"),
        _ => String::new(),
    }
}

/// One device reachable over HTTP.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: Client,
    name: String,
    base_url: String,
    auth: Auth,
    timeout: Duration,
}

impl HttpEndpoint {
    /// Build the endpoint for an integration.
    ///
    /// A host given with a scheme is used as the base URL verbatim; a bare
    /// host gets `http://` and the configured port.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the host is missing.
    pub(crate) fn new(client: &Client, config: &IntegrationConfig, auth: Auth) -> Result<Self> {
        let host = config
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                HardwareError::configuration(format!("integration '{}' has no host", config.name))
            })?;

        let base_url = if host.contains("://") {
            host.trim_end_matches('/').to_string()
        } else {
            match config.port {
                Some(port) => format!("http://{host}:{port}"),
                None => format!("http://{host}"),
            }
        };

        Ok(Self {
            client: client.clone(),
            name: config.name.clone(),
            base_url,
            auth,
            timeout: config.timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path or an already absolute URL.
    pub fn url(&self, path: &str) -> String {
        if path.contains("://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Send a request and fail on any non-success status.
    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<(&'static str, String)>,
    ) -> Result<reqwest::Response> {
        let url = self.url(path);
        trace!(device = %self.name, %method, %url, "Sending device request");

        let mut request = self
            .auth
            .apply(self.client.request(method, &url))
            .timeout(self.timeout);
        if let Some((content_type, body)) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(body);
        }

        let timeout_ms = self.timeout.as_millis() as u64;
        let response = request
            .send()
            .await
            .map_err(|e| HardwareError::from_reqwest(&self.name, timeout_ms, e))?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(MAX_ERROR_BODY);
            debug!(device = %self.name, code = status.as_u16(), "Device rejected request");
            return Err(HardwareError::Status {
                code: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    pub(crate) async fn send_text(
        &self,
        method: Method,
        path: &str,
        body: Option<(&'static str, String)>,
    ) -> Result<String> {
        let timeout_ms = self.timeout.as_millis() as u64;
        self.send(method, path, body)
            .await?
            .text()
            .await
            .map_err(|e| HardwareError::from_reqwest(&self.name, timeout_ms, e))
    }

    /// Fetch an image body, rejecting empty responses.
    pub(crate) async fn get_image(&self, path: &str) -> Result<Bytes> {
        let timeout_ms = self.timeout.as_millis() as u64;
        let image = self
            .send(Method::GET, path, None)
            .await?
            .bytes()
            .await
            .map_err(|e| HardwareError::from_reqwest(&self.name, timeout_ms, e))?;

        if image.is_empty() {
            return Err(HardwareError::invalid_data(format!(
                "camera '{}' returned an empty image",
                self.name
            )));
        }
        Ok(image)
    }
}

/// Generic controller driven entirely by the integration's command templates.
///
/// Open and close default to `POST`, status to `GET`. Authentication is a
/// bearer token when one is set, otherwise basic auth when a username is set.
#[derive(Debug, Clone)]
pub struct HttpBarrier {
    endpoint: HttpEndpoint,
    config: IntegrationConfig,
}

impl HttpBarrier {
    pub fn new(client: &Client, config: &IntegrationConfig) -> Result<Self> {
        Ok(Self {
            endpoint: HttpEndpoint::new(client, config, Auth::token_or_basic(config))?,
            config: config.clone(),
        })
    }
}

impl BarrierDevice for HttpBarrier {
    async fn execute(&self, action: BarrierAction) -> Result<DeviceStatus> {
        let template = self.config.commands.for_action(action).ok_or_else(|| {
            HardwareError::unsupported(format!(
                "{action} (no command template on '{}')",
                self.config.name
            ))
        })?;

        let default_method = match action {
            BarrierAction::Status => Method::GET,
            BarrierAction::Open | BarrierAction::Close => Method::POST,
        };
        let (method, path) = parse_template(template, default_method);
        self.endpoint.send(method, &path, None).await?;
        Ok(DeviceStatus::Online)
    }
}

/// Generic camera with snapshot and stream templates.
#[derive(Debug, Clone)]
pub struct HttpCamera {
    endpoint: HttpEndpoint,
    config: IntegrationConfig,
}

impl HttpCamera {
    pub fn new(client: &Client, config: &IntegrationConfig) -> Result<Self> {
        Ok(Self {
            endpoint: HttpEndpoint::new(client, config, Auth::token_or_basic(config))?,
            config: config.clone(),
        })
    }
}

impl CameraDevice for HttpCamera {
    async fn snapshot(&self) -> Result<Bytes> {
        let template = self.config.commands.snapshot_path.as_deref().ok_or_else(|| {
            HardwareError::unsupported(format!("snapshot (no template on '{}')", self.config.name))
        })?;
        let (_, path) = parse_template(template, Method::GET);
        self.endpoint.get_image(&path).await
    }

    async fn stream_info(&self) -> Result<StreamInfo> {
        let path = self.config.commands.stream_path.as_deref().ok_or_else(|| {
            HardwareError::unsupported(format!("stream (no template on '{}')", self.config.name))
        })?;
        Ok(StreamInfo::new(self.endpoint.url(path.trim())))
    }
}

//! Plate classifier seam.
//!
//! The recognition model runs out of process. The HTTP binding posts the raw
//! image and expects `{"plate": "A123BC777" | null, "confidence": 0-100}`.

#![allow(async_fn_in_trait)]

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

use crate::error::{EngineError, Result};

/// What the classifier read from an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recognition {
    pub plate: Option<String>,
    pub confidence: i32,
}

impl Recognition {
    pub fn new(plate: Option<&str>, confidence: i32) -> Self {
        Self {
            plate: plate.map(str::to_string),
            confidence,
        }
    }
}

pub trait PlateClassifier: Send + Sync {
    async fn classify(&self, image: &[u8]) -> Result<Recognition>;
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl ClassifierConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct ClassifierResponse {
    plate: Option<String>,
    #[serde(default)]
    confidence: f64,
}

#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: Client,
    config: ClassifierConfig,
}

impl HttpClassifier {
    pub fn new(client: Client, config: ClassifierConfig) -> Self {
        Self { client, config }
    }
}

impl PlateClassifier for HttpClassifier {
    async fn classify(&self, image: &[u8]) -> Result<Recognition> {
        let mut request = self
            .client
            .post(&self.config.url)
            .timeout(self.config.timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec());
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Classifier(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Classifier(format!("classifier returned {status}")));
        }

        let body: ClassifierResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Classifier(format!("malformed response: {e}")))?;

        let recognition = Recognition {
            plate: body.plate.filter(|p| !p.trim().is_empty()),
            confidence: body.confidence.round().clamp(0.0, 100.0) as i32,
        };
        debug!(plate = ?recognition.plate, confidence = recognition.confidence, "Plate classified");
        Ok(recognition)
    }
}

#[derive(Debug, Default)]
struct MockState {
    queued: VecDeque<std::result::Result<Recognition, String>>,
    calls: usize,
}

/// Classifier returning scripted results. Clones share the script.
///
/// When the script is empty it reads nothing (`plate: None`, confidence 0).
#[derive(Debug, Clone, Default)]
pub struct MockClassifier {
    state: Arc<Mutex<MockState>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, recognition: Recognition) -> &Self {
        self.lock().queued.push_back(Ok(recognition));
        self
    }

    pub fn push_failure(&self, message: impl Into<String>) -> &Self {
        self.lock().queued.push_back(Err(message.into()));
        self
    }

    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PlateClassifier for MockClassifier {
    async fn classify(&self, _image: &[u8]) -> Result<Recognition> {
        let mut state = self.lock();
        state.calls += 1;
        match state.queued.pop_front() {
            Some(Ok(recognition)) => Ok(recognition),
            Some(Err(message)) => Err(EngineError::Classifier(message)),
            None => Ok(Recognition::new(None, 0)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum AnyClassifier {
    Http(HttpClassifier),
    Mock(MockClassifier),
}

impl PlateClassifier for AnyClassifier {
    async fn classify(&self, image: &[u8]) -> Result<Recognition> {
        match self {
            Self::Http(c) => c.classify(image).await,
            Self::Mock(c) => c.classify(image).await,
        }
    }
}

impl From<MockClassifier> for AnyClassifier {
    fn from(classifier: MockClassifier) -> Self {
        Self::Mock(classifier)
    }
}

impl From<HttpClassifier> for AnyClassifier {
    fn from(classifier: HttpClassifier) -> Self {
        Self::Http(classifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_http_classifier() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/recognize"))
            .and(header("content-type", "application/octet-stream"))
            .and(header("authorization", "Bearer k"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "plate": "a123bc777", "confidence": 91.6 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let classifier = HttpClassifier::new(
            Client::new(),
            ClassifierConfig::new(format!("{}/recognize", server.uri())).with_api_key("k"),
        );
        let recognition = classifier.classify(b"jpeg").await.unwrap();

        assert_eq!(recognition, Recognition::new(Some("a123bc777"), 92));
    }

    #[tokio::test]
    async fn test_http_classifier_no_plate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "plate": null, "confidence": 0 })),
            )
            .mount(&server)
            .await;

        let classifier = HttpClassifier::new(Client::new(), ClassifierConfig::new(server.uri()));
        assert_eq!(
            classifier.classify(b"jpeg").await.unwrap(),
            Recognition::new(None, 0)
        );
    }

    #[tokio::test]
    async fn test_http_classifier_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let classifier = HttpClassifier::new(Client::new(), ClassifierConfig::new(server.uri()));
        let err = classifier.classify(b"jpeg").await.unwrap_err();
        assert!(matches!(err, EngineError::Classifier(m) if m.contains("503")));
    }

    #[tokio::test]
    async fn test_mock_script() {
        let classifier = MockClassifier::new();
        classifier
            .push(Recognition::new(Some("X999YY777"), 88))
            .push_failure("model unavailable");

        assert_eq!(
            classifier.classify(&[]).await.unwrap().plate.as_deref(),
            Some("X999YY777")
        );
        assert!(classifier.classify(&[]).await.is_err());
        assert_eq!(classifier.classify(&[]).await.unwrap().plate, None);
        assert_eq!(classifier.calls(), 3);
    }
}

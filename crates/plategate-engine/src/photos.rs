//! Recognition photo storage.
//!
//! Photos are written once under a random name and referenced from passages
//! and notifications by URL.

use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct PhotoConfig {
    pub directory: PathBuf,
    /// Prefix joined with the file name to form the public URL.
    pub url_prefix: String,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("data/photos"),
            url_prefix: "/photos".to_string(),
        }
    }
}

impl PhotoConfig {
    pub fn new(directory: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            url_prefix: url_prefix.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PhotoStore {
    config: PhotoConfig,
}

impl PhotoStore {
    pub fn new(config: PhotoConfig) -> Self {
        Self { config }
    }

    /// Write `image` and return its URL. Empty images are not stored.
    pub async fn save(&self, image: &[u8]) -> Result<Option<String>> {
        if image.is_empty() {
            return Ok(None);
        }

        tokio::fs::create_dir_all(&self.config.directory).await?;
        let file_name = format!("{}.jpg", Uuid::new_v4());
        tokio::fs::write(self.config.directory.join(&file_name), image).await?;

        let url = format!("{}/{file_name}", self.config.url_prefix.trim_end_matches('/'));
        debug!(%url, bytes = image.len(), "Photo stored");
        Ok(Some(url))
    }
}

//! Application configuration.
//!
//! Layered with the `config` crate: `config/default.toml`, then
//! `config/local.toml`, then `PLATEGATE__SECTION__KEY` environment variables.
//! Both files are optional; every key has a default.

use plategate_engine::{ClassifierConfig, PhotoConfig};
use plategate_notify::SchedulerConfig;
use plategate_storage::DatabaseConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSection,
    pub logging: LoggingConfig,
    pub recognition: RecognitionConfig,
    pub photos: PhotosConfig,
    pub scheduler: SchedulerSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub path: String,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: "data/plategate.db".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`.
    pub level: String,
    /// `pretty` or `json`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// External plate classifier. Without a URL no plates are read.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PhotosConfig {
    pub directory: PathBuf,
    pub url_prefix: String,
}

impl Default for PhotosConfig {
    fn default() -> Self {
        let defaults = PhotoConfig::default();
        Self {
            directory: defaults.directory,
            url_prefix: defaults.url_prefix,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub drain_interval_secs: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            drain_interval_secs: SchedulerConfig::default().interval.as_secs(),
        }
    }
}

impl AppConfig {
    /// Load from `dir` (usually `config/`) and the environment.
    pub fn load(dir: &Path) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::from(dir.join("default")).required(false))
            .add_source(config::File::from(dir.join("local")).required(false))
            .add_source(config::Environment::with_prefix("PLATEGATE").separator("__"));

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.database.path.trim().is_empty() {
            return Err(config::ConfigError::Message("database.path must be set".into()));
        }
        if self.scheduler.drain_interval_secs == 0 {
            return Err(config::ConfigError::Message(
                "scheduler.drain_interval_secs must be positive".into(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(config::ConfigError::Message(format!(
                "logging.format '{}' is not pretty or json",
                self.logging.format
            )));
        }
        Ok(())
    }

    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }

    pub fn classifier(&self) -> Option<ClassifierConfig> {
        let url = self.recognition.url.as_deref().filter(|u| !u.trim().is_empty())?;
        let mut config =
            ClassifierConfig::new(url).with_timeout(Duration::from_secs(self.recognition.timeout_secs));
        if let Some(key) = &self.recognition.api_key {
            config = config.with_api_key(key);
        }
        Some(config)
    }

    pub fn photos(&self) -> PhotoConfig {
        PhotoConfig::new(&self.photos.directory, &self.photos.url_prefix)
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig::default().with_interval(Duration::from_secs(self.scheduler.drain_interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> Result<AppConfig, config::ConfigError> {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    #[test]
    fn test_defaults_without_files() {
        let dir = std::env::temp_dir().join("plategate-no-config");
        let cfg = AppConfig::load(&dir).unwrap();

        assert_eq!(cfg.logging.format, "pretty");
        assert_eq!(cfg.scheduler.drain_interval_secs, 60);
        assert!(cfg.classifier().is_none());
    }

    #[test]
    fn test_sections_override_defaults() {
        let cfg = from_toml(
            r#"
            [database]
            path = "/var/lib/plategate/db.sqlite"

            [logging]
            format = "json"

            [recognition]
            url = "http://anpr.local/recognize"
            api_key = "k"
            timeout_secs = 5

            [scheduler]
            drain_interval_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(cfg.database().database_path, "/var/lib/plategate/db.sqlite");
        assert_eq!(cfg.database.max_connections, 10);
        assert_eq!(cfg.scheduler().interval, Duration::from_secs(30));

        let classifier = cfg.classifier().unwrap();
        assert_eq!(classifier.url, "http://anpr.local/recognize");
        assert_eq!(classifier.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_blank_classifier_url_is_unset() {
        let cfg = from_toml("[recognition]\nurl = \"  \"\n").unwrap();
        assert!(cfg.classifier().is_none());
    }

    #[rstest::rstest]
    #[case("[logging]\nformat = \"xml\"\n")]
    #[case("[scheduler]\ndrain_interval_secs = 0\n")]
    #[case("[database]\npath = \"\"\n")]
    fn test_invalid_values_rejected(#[case] toml: &str) {
        assert!(from_toml(toml).is_err());
    }
}

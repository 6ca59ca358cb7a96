//! `plategate` command line.
//!
//! Opens the database, builds the access service and runs one subcommand.
//! Queued notifications are delivered before the process exits.

use anyhow::{Context, Result};
use clap::Parser;
use plategate_engine::{AccessService, HttpClassifier};
use plategate_storage::Database;
use std::path::PathBuf;
use tracing::{debug, info};

mod commands;
mod config;
mod logging;

use config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "plategate", version, about = "Plate-recognition barrier access control")]
struct Cli {
    /// Directory holding `default.toml` and `local.toml`.
    #[arg(long, env = "PLATEGATE_CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config_dir).context("loading configuration")?;
    logging::init(&config.logging);
    debug!(database = ?config.database, "Configuration loaded");

    let db = Database::new(config.database())
        .await
        .with_context(|| format!("opening database {}", config.database.path))?;

    let mut builder = AccessService::builder(db.clone()).photos(config.photos());
    if let Some(classifier) = config.classifier() {
        info!(url = %classifier.url, "Using HTTP plate classifier");
        builder = builder.classifier(HttpClassifier::new(reqwest::Client::new(), classifier));
    }
    let (service, worker) = builder.build()?;

    let result = commands::run(cli.command, &service, &db, &config).await;

    worker.shutdown().await;
    db.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }
}

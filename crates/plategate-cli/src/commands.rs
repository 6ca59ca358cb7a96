//! Subcommands. Each maps onto one [`AccessService`] operation and prints its
//! result as JSON on stdout.

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, TimeZone, Utc};
use clap::{Args, Subcommand};
use plategate_core::constants::SYSTEM_ACTOR;
use plategate_core::{Plate, Severity};
use plategate_engine::{AccessService, ImportOptions};
use plategate_hardware::{
    BarrierAction, CommandTemplates, GpioPulse, IntegrationConfig, IntegrationKind, VendorKind,
};
use plategate_notify::DrainScheduler;
use plategate_storage::Database;
use plategate_storage::models::{NewBlacklistEntry, NewIntegration, NewVehicle};
use plategate_storage::repositories::{
    BlacklistRepository, IntegrationRepository, NotificationRepository, PassageRepository,
    SettingRepository, VehicleRepository,
};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

use crate::config::AppConfig;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Recognize a plate in an image file and decide.
    Analyze {
        image: PathBuf,
        /// Record the decision without opening the barrier.
        #[arg(long)]
        no_auto_open: bool,
        #[arg(long, default_value = SYSTEM_ACTOR)]
        actor: String,
    },
    /// Take a snapshot from the primary camera and decide.
    Capture {
        #[arg(long)]
        no_auto_open: bool,
        #[arg(long, default_value = SYSTEM_ACTOR)]
        actor: String,
    },
    /// Open the primary barrier by hand.
    Open {
        /// Required; the barrier is not opened without it.
        #[arg(long)]
        confirm: bool,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long, default_value = "operator")]
        actor: String,
    },
    /// Look up a plate in the blacklist without counting an attempt.
    Check { plate: String },
    #[command(subcommand)]
    Blacklist(BlacklistCommand),
    #[command(subcommand)]
    Vehicle(VehicleCommand),
    #[command(subcommand)]
    Notifications(NotificationCommand),
    #[command(subcommand)]
    Integration(IntegrationCommand),
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Recent passages, newest first.
    Passages {
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Row counts and integration health.
    Status,
    /// Drain queued quiet-hours notifications periodically until Ctrl-C.
    RunScheduler,
}

#[derive(Subcommand, Debug)]
pub enum BlacklistCommand {
    Add {
        plate: Plate,
        #[arg(long)]
        reason: String,
        #[arg(long, default_value = "medium")]
        severity: Severity,
        #[arg(long)]
        no_notify: bool,
        /// Last day the entry is in force (YYYY-MM-DD, UTC).
        #[arg(long)]
        expires: Option<NaiveDate>,
    },
    List {
        #[arg(long)]
        include_inactive: bool,
    },
    /// Write the blacklist as CSV to stdout or a file.
    Export {
        #[arg(long)]
        include_inactive: bool,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    Import {
        file: PathBuf,
        /// Report duplicates as skipped instead of as row errors.
        #[arg(long)]
        skip_duplicates: bool,
        /// Overwrite existing entries with the imported rows.
        #[arg(long)]
        update_existing: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum VehicleCommand {
    /// Add a plate to the allowlist.
    Add {
        plate: Plate,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    List {
        #[arg(long)]
        include_inactive: bool,
    },
    Deactivate { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum NotificationCommand {
    List {
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Deliver a stored event again, ignoring quiet hours.
    Resend { id: i64 },
    /// Send everything queued during quiet hours as one digest.
    Drain,
    /// Route the summary of the last 24 hours.
    DailySummary,
    /// Check the chat bot token and chat id.
    VerifyTelegram,
}

#[derive(Subcommand, Debug)]
pub enum IntegrationCommand {
    List {
        #[arg(long)]
        kind: Option<IntegrationKind>,
    },
    Add(AddIntegration),
    /// Probe: status query for barriers, snapshot for cameras.
    Test { id: i64 },
    Exec { id: i64, action: BarrierAction },
    Stream { id: i64 },
    SetPrimary { id: i64 },
    Disable { id: i64 },
}

#[derive(Args, Debug)]
pub struct AddIntegration {
    name: String,
    #[arg(long)]
    kind: IntegrationKind,
    #[arg(long)]
    vendor: VendorKind,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long, env = "PLATEGATE_INTEGRATION_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    #[arg(long, env = "PLATEGATE_INTEGRATION_TOKEN", hide_env_values = true)]
    api_token: Option<String>,
    #[arg(long)]
    gpio_pin: Option<u32>,
    #[arg(long)]
    open_path: Option<String>,
    #[arg(long)]
    close_path: Option<String>,
    #[arg(long)]
    status_path: Option<String>,
    #[arg(long)]
    snapshot_path: Option<String>,
    #[arg(long)]
    stream_path: Option<String>,
    #[arg(long)]
    timeout_ms: Option<u64>,
    #[arg(long)]
    primary: bool,
}

impl AddIntegration {
    fn into_config(self) -> IntegrationConfig {
        let mut config = IntegrationConfig::new(self.name, self.kind, self.vendor);
        if let Some(host) = self.host {
            config = config.with_host(host);
        }
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        if let Some(username) = self.username {
            config = config.with_credentials(username, self.password.unwrap_or_default());
        }
        if let Some(token) = self.api_token {
            config = config.with_api_token(token);
        }
        if let Some(pin) = self.gpio_pin {
            config = config.with_gpio(GpioPulse::new(pin));
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config = config.with_timeout_ms(timeout_ms);
        }
        config.with_commands(CommandTemplates {
            open_path: self.open_path,
            close_path: self.close_path,
            status_path: self.status_path,
            snapshot_path: self.snapshot_path,
            stream_path: self.stream_path,
        })
    }
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// All settings. Credentials are masked.
    List,
    Set { key: String, value: String },
}

pub async fn run(
    command: Command,
    service: &AccessService,
    db: &Database,
    config: &AppConfig,
) -> Result<()> {
    match command {
        Command::Analyze { image, no_auto_open, actor } => {
            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("reading {}", image.display()))?;
            emit(&service.analyze(&bytes, !no_auto_open, &actor).await?)
        }
        Command::Capture { no_auto_open, actor } => {
            emit(&service.capture_and_analyze(!no_auto_open, &actor).await?)
        }
        Command::Open { confirm, notes, actor } => {
            emit(&service.open_barrier(confirm, notes, &actor).await?)
        }
        Command::Check { plate } => emit(&service.check_blacklist(&plate).await?),
        Command::Blacklist(command) => blacklist(command, service).await,
        Command::Vehicle(command) => vehicle(command, service).await,
        Command::Notifications(command) => notifications(command, service).await,
        Command::Integration(command) => integration(command, service).await,
        Command::Settings(command) => settings(command, service).await,
        Command::Passages { limit } => emit(&service.passages().find_recent(limit).await?),
        Command::Status => {
            db.health_check().await?;
            let integrations: Vec<_> = service
                .list_integrations(None)
                .await?
                .into_iter()
                .map(|i| {
                    json!({
                        "id": i.id,
                        "name": i.name,
                        "kind": i.kind,
                        "primary": i.is_primary,
                        "status": i.last_status,
                    })
                })
                .collect();
            emit(&json!({ "database": db.stats().await?, "integrations": integrations }))
        }
        Command::RunScheduler => {
            let handle = DrainScheduler::new(service.router().clone(), config.scheduler()).spawn();
            info!(interval_secs = config.scheduler.drain_interval_secs, "Scheduler running, Ctrl-C to stop");
            tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
            handle.shutdown().await;
            Ok(())
        }
    }
}

async fn blacklist(command: BlacklistCommand, service: &AccessService) -> Result<()> {
    match command {
        BlacklistCommand::Add { plate, reason, severity, no_notify, expires } => {
            let mut entry = NewBlacklistEntry::new(plate, reason, severity).with_notify(!no_notify);
            if let Some(day) = expires {
                let end = day
                    .and_hms_opt(23, 59, 59)
                    .context("invalid expiry date")?;
                entry = entry.with_expiry(Utc.from_utc_datetime(&end));
            }
            let id = service.blacklist().create(&entry).await?;
            emit(&json!({ "id": id }))
        }
        BlacklistCommand::List { include_inactive } => {
            emit(&service.blacklist().list(include_inactive).await?)
        }
        BlacklistCommand::Export { include_inactive, output } => {
            let csv = service.export_blacklist(include_inactive).await?;
            match output {
                Some(path) => tokio::fs::write(&path, csv)
                    .await
                    .with_context(|| format!("writing {}", path.display())),
                None => {
                    print!("{csv}");
                    Ok(())
                }
            }
        }
        BlacklistCommand::Import { file, skip_duplicates, update_existing } => {
            let csv = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let options = ImportOptions { skip_duplicates, update_existing };
            emit(&service.import_blacklist(&csv, options).await?)
        }
    }
}

async fn vehicle(command: VehicleCommand, service: &AccessService) -> Result<()> {
    match command {
        VehicleCommand::Add { plate, owner, phone, notes } => {
            let mut vehicle = NewVehicle::new(plate);
            if let Some(owner) = owner {
                vehicle = vehicle.with_owner(owner, phone);
            }
            if let Some(notes) = notes {
                vehicle = vehicle.with_notes(notes);
            }
            let id = service.vehicles().create(&vehicle).await?;
            emit(&json!({ "id": id }))
        }
        VehicleCommand::List { include_inactive } => {
            emit(&service.vehicles().list(include_inactive).await?)
        }
        VehicleCommand::Deactivate { id } => {
            service.vehicles().deactivate(id).await?;
            emit(&json!({ "id": id, "active": false }))
        }
    }
}

async fn notifications(command: NotificationCommand, service: &AccessService) -> Result<()> {
    match command {
        NotificationCommand::List { limit } => {
            emit(&service.router().events().find_recent(limit).await?)
        }
        NotificationCommand::Resend { id } => emit(&service.resend_notification(id).await?),
        NotificationCommand::Drain => emit(&service.drain_quiet_hours().await?),
        NotificationCommand::DailySummary => emit(&service.send_daily_summary().await?),
        NotificationCommand::VerifyTelegram => emit(&service.verify_telegram().await?),
    }
}

async fn integration(command: IntegrationCommand, service: &AccessService) -> Result<()> {
    match command {
        IntegrationCommand::List { kind } => emit(&service.list_integrations(kind).await?),
        IntegrationCommand::Add(args) => {
            let primary = args.primary;
            let new = NewIntegration::new(args.into_config()).primary(primary);
            let id = service.integrations().create(&new).await?;
            emit(&json!({ "id": id }))
        }
        IntegrationCommand::Test { id } => emit(&service.test_integration(id).await?),
        IntegrationCommand::Exec { id, action } => {
            emit(&service.execute_integration(id, action).await?)
        }
        IntegrationCommand::Stream { id } => emit(&service.integration_stream(id).await?),
        IntegrationCommand::SetPrimary { id } => {
            service.set_primary_integration(id).await?;
            emit(&json!({ "id": id, "primary": true }))
        }
        IntegrationCommand::Disable { id } => {
            service.integrations().set_active(id, false).await?;
            emit(&json!({ "id": id, "active": false }))
        }
    }
}

async fn settings(command: SettingsCommand, service: &AccessService) -> Result<()> {
    match command {
        SettingsCommand::List => {
            let settings: serde_json::Map<String, serde_json::Value> = service
                .settings()
                .all()
                .await?
                .into_iter()
                .map(|s| {
                    let value = if is_secret(&s.key) { "********".to_string() } else { s.value };
                    (s.key, value.into())
                })
                .collect();
            emit(&settings)
        }
        SettingsCommand::Set { key, value } => {
            if key.trim().is_empty() {
                bail!("setting key must not be empty");
            }
            service.settings().set(&key, &value).await?;
            info!(%key, "Setting updated");
            Ok(())
        }
    }
}

fn is_secret(key: &str) -> bool {
    key.ends_with("api_key") || key.ends_with("token") || key.ends_with("password")
}

fn emit<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

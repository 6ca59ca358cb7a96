//! Blacklist CSV import and export.
//!
//! Columns on import: `licensePlate, reason, severity, isActive,
//! notifyOnDetection, expiresAt`. Export adds `attemptCount,
//! lastAttemptAt, createdAt`; those are ignored when the file is imported
//! back. Fields are quoted per RFC 4180.

use chrono::{DateTime, NaiveDate, Utc};
use plategate_core::{Plate, Severity};
use plategate_storage::models::{BlacklistEntry, NewBlacklistEntry};
use plategate_storage::repositories::BlacklistRepository;
use serde::Serialize;
use tracing::info;

use crate::error::{EngineError, Result};

const EXPORT_HEADER: [&str; 9] = [
    "licensePlate",
    "reason",
    "severity",
    "isActive",
    "notifyOnDetection",
    "expiresAt",
    "attemptCount",
    "lastAttemptAt",
    "createdAt",
];

const DEFAULT_REASON: &str = "Imported from CSV";

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    pub skip_duplicates: bool,
    /// Takes precedence over `skip_duplicates`.
    pub update_existing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// 1-based line number of the record, header included.
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<RowError>,
}

pub async fn export(blacklist: &impl BlacklistRepository, include_inactive: bool) -> Result<String> {
    let entries = blacklist.list(include_inactive).await?;

    let mut csv = EXPORT_HEADER.join(",");
    csv.push('\n');
    for entry in &entries {
        let fields = [
            entry.plate.to_string(),
            entry.reason.clone(),
            entry.severity.to_string(),
            entry.is_active.to_string(),
            entry.notify_on_detection.to_string(),
            entry.expires_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            entry.attempt_count.to_string(),
            entry.last_attempt_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            entry.created_at.to_rfc3339(),
        ];
        let row: Vec<String> = fields.iter().map(|f| quote(f)).collect();
        csv.push_str(&row.join(","));
        csv.push('\n');
    }

    info!(entries = entries.len(), include_inactive, "Blacklist exported");
    Ok(csv)
}

pub async fn import(
    blacklist: &impl BlacklistRepository,
    csv: &str,
    options: ImportOptions,
) -> Result<ImportReport> {
    let mut records = parse(csv).into_iter();
    let header = records
        .next()
        .ok_or_else(|| EngineError::validation("CSV is empty: missing licensePlate header"))?;
    let columns = Columns::from_header(&header.fields)?;

    let mut report = ImportReport::default();
    for record in records {
        if record.fields.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let row = record.line;
        let result = match columns.entry(&record.fields) {
            Ok(entry) => apply(blacklist, entry, options, &mut report).await,
            Err(message) => Err(message),
        };
        if let Err(message) = result {
            report.errors.push(RowError { row, message });
        }
    }

    info!(
        imported = report.imported,
        updated = report.updated,
        skipped = report.skipped,
        errors = report.errors.len(),
        "Blacklist imported"
    );
    Ok(report)
}

async fn apply(
    blacklist: &impl BlacklistRepository,
    entry: NewBlacklistEntry,
    options: ImportOptions,
    report: &mut ImportReport,
) -> std::result::Result<(), String> {
    let existing = blacklist
        .find_by_plate(&entry.plate)
        .await
        .map_err(|e| e.to_string())?;

    match existing {
        None => {
            blacklist.create(&entry).await.map_err(|e| e.to_string())?;
            report.imported += 1;
        }
        Some(current) if options.update_existing => {
            let updated = BlacklistEntry {
                reason: entry.reason,
                severity: entry.severity,
                is_active: entry.is_active,
                notify_on_detection: entry.notify_on_detection,
                expires_at: entry.expires_at,
                ..current
            };
            blacklist.update(&updated).await.map_err(|e| e.to_string())?;
            report.updated += 1;
        }
        Some(_) if options.skip_duplicates => report.skipped += 1,
        Some(current) => return Err(format!("{} is already blacklisted", current.plate)),
    }
    Ok(())
}

/// Column positions resolved from the header.
struct Columns {
    plate: usize,
    reason: Option<usize>,
    severity: Option<usize>,
    is_active: Option<usize>,
    notify: Option<usize>,
    expires_at: Option<usize>,
}

impl Columns {
    fn from_header(header: &[String]) -> Result<Self> {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.trim().trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
        };
        Ok(Self {
            plate: find("licensePlate")
                .ok_or_else(|| EngineError::validation("CSV header must contain licensePlate"))?,
            reason: find("reason"),
            severity: find("severity"),
            is_active: find("isActive"),
            notify: find("notifyOnDetection"),
            expires_at: find("expiresAt"),
        })
    }

    fn entry(&self, fields: &[String]) -> std::result::Result<NewBlacklistEntry, String> {
        let get = |index: Option<usize>| {
            index
                .and_then(|i| fields.get(i))
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let raw_plate = get(Some(self.plate)).ok_or("licensePlate is empty")?;
        let plate = Plate::new(raw_plate).map_err(|e| e.to_string())?;
        let reason = get(self.reason).unwrap_or(DEFAULT_REASON);
        let severity = get(self.severity)
            .map(str::parse::<Severity>)
            .transpose()
            .map_err(|e| e.to_string())?
            .unwrap_or_default();

        let mut entry = NewBlacklistEntry::new(plate, reason, severity)
            .with_active(parse_bool(get(self.is_active), "isActive")?.unwrap_or(true))
            .with_notify(parse_bool(get(self.notify), "notifyOnDetection")?.unwrap_or(true));
        if let Some(raw) = get(self.expires_at) {
            entry = entry.with_expiry(parse_timestamp(raw)?);
        }
        Ok(entry)
    }
}

fn parse_bool(value: Option<&str>, column: &str) -> std::result::Result<Option<bool>, String> {
    value
        .map(|v| match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(format!("invalid {column} value '{v}'")),
        })
        .transpose()
}

/// RFC 3339 timestamp or a plain date (midnight UTC).
fn parse_timestamp(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("invalid expiresAt value '{value}'"))
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

struct Record {
    line: usize,
    fields: Vec<String>,
}

/// Split RFC 4180 text into records. Quoted fields may contain separators,
/// line breaks and doubled quotes.
fn parse(text: &str) -> Vec<Record> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                records.push(Record {
                    line: record_line,
                    fields: std::mem::take(&mut fields),
                });
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        records.push(Record {
            line: record_line,
            fields,
        });
    }
    records
}

use chrono::{DateTime, Utc};
use plategate_core::Plate;
use serde::{Deserialize, Serialize};

/// One recognition or manual open event in the passage ledger.
///
/// Rows are append-only; the schema rejects updates and deletes.
/// `plate` is `NULL` when the classifier returned no plate.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Passage {
    pub id: i64,
    pub plate: Option<String>,
    pub confidence: i32,
    pub is_allowed: bool,
    pub was_manual_open: bool,
    pub barrier_opened: bool,
    pub photo_url: Option<String>,
    pub notes: Option<String>,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

/// Ledger entry to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPassage {
    pub plate: Option<Plate>,
    pub confidence: i32,
    pub is_allowed: bool,
    pub was_manual_open: bool,
    pub barrier_opened: bool,
    pub photo_url: Option<String>,
    pub notes: Option<String>,
    pub actor: String,
}

impl NewPassage {
    /// Denied recognition; flip fields with the setters.
    pub fn recognition(plate: Option<Plate>, confidence: i32, actor: impl Into<String>) -> Self {
        Self {
            plate,
            confidence,
            is_allowed: false,
            was_manual_open: false,
            barrier_opened: false,
            photo_url: None,
            notes: None,
            actor: actor.into(),
        }
    }

    /// Operator-initiated open. Always recorded as allowed.
    pub fn manual_open(actor: impl Into<String>) -> Self {
        Self {
            plate: None,
            confidence: 0,
            is_allowed: true,
            was_manual_open: true,
            barrier_opened: false,
            photo_url: None,
            notes: None,
            actor: actor.into(),
        }
    }

    pub fn allowed(mut self, allowed: bool) -> Self {
        self.is_allowed = allowed;
        self
    }

    pub fn barrier_opened(mut self, opened: bool) -> Self {
        self.barrier_opened = opened;
        self
    }

    pub fn with_photo_url(mut self, url: Option<String>) -> Self {
        self.photo_url = url;
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }
}

/// Passage totals over a period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageCounts {
    pub total: i64,
    pub allowed: i64,
    pub denied: i64,
    pub manual_opens: i64,
    pub blacklist_hits: i64,
}

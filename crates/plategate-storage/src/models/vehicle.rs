use chrono::{DateTime, Utc};
use plategate_core::Plate;
use serde::{Deserialize, Serialize};

/// Allowlisted vehicle.
///
/// Vehicles are never deleted; [`deactivate`] clears `is_active` instead so
/// the passage history keeps pointing at a known owner.
///
/// [`deactivate`]: crate::repositories::VehicleRepository::deactivate
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vehicle {
    pub id: i64,
    #[sqlx(try_from = "String")]
    pub plate: Plate,
    pub owner_name: Option<String>,
    pub owner_phone: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for a vehicle that is not stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVehicle {
    pub plate: Plate,
    pub owner_name: Option<String>,
    pub owner_phone: Option<String>,
    pub notes: Option<String>,
}

impl NewVehicle {
    pub fn new(plate: Plate) -> Self {
        Self {
            plate,
            owner_name: None,
            owner_phone: None,
            notes: None,
        }
    }

    pub fn with_owner(mut self, name: impl Into<String>, phone: Option<String>) -> Self {
        self.owner_name = Some(name.into());
        self.owner_phone = phone;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

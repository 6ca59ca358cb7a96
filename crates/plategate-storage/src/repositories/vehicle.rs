#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::{NewVehicle, Vehicle};
use chrono::Utc;
use plategate_core::Plate;
use sqlx::SqlitePool;

/// Allowlist half of the access registry.
pub trait VehicleRepository: Send + Sync {
    /// Create a vehicle. A plate that is already registered is a validation error.
    async fn create(&self, vehicle: &NewVehicle) -> StorageResult<i64>;

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Vehicle>>;

    /// Find a vehicle by plate, active or not.
    async fn find_by_plate(&self, plate: &Plate) -> StorageResult<Option<Vehicle>>;

    /// Find an active vehicle by plate.
    async fn find_active_by_plate(&self, plate: &Plate) -> StorageResult<Option<Vehicle>>;

    /// Update owner details and the active flag.
    async fn update(&self, vehicle: &Vehicle) -> StorageResult<()>;

    /// Soft delete.
    async fn deactivate(&self, id: i64) -> StorageResult<()>;

    async fn list(&self, include_inactive: bool) -> StorageResult<Vec<Vehicle>>;
}

/// SQLite implementation of VehicleRepository
pub struct SqliteVehicleRepository {
    pool: SqlitePool,
}

impl SqliteVehicleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const SELECT_VEHICLE: &str = r#"
    SELECT id, plate, owner_name, owner_phone, notes, is_active, created_at, updated_at
    FROM vehicles
"#;

impl VehicleRepository for SqliteVehicleRepository {
    async fn create(&self, vehicle: &NewVehicle) -> StorageResult<i64> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO vehicles (plate, owner_name, owner_phone, notes, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(vehicle.plate.as_str())
        .bind(&vehicle.owner_name)
        .bind(&vehicle.owner_phone)
        .bind(&vehicle.notes)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            StorageError::unique_as_validation(e, || {
                format!("Vehicle with plate {} already exists", vehicle.plate)
            })
        })?;

        Ok(result.last_insert_rowid())
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>(&format!("{SELECT_VEHICLE} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(vehicle)
    }

    async fn find_by_plate(&self, plate: &Plate) -> StorageResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>(&format!("{SELECT_VEHICLE} WHERE plate = ?"))
            .bind(plate.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(vehicle)
    }

    async fn find_active_by_plate(&self, plate: &Plate) -> StorageResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>(&format!(
            "{SELECT_VEHICLE} WHERE plate = ? AND is_active = 1"
        ))
        .bind(plate.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(vehicle)
    }

    async fn update(&self, vehicle: &Vehicle) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE vehicles
            SET owner_name = ?, owner_phone = ?, notes = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&vehicle.owner_name)
        .bind(&vehicle.owner_phone)
        .bind(&vehicle.notes)
        .bind(vehicle.is_active)
        .bind(Utc::now())
        .bind(vehicle.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Vehicle", "id", vehicle.id));
        }

        Ok(())
    }

    async fn deactivate(&self, id: i64) -> StorageResult<()> {
        let result = sqlx::query("UPDATE vehicles SET is_active = 0, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Vehicle", "id", id));
        }

        Ok(())
    }

    async fn list(&self, include_inactive: bool) -> StorageResult<Vec<Vehicle>> {
        let filter = if include_inactive { "" } else { "WHERE is_active = 1" };
        let vehicles =
            sqlx::query_as::<_, Vehicle>(&format!("{SELECT_VEHICLE} {filter} ORDER BY plate"))
                .fetch_all(&self.pool)
                .await?;

        Ok(vehicles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;

    async fn setup_test_db() -> Database {
        Database::in_memory().await.unwrap()
    }

    fn plate(raw: &str) -> Plate {
        Plate::new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_vehicle() {
        let db = setup_test_db().await;
        let repo = SqliteVehicleRepository::new(db.pool().clone());

        let id = repo
            .create(&NewVehicle::new(plate("a 123 bc 777")).with_owner("Anna", None))
            .await
            .unwrap();
        assert!(id > 0);

        let found = repo.find_by_plate(&plate("A123BC777")).await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.owner_name.as_deref(), Some("Anna"));
        assert!(found.is_active);
    }

    #[tokio::test]
    async fn test_duplicate_plate_is_validation_error() {
        let db = setup_test_db().await;
        let repo = SqliteVehicleRepository::new(db.pool().clone());

        repo.create(&NewVehicle::new(plate("B222CC77"))).await.unwrap();
        let err = repo.create(&NewVehicle::new(plate("b222cc77"))).await.unwrap_err();

        assert!(matches!(err, StorageError::Validation(_)));
    }

    #[tokio::test]
    async fn test_deactivate_hides_from_active_lookup() {
        let db = setup_test_db().await;
        let repo = SqliteVehicleRepository::new(db.pool().clone());

        let id = repo.create(&NewVehicle::new(plate("C333DD77"))).await.unwrap();
        repo.deactivate(id).await.unwrap();

        assert!(repo.find_active_by_plate(&plate("C333DD77")).await.unwrap().is_none());
        assert!(repo.find_by_plate(&plate("C333DD77")).await.unwrap().is_some());
        assert_eq!(repo.list(false).await.unwrap().len(), 0);
        assert_eq!(repo.list(true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_vehicle() {
        let db = setup_test_db().await;
        let repo = SqliteVehicleRepository::new(db.pool().clone());

        let id = repo.create(&NewVehicle::new(plate("E555FF77"))).await.unwrap();
        let mut vehicle = repo.find_by_id(id).await.unwrap().unwrap();
        vehicle.owner_phone = Some("+100200300".to_string());
        repo.update(&vehicle).await.unwrap();

        let updated = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(updated.owner_phone.as_deref(), Some("+100200300"));
    }

    #[tokio::test]
    async fn test_deactivate_missing_vehicle() {
        let db = setup_test_db().await;
        let repo = SqliteVehicleRepository::new(db.pool().clone());

        assert!(repo.deactivate(42).await.unwrap_err().is_not_found());
    }
}

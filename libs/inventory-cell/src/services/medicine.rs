// libs/inventory-cell/src/services/medicine.rs
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::{filter_value, SupabaseClient};

use crate::models::{
    CreateMedicineRequest, InventoryError, Medicine, StockReport, UpdateMedicineRequest,
    DEFAULT_EXPIRY_WINDOW_DAYS,
};

const MEDICINE_SELECT: &str = "*,manufacturer:manufacturers(id,name)";
const STOCK_UPDATE_ATTEMPTS: u32 = 3;
const MAX_EXPIRY_WINDOW_DAYS: i64 = 3650;

pub struct MedicineService {
    db: Arc<SupabaseClient>,
}

impl MedicineService {
    pub fn new(db: Arc<SupabaseClient>) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<Medicine>, InventoryError> {
        debug!("Listing active medicines");
        let query = format!(
            "medicines?select={}&active=eq.true&order=commercial_name.asc",
            MEDICINE_SELECT
        );
        Ok(self.db.select(&query).await?)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Medicine>, InventoryError> {
        let query = format!("medicines?select={}&id=eq.{}", MEDICINE_SELECT, id);
        Ok(self.db.select_one(&query).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Medicine, InventoryError> {
        self.find_by_id(id).await?.ok_or(InventoryError::MedicineNotFound)
    }

    /// Case-insensitive substring match on the commercial name.
    pub async fn search_by_name(&self, name: &str) -> Result<Vec<Medicine>, InventoryError> {
        let query = format!(
            "medicines?select={}&active=eq.true&commercial_name=ilike.*{}*&order=commercial_name.asc",
            MEDICINE_SELECT,
            filter_value(name.trim())
        );
        Ok(self.db.select(&query).await?)
    }

    /// Case-insensitive substring match on the manufacturer's name.
    pub async fn search_by_manufacturer(&self, manufacturer: &str) -> Result<Vec<Medicine>, InventoryError> {
        let query = format!(
            "medicines?select=*,manufacturer:manufacturers!inner(id,name)&active=eq.true&manufacturer.name=ilike.*{}*&order=commercial_name.asc",
            filter_value(manufacturer.trim())
        );
        Ok(self.db.select(&query).await?)
    }

    pub async fn create(&self, request: CreateMedicineRequest) -> Result<Medicine, InventoryError> {
        request.validate(Utc::now().date_naive())?;
        self.ensure_manufacturer_exists(request.manufacturer_id).await?;

        let row = json!({
            "commercial_name": request.commercial_name.trim(),
            "generic_name": request.generic_name,
            "manufacturer_id": request.manufacturer_id,
            "batch": request.batch.trim(),
            "quantity_in_stock": request.quantity_in_stock,
            "minimum_quantity": request.minimum_quantity,
            "expiry_date": request.expiry_date,
            "storage_location": request.storage_location,
            "active": true,
        });
        let medicine: Medicine = self
            .db
            .insert(&format!("medicines?select={}", MEDICINE_SELECT), &row)
            .await?;

        info!(
            "Registered medicine {} batch {} ({} units)",
            medicine.commercial_name, medicine.batch, medicine.quantity_in_stock
        );
        Ok(medicine)
    }

    pub async fn update(&self, id: Uuid, request: UpdateMedicineRequest) -> Result<Medicine, InventoryError> {
        request.validate()?;
        if let Some(manufacturer_id) = request.manufacturer_id {
            self.ensure_manufacturer_exists(manufacturer_id).await?;
        }

        let mut changes = serde_json::to_value(&request)
            .map_err(|e| InventoryError::ValidationError(e.to_string()))?;
        if let Value::Object(map) = &mut changes {
            map.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
        }

        let query = format!("medicines?id=eq.{}&select={}", id, MEDICINE_SELECT);
        let updated: Vec<Medicine> = self.db.update(&query, &changes).await?;
        updated.into_iter().next().ok_or(InventoryError::MedicineNotFound)
    }

    /// Applies a signed change to the stock. The write only lands if the
    /// quantity still matches what was read; otherwise it re-reads and retries.
    pub async fn adjust_stock(&self, id: Uuid, delta: i32) -> Result<Medicine, InventoryError> {
        for attempt in 1..=STOCK_UPDATE_ATTEMPTS {
            let current = self.get(id).await?;
            let available = current.quantity_in_stock;

            let new_quantity = available
                .checked_add(delta)
                .filter(|q| *q >= 0)
                .ok_or(InventoryError::InsufficientStock {
                    available,
                    requested: delta,
                })?;

            let query = format!(
                "medicines?id=eq.{}&quantity_in_stock=eq.{}&select={}",
                id, available, MEDICINE_SELECT
            );
            let body = json!({
                "quantity_in_stock": new_quantity,
                "updated_at": Utc::now().to_rfc3339(),
            });
            let updated: Vec<Medicine> = self.db.update(&query, &body).await?;

            if let Some(medicine) = updated.into_iter().next() {
                info!(
                    "Stock of medicine {} moved {} -> {}",
                    id, available, medicine.quantity_in_stock
                );
                return Ok(medicine);
            }

            warn!(
                "Stock of medicine {} changed concurrently (attempt {}/{})",
                id, attempt, STOCK_UPDATE_ATTEMPTS
            );
        }

        Err(InventoryError::StockContention)
    }

    /// Soft delete; the row stays for history but leaves every listing.
    pub async fn deactivate(&self, id: Uuid) -> Result<(), InventoryError> {
        let query = format!("medicines?id=eq.{}&select=id", id);
        let body = json!({ "active": false, "updated_at": Utc::now().to_rfc3339() });
        let updated: Vec<Value> = self.db.update(&query, &body).await?;

        if updated.is_empty() {
            return Err(InventoryError::MedicineNotFound);
        }
        info!("Deactivated medicine {}", id);
        Ok(())
    }

    /// Active medicines expiring between today and `today + days`, soonest first.
    pub async fn expiring_within(&self, days: Option<i64>) -> Result<Vec<Medicine>, InventoryError> {
        let days = days.unwrap_or(DEFAULT_EXPIRY_WINDOW_DAYS);
        if !(0..=MAX_EXPIRY_WINDOW_DAYS).contains(&days) {
            return Err(InventoryError::ValidationError(format!(
                "Expiry window must be between 0 and {} days",
                MAX_EXPIRY_WINDOW_DAYS
            )));
        }

        let today = Utc::now().date_naive();
        let limit = today + Duration::days(days);
        let query = format!(
            "medicines?select={}&active=eq.true&expiry_date=gte.{}&expiry_date=lte.{}&order=expiry_date.asc",
            MEDICINE_SELECT, today, limit
        );
        let medicines: Vec<Medicine> = self.db.select(&query).await?;
        Ok(medicines
            .into_iter()
            .filter(|m| m.expires_within(today, days))
            .collect())
    }

    /// PostgREST cannot compare two columns, so the threshold is applied here.
    pub async fn low_stock(&self) -> Result<Vec<Medicine>, InventoryError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(Medicine::is_low_stock)
            .collect())
    }

    pub async fn stock_report(&self) -> Result<StockReport, InventoryError> {
        let medicines = self.list().await?;
        Ok(StockReport::build(medicines, Utc::now().date_naive()))
    }

    async fn ensure_manufacturer_exists(&self, manufacturer_id: Uuid) -> Result<(), InventoryError> {
        let found: Option<Value> = self
            .db
            .select_one(&format!("manufacturers?select=id&id=eq.{}", manufacturer_id))
            .await?;
        found.map(|_| ()).ok_or(InventoryError::ManufacturerNotFound)
    }
}

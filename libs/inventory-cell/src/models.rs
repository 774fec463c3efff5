// libs/inventory-cell/src/models.rs
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use shared_database::DbError;
use shared_models::error::AppError;

pub const DEFAULT_EXPIRY_WINDOW_DAYS: i64 = 30;

// ==============================================================================
// MANUFACTURERS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manufacturer {
    pub id: Uuid,
    pub name: String,
    pub anvisa_registration: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateManufacturerRequest {
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(alias = "registroAnvisa")]
    pub anvisa_registration: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateManufacturerRequest {
    #[serde(alias = "nome", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(alias = "registroAnvisa", skip_serializing_if = "Option::is_none")]
    pub anvisa_registration: Option<String>,
}

// ==============================================================================
// MEDICINES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medicine {
    pub id: Uuid,
    pub commercial_name: String,
    pub generic_name: Option<String>,
    pub manufacturer_id: Uuid,
    pub batch: String,
    pub quantity_in_stock: i32,
    pub minimum_quantity: i32,
    pub expiry_date: NaiveDate,
    pub storage_location: Option<String>,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<Value>,
}

impl Medicine {
    pub fn is_low_stock(&self) -> bool {
        self.quantity_in_stock <= self.minimum_quantity
    }

    /// Not yet expired and expiring on or before `today + days`.
    pub fn expires_within(&self, today: NaiveDate, days: i64) -> bool {
        self.expiry_date >= today && self.expiry_date <= today + Duration::days(days)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMedicineRequest {
    pub commercial_name: String,
    pub generic_name: Option<String>,
    pub manufacturer_id: Uuid,
    pub batch: String,
    #[serde(default)]
    pub quantity_in_stock: i32,
    #[serde(default)]
    pub minimum_quantity: i32,
    pub expiry_date: NaiveDate,
    pub storage_location: Option<String>,
}

impl CreateMedicineRequest {
    pub fn validate(&self, today: NaiveDate) -> Result<(), InventoryError> {
        if self.commercial_name.trim().is_empty() || self.batch.trim().is_empty() {
            return Err(InventoryError::ValidationError(
                "Commercial name and batch are required".to_string(),
            ));
        }
        if self.quantity_in_stock < 0 || self.minimum_quantity < 0 {
            return Err(InventoryError::ValidationError(
                "Quantities cannot be negative".to_string(),
            ));
        }
        if self.expiry_date < today {
            return Err(InventoryError::ValidationError(
                "Expiry date cannot be in the past".to_string(),
            ));
        }
        Ok(())
    }
}

/// Catalogue fields only; stock moves through `StockAdjustmentRequest`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMedicineRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commercial_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generic_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_quantity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,
}

impl UpdateMedicineRequest {
    pub fn validate(&self) -> Result<(), InventoryError> {
        let blank = |value: &Option<String>| value.as_deref().is_some_and(|v| v.trim().is_empty());
        if blank(&self.commercial_name) || blank(&self.batch) {
            return Err(InventoryError::ValidationError(
                "Commercial name and batch cannot be empty".to_string(),
            ));
        }
        if self.minimum_quantity.is_some_and(|q| q < 0) {
            return Err(InventoryError::ValidationError(
                "Minimum quantity cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Signed change applied to the current stock.
#[derive(Debug, Clone, Deserialize)]
pub struct StockAdjustmentRequest {
    #[serde(alias = "quantidade")]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub nome: String,
}

#[derive(Debug, Deserialize)]
pub struct ManufacturerQuery {
    pub fabricante: String,
}

#[derive(Debug, Deserialize)]
pub struct ExpiryQuery {
    pub dias: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockReport {
    pub total_medicines: usize,
    pub total_units: i64,
    pub medicines: Vec<Medicine>,
    pub expiring_soon: Vec<Medicine>,
    pub low_stock: Vec<Medicine>,
}

impl StockReport {
    pub fn build(medicines: Vec<Medicine>, today: NaiveDate) -> Self {
        let expiring_soon = medicines
            .iter()
            .filter(|m| m.expires_within(today, DEFAULT_EXPIRY_WINDOW_DAYS))
            .cloned()
            .collect();
        let low_stock = medicines.iter().filter(|m| m.is_low_stock()).cloned().collect();
        let total_units = medicines.iter().map(|m| i64::from(m.quantity_in_stock)).sum();

        Self {
            total_medicines: medicines.len(),
            total_units,
            medicines,
            expiring_soon,
            low_stock,
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Medicine not found")]
    MedicineNotFound,

    #[error("Manufacturer not found")]
    ManufacturerNotFound,

    #[error("Manufacturer still has medicines registered")]
    ManufacturerInUse,

    #[error("Insufficient stock: {available} available, change of {requested} requested")]
    InsufficientStock { available: i32, requested: i32 },

    #[error("Stock changed concurrently, try again")]
    StockContention,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::MedicineNotFound | InventoryError::ManufacturerNotFound => {
                AppError::NotFound(err.to_string())
            }
            InventoryError::ManufacturerInUse | InventoryError::InsufficientStock { .. } => {
                AppError::BadRequest(err.to_string())
            }
            InventoryError::StockContention => AppError::Conflict(err.to_string()),
            InventoryError::ValidationError(_) => AppError::ValidationError(err.to_string()),
            InventoryError::Database(db) => db.into(),
        }
    }
}

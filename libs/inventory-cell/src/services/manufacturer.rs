// libs/inventory-cell/src/services/manufacturer.rs
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{DbError, SupabaseClient};

use crate::models::{
    CreateManufacturerRequest, InventoryError, Manufacturer, UpdateManufacturerRequest,
};

pub struct ManufacturerService {
    db: Arc<SupabaseClient>,
}

impl ManufacturerService {
    pub fn new(db: Arc<SupabaseClient>) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<Manufacturer>, InventoryError> {
        debug!("Listing manufacturers");
        Ok(self.db.select("manufacturers?select=*&order=name.asc").await?)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Manufacturer>, InventoryError> {
        Ok(self
            .db
            .select_one(&format!("manufacturers?select=*&id=eq.{}", id))
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Manufacturer, InventoryError> {
        self.find_by_id(id)
            .await?
            .ok_or(InventoryError::ManufacturerNotFound)
    }

    pub async fn create(&self, request: CreateManufacturerRequest) -> Result<Manufacturer, InventoryError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(InventoryError::ValidationError(
                "Manufacturer name is required".to_string(),
            ));
        }

        let row = json!({
            "name": name,
            "anvisa_registration": request.anvisa_registration,
        });
        let manufacturer: Manufacturer = self.db.insert("manufacturers", &row).await?;

        info!("Registered manufacturer {} ({})", manufacturer.name, manufacturer.id);
        Ok(manufacturer)
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateManufacturerRequest,
    ) -> Result<Manufacturer, InventoryError> {
        if request.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(InventoryError::ValidationError(
                "Manufacturer name cannot be empty".to_string(),
            ));
        }

        let mut changes = serde_json::to_value(&request)
            .map_err(|e| InventoryError::ValidationError(e.to_string()))?;
        if let Value::Object(map) = &mut changes {
            map.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
        }

        let updated: Vec<Manufacturer> = self
            .db
            .update(&format!("manufacturers?id=eq.{}&select=*", id), &changes)
            .await?;
        updated
            .into_iter()
            .next()
            .ok_or(InventoryError::ManufacturerNotFound)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), InventoryError> {
        let deleted: Vec<Manufacturer> = self
            .db
            .delete(&format!("manufacturers?id=eq.{}", id))
            .await
            .map_err(|e| match e {
                DbError::ForeignKeyViolation(_) => InventoryError::ManufacturerInUse,
                other => other.into(),
            })?;

        if deleted.is_empty() {
            return Err(InventoryError::ManufacturerNotFound);
        }
        info!("Deleted manufacturer {}", id);
        Ok(())
    }
}

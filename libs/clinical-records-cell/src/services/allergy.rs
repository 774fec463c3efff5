// libs/clinical-records-cell/src/services/allergy.rs
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::models::{Allergy, RecordError};
use crate::services::record::RecordService;

pub type AllergyService = RecordService<Allergy>;

impl RecordService<Allergy> {
    pub async fn find_active_by_user_id(&self, user_id: Uuid) -> Result<Vec<Allergy>, RecordError> {
        self.list(&format!("user_id=eq.{}&active=eq.true", user_id), "created_at.desc")
            .await
    }

    pub async fn deactivate(&self, id: Uuid) -> Result<Allergy, RecordError> {
        self.get(id).await?;
        let allergy = self.patch(id, json!({ "active": false })).await?;
        info!("Deactivated allergy {}", id);
        Ok(allergy)
    }
}

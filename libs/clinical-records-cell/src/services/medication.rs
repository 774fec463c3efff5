// libs/clinical-records-cell/src/services/medication.rs
use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::models::{Medication, RecordError};
use crate::services::record::RecordService;

pub type MedicationService = RecordService<Medication>;

impl RecordService<Medication> {
    /// Active prescriptions whose end date is open or still ahead.
    pub async fn find_active_by_user_id(&self, user_id: Uuid) -> Result<Vec<Medication>, RecordError> {
        let today = Utc::now().date_naive();
        let filter = format!(
            "user_id=eq.{}&active=eq.true&or=(end_date.is.null,end_date.gt.{})",
            user_id, today
        );
        let medications = self.list(&filter, "created_at.desc").await?;
        Ok(medications
            .into_iter()
            .filter(|medication| medication.is_current(today))
            .collect())
    }

    /// Stops the prescription today. One that has not started yet ends on its
    /// start date so the period stays ordered.
    pub async fn deactivate(&self, id: Uuid) -> Result<Medication, RecordError> {
        let current = self.get(id).await?;
        let end_date = Utc::now().date_naive().max(current.start_date);
        let changes = json!({
            "active": false,
            "end_date": end_date
        });
        let medication = self.patch(id, changes).await?;
        info!("Deactivated medication {}", id);
        Ok(medication)
    }
}

// libs/clinical-records-cell/src/services/vital_signs.rs
use tracing::debug;
use uuid::Uuid;

use crate::models::{RecordError, VitalSigns};
use crate::services::record::RecordService;

pub type VitalSignsService = RecordService<VitalSigns>;

impl RecordService<VitalSigns> {
    pub async fn find_latest_by_user_id(&self, user_id: Uuid) -> Result<VitalSigns, RecordError> {
        debug!("Fetching latest vital signs of user {}", user_id);
        self.list(&format!("user_id=eq.{}", user_id), "created_at.desc&limit=1")
            .await?
            .into_iter()
            .next()
            .ok_or(RecordError::NoVitalSigns)
    }
}

// libs/clinical-records-cell/src/services/medical_exam.rs
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{MedicalExam, RecordError, UpdateExamStatusRequest};
use crate::services::record::RecordService;

pub type MedicalExamService = RecordService<MedicalExam>;

impl RecordService<MedicalExam> {
    /// Exams requested for a future date, soonest first.
    pub async fn find_pending_by_user_id(&self, user_id: Uuid) -> Result<Vec<MedicalExam>, RecordError> {
        let filter = format!(
            "user_id=eq.{}&request_date=gt.{}",
            user_id,
            Utc::now().date_naive()
        );
        self.list(&filter, "request_date.asc").await
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        request: UpdateExamStatusRequest,
    ) -> Result<MedicalExam, RecordError> {
        let current = self.get(id).await?;
        if !current.status.can_transition_to(request.status) {
            warn!("Exam {} cannot move {} -> {}", id, current.status, request.status);
            return Err(RecordError::InvalidExamTransition {
                from: current.status,
                to: request.status,
            });
        }

        let mut changes = json!({ "status": request.status });
        if let Some(result) = request.result {
            changes["result"] = json!(result);
        }

        let exam = self.patch(id, changes).await?;
        info!("Exam {} moved {} -> {}", id, current.status, exam.status);
        Ok(exam)
    }
}

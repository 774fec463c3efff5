// libs/clinical-records-cell/src/services/clinical_note.rs
use uuid::Uuid;

use shared_database::filter_value;

use crate::models::{ClinicalNote, RecordError};
use crate::services::record::RecordService;

pub type ClinicalNoteService = RecordService<ClinicalNote>;

impl RecordService<ClinicalNote> {
    pub async fn find_by_type(&self, user_id: Uuid, note_type: &str) -> Result<Vec<ClinicalNote>, RecordError> {
        let filter = format!(
            "user_id=eq.{}&note_type=eq.{}",
            user_id,
            filter_value(note_type.trim())
        );
        self.list(&filter, "created_at.desc").await
    }
}

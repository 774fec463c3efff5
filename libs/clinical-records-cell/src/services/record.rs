// libs/clinical-records-cell/src/services/record.rs
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{ClinicalRecord, RecordError};

/// Store access shared by every clinical record kind. Kind-specific queries
/// live in inherent impls next to this one.
pub struct RecordService<R> {
    pub(crate) db: Arc<SupabaseClient>,
    _record: PhantomData<fn() -> R>,
}

impl<R: ClinicalRecord> RecordService<R> {
    pub fn new(db: Arc<SupabaseClient>) -> Self {
        Self {
            db,
            _record: PhantomData,
        }
    }

    async fn ensure_user_exists(&self, user_id: Uuid) -> Result<(), RecordError> {
        let user: Option<Value> = self
            .db
            .select_one(&format!("users?select=id&id=eq.{}", user_id))
            .await?;
        if user.is_none() {
            warn!("{} rejected: user {} does not exist", R::LABEL, user_id);
            return Err(RecordError::UserNotFound);
        }
        Ok(())
    }

    pub async fn create(&self, request: R::Create) -> Result<R, RecordError> {
        let owner = R::owner_of(&request);
        if R::REQUIRES_EXISTING_USER {
            self.ensure_user_exists(owner).await?;
        }

        let row = R::into_row(request)?;
        let record: R = self.db.insert(R::TABLE, &row).await?;

        info!("Created {} {} for user {}", R::LABEL, record.id(), owner);
        Ok(record)
    }

    pub(crate) async fn list(&self, filter: &str, order: &str) -> Result<Vec<R>, RecordError> {
        let query = format!("{}?select=*&{}&order={}", R::TABLE, filter, order);
        Ok(self.db.select(&query).await?)
    }

    /// Newest first.
    pub async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<R>, RecordError> {
        debug!("Listing {} entries of user {}", R::TABLE, user_id);
        self.list(&format!("user_id=eq.{}", user_id), "created_at.desc").await
    }

    /// Newest first.
    pub async fn find_by_attendance_id(&self, attendance_id: Uuid) -> Result<Vec<R>, RecordError> {
        debug!("Listing {} entries of attendance {}", R::TABLE, attendance_id);
        self.list(&format!("attendance_id=eq.{}", attendance_id), "created_at.desc")
            .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<R>, RecordError> {
        let query = format!("{}?select=*&id=eq.{}", R::TABLE, id);
        Ok(self.db.select_one(&query).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<R, RecordError> {
        self.find_by_id(id).await?.ok_or(RecordError::NotFound(R::LABEL))
    }

    pub async fn update(&self, id: Uuid, update: R::Update) -> Result<R, RecordError> {
        let current = self.get(id).await?;
        current.check_update(&update)?;

        let changes = serde_json::to_value(&update)
            .map_err(|e| RecordError::ValidationError(e.to_string()))?;
        if changes.as_object().map_or(true, |fields| fields.is_empty()) {
            return Ok(current);
        }

        let record = self.patch(id, changes).await?;
        info!("Updated {} {}", R::LABEL, id);
        Ok(record)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), RecordError> {
        self.get(id).await?;

        let _: Vec<Value> = self
            .db
            .delete(&format!("{}?id=eq.{}", R::TABLE, id))
            .await?;

        info!("Deleted {} {}", R::LABEL, id);
        Ok(())
    }

    /// PATCH one row, stamping `updated_at`.
    pub(crate) async fn patch(&self, id: Uuid, mut changes: Value) -> Result<R, RecordError> {
        if let Some(fields) = changes.as_object_mut() {
            fields.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
        }

        let query = format!("{}?id=eq.{}&select=*", R::TABLE, id);
        let updated: Vec<R> = self.db.update(&query, &changes).await?;
        updated
            .into_iter()
            .next()
            .ok_or(RecordError::NotFound(R::LABEL))
    }
}

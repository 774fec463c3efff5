// libs/clinical-records-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{ClinicalRecord, UpdateExamStatusRequest};
use crate::services::{
    AllergyService, ClinicalNoteService, MedicalExamService, MedicationService, RecordService,
    VitalSignsService,
};

fn ensure_can_access(user: &AuthUser, owner_id: Uuid) -> Result<(), AppError> {
    if user.can_access_user_data(owner_id) {
        Ok(())
    } else {
        warn!("User {} denied access to clinical records of {}", user.id, owner_id);
        Err(AppError::Forbidden("Access denied".to_string()))
    }
}

// ==============================================================================
// SHARED RECORD HANDLERS
// ==============================================================================

pub async fn create_record<R: ClinicalRecord>(
    State(state): State<Arc<AppState>>,
    Json(request): Json<R::Create>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = RecordService::<R>::new(state.db.clone());
    let record = service.create(request).await?;
    Ok((StatusCode::CREATED, Json(json!(record))))
}

pub async fn list_by_user<R: ClinicalRecord>(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ensure_can_access(&user, user_id)?;

    let service = RecordService::<R>::new(state.db.clone());
    let records = service.find_by_user_id(user_id).await?;
    Ok(Json(json!(records)))
}

pub async fn list_by_attendance<R: ClinicalRecord>(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(attendance_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = RecordService::<R>::new(state.db.clone());
    let records = service.find_by_attendance_id(attendance_id).await?;

    for record in &records {
        ensure_can_access(&user, record.owner_id())?;
    }
    Ok(Json(json!(records)))
}

pub async fn get_record<R: ClinicalRecord>(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = RecordService::<R>::new(state.db.clone());
    let record = service.get(id).await?;
    ensure_can_access(&user, record.owner_id())?;
    Ok(Json(json!(record)))
}

pub async fn update_record<R: ClinicalRecord>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(update): Json<R::Update>,
) -> Result<Json<Value>, AppError> {
    let service = RecordService::<R>::new(state.db.clone());
    let record = service.update(id, update).await?;
    Ok(Json(json!(record)))
}

pub async fn delete_record<R: ClinicalRecord>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = RecordService::<R>::new(state.db.clone());
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// KIND-SPECIFIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn latest_vital_signs(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ensure_can_access(&user, user_id)?;

    let service = VitalSignsService::new(state.db.clone());
    let latest = service.find_latest_by_user_id(user_id).await?;
    Ok(Json(json!(latest)))
}

#[axum::debug_handler]
pub async fn active_allergies(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ensure_can_access(&user, user_id)?;

    let service = AllergyService::new(state.db.clone());
    let allergies = service.find_active_by_user_id(user_id).await?;
    Ok(Json(json!(allergies)))
}

#[axum::debug_handler]
pub async fn deactivate_allergy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AllergyService::new(state.db.clone());
    let allergy = service.deactivate(id).await?;
    Ok(Json(json!(allergy)))
}

#[axum::debug_handler]
pub async fn active_medications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ensure_can_access(&user, user_id)?;

    let service = MedicationService::new(state.db.clone());
    let medications = service.find_active_by_user_id(user_id).await?;
    Ok(Json(json!(medications)))
}

#[axum::debug_handler]
pub async fn deactivate_medication(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = MedicationService::new(state.db.clone());
    let medication = service.deactivate(id).await?;
    Ok(Json(json!(medication)))
}

#[axum::debug_handler]
pub async fn notes_by_type(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((user_id, note_type)): Path<(Uuid, String)>,
) -> Result<Json<Value>, AppError> {
    ensure_can_access(&user, user_id)?;

    let service = ClinicalNoteService::new(state.db.clone());
    let notes = service.find_by_type(user_id, &note_type).await?;
    Ok(Json(json!(notes)))
}

#[axum::debug_handler]
pub async fn pending_exams(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ensure_can_access(&user, user_id)?;

    let service = MedicalExamService::new(state.db.clone());
    let exams = service.find_pending_by_user_id(user_id).await?;
    Ok(Json(json!(exams)))
}

#[axum::debug_handler]
pub async fn update_exam_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateExamStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let service = MedicalExamService::new(state.db.clone());
    let exam = service.update_status(id, request).await?;
    Ok(Json(json!(exam)))
}

// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::{AuthUser, Role};
use shared_models::error::AppError;

use crate::models::{
    Attendance, CancelRequest, CreateScheduleRequest, Schedule, StartAttendanceRequest,
    UpdateAttendanceRequest, UpdateScheduleRequest,
};
use crate::services::{AttendanceService, ScheduleService};

fn ensure_can_access(user: &AuthUser, owner_id: Uuid) -> Result<(), AppError> {
    if user.can_access_user_data(owner_id) {
        Ok(())
    } else {
        warn!("User {} denied access to records of {}", user.id, owner_id);
        Err(AppError::Forbidden("Access denied".to_string()))
    }
}

/// Cancellation bodies are optional; an empty body means no reason.
fn cancel_reason(body: &Bytes) -> Result<Option<String>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let request: CancelRequest = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?;
    Ok(request.reason)
}

async fn load_schedule_for(
    service: &ScheduleService,
    user: &AuthUser,
    schedule_id: Uuid,
) -> Result<Schedule, AppError> {
    let schedule = service.get_schedule(schedule_id).await?;
    ensure_can_access(user, schedule.user_id)?;
    Ok(schedule)
}

async fn load_attendance_for(
    service: &AttendanceService,
    user: &AuthUser,
    attendance_id: Uuid,
) -> Result<Attendance, AppError> {
    let attendance = service.get_attendance(attendance_id).await?;
    ensure_can_access(user, attendance.patient_id)?;
    Ok(attendance)
}

// ==============================================================================
// SCHEDULE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_schedules(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(state.db.clone());
    let schedules = service.list_schedules().await?;
    Ok(Json(json!(schedules)))
}

#[axum::debug_handler]
pub async fn get_user_schedules(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ensure_can_access(&user, user_id)?;

    let service = ScheduleService::new(state.db.clone());
    let schedules = service.find_by_user(user_id).await?;
    Ok(Json(json!(schedules)))
}

#[axum::debug_handler]
pub async fn get_doctor_schedules(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(state.db.clone());
    let schedules = service.find_by_doctor(doctor_id).await?;
    Ok(Json(json!(schedules)))
}

#[axum::debug_handler]
pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(schedule_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(state.db.clone());
    let schedule = load_schedule_for(&service, &user, schedule_id).await?;
    Ok(Json(json!(schedule)))
}

#[axum::debug_handler]
pub async fn create_schedule(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    // Patients book only for themselves.
    if user.role == Role::Paciente && request.user_id != user.id {
        return Err(AppError::Forbidden("Patients can only book their own appointments".to_string()));
    }

    let service = ScheduleService::new(state.db.clone());
    let schedule = service.create_schedule(request).await?;
    Ok((StatusCode::CREATED, Json(json!(schedule))))
}

#[axum::debug_handler]
pub async fn update_schedule(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(schedule_id): Path<Uuid>,
    Json(request): Json<UpdateScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(state.db.clone());
    load_schedule_for(&service, &user, schedule_id).await?;

    let schedule = service.update_schedule(schedule_id, request).await?;
    Ok(Json(json!(schedule)))
}

#[axum::debug_handler]
pub async fn cancel_schedule(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(schedule_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let reason = cancel_reason(&body)?;

    let service = ScheduleService::new(state.db.clone());
    load_schedule_for(&service, &user, schedule_id).await?;

    let schedule = service.cancel_schedule(schedule_id, reason).await?;
    Ok(Json(json!(schedule)))
}

#[axum::debug_handler]
pub async fn confirm_schedule(
    State(state): State<Arc<AppState>>,
    Path(schedule_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(state.db.clone());
    let schedule = service.confirm_schedule(schedule_id).await?;
    Ok(Json(json!(schedule)))
}

#[axum::debug_handler]
pub async fn complete_schedule(
    State(state): State<Arc<AppState>>,
    Path(schedule_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(state.db.clone());
    let schedule = service.complete_schedule(schedule_id).await?;
    Ok(Json(json!(schedule)))
}

// ==============================================================================
// ATTENDANCE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_attendances(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let service = AttendanceService::new(state.db.clone());
    let attendances = service.list_attendances().await?;
    Ok(Json(json!(attendances)))
}

#[axum::debug_handler]
pub async fn start_attendance(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartAttendanceRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = AttendanceService::new(state.db.clone());
    let attendance = service.start_attendance(request).await?;
    Ok((StatusCode::CREATED, Json(json!(attendance))))
}

#[axum::debug_handler]
pub async fn get_schedule_attendance(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(schedule_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AttendanceService::new(state.db.clone());
    let attendance = service
        .find_by_schedule(schedule_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Attendance not found".to_string()))?;
    ensure_can_access(&user, attendance.patient_id)?;
    Ok(Json(json!(attendance)))
}

#[axum::debug_handler]
pub async fn get_patient_attendances(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ensure_can_access(&user, patient_id)?;

    let service = AttendanceService::new(state.db.clone());
    let attendances = service.find_by_patient(patient_id).await?;
    Ok(Json(json!(attendances)))
}

#[axum::debug_handler]
pub async fn get_attendance(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(attendance_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AttendanceService::new(state.db.clone());
    let attendance = load_attendance_for(&service, &user, attendance_id).await?;
    Ok(Json(json!(attendance)))
}

#[axum::debug_handler]
pub async fn get_attendance_summary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(attendance_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AttendanceService::new(state.db.clone());
    let summary = service.get_summary(attendance_id).await?;
    ensure_can_access(&user, summary.attendance.patient_id)?;
    Ok(Json(json!(summary)))
}

#[axum::debug_handler]
pub async fn update_attendance(
    State(state): State<Arc<AppState>>,
    Path(attendance_id): Path<Uuid>,
    Json(request): Json<UpdateAttendanceRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AttendanceService::new(state.db.clone());
    let attendance = service.update_attendance(attendance_id, request).await?;
    Ok(Json(json!(attendance)))
}

#[axum::debug_handler]
pub async fn complete_attendance(
    State(state): State<Arc<AppState>>,
    Path(attendance_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AttendanceService::new(state.db.clone());
    let attendance = service.complete_attendance(attendance_id).await?;
    Ok(Json(json!(attendance)))
}

#[axum::debug_handler]
pub async fn cancel_attendance(
    State(state): State<Arc<AppState>>,
    Path(attendance_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let reason = cancel_reason(&body)?;

    let service = AttendanceService::new(state.db.clone());
    let attendance = service.cancel_attendance(attendance_id, reason).await?;
    Ok(Json(json!(attendance)))
}

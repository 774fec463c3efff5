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

use crate::models::{
    AssignSpecialtiesRequest, CreateSpecialtyRequest, CreateUserRequest, UpdateUserRequest, UserError,
};
use crate::services::{RoleService, SpecialtyService, UserService};

fn ensure_can_access(user: &AuthUser, user_id: Uuid) -> Result<(), AppError> {
    if user.can_access_user_data(user_id) {
        Ok(())
    } else {
        warn!("User {} denied access to account {}", user.id, user_id);
        Err(AppError::Forbidden("Access denied".to_string()))
    }
}

// ==============================================================================
// USERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let service = UserService::new(state.db.clone());
    let users = service.list_users().await?;
    Ok(Json(json!(users)))
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let service = UserService::new(state.db.clone());
    let doctors = service.list_doctors().await?;
    Ok(Json(json!(doctors)))
}

#[axum::debug_handler]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ensure_can_access(&user, user_id)?;

    let service = UserService::new(state.db.clone());
    let account = service.get_user(user_id).await?;
    Ok(Json(json!(account)))
}

#[axum::debug_handler]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = UserService::new(state.db.clone());
    let account = service.create_user(request).await?;
    Ok((StatusCode::CREATED, Json(json!(account))))
}

#[axum::debug_handler]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        if user.id != user_id {
            return Err(AppError::Forbidden("Access denied".to_string()));
        }
        if request.touches_privileged_fields() {
            return Err(UserError::PrivilegedUpdate.into());
        }
    }

    let service = UserService::new(state.db.clone());
    let account = service.update_user(user_id, request).await?;
    Ok(Json(json!(account)))
}

#[axum::debug_handler]
pub async fn deactivate_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = UserService::new(state.db.clone());
    let account = service.deactivate_user(user_id).await?;
    Ok(Json(json!(account)))
}

#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if user.id == user_id {
        return Err(AppError::BadRequest("Administrators cannot delete their own account".to_string()));
    }

    let service = UserService::new(state.db.clone());
    service.delete_user(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// ROLES
// ==============================================================================

#[axum::debug_handler]
pub async fn list_roles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let service = RoleService::new(state.db.clone());
    let roles = service.list_roles().await?;
    Ok(Json(json!(roles)))
}

#[axum::debug_handler]
pub async fn get_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = RoleService::new(state.db.clone());
    let role = service.get_role(id).await?;
    Ok(Json(json!(role)))
}

// ==============================================================================
// SPECIALTIES
// ==============================================================================

#[axum::debug_handler]
pub async fn list_specialties(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let service = SpecialtyService::new(state.db.clone());
    let specialties = service.list_specialties().await?;
    Ok(Json(json!(specialties)))
}

#[axum::debug_handler]
pub async fn create_specialty(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateSpecialtyRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = SpecialtyService::new(state.db.clone());
    let specialty = service.create_specialty(request).await?;
    Ok((StatusCode::CREATED, Json(json!(specialty))))
}

#[axum::debug_handler]
pub async fn assign_specialties(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AssignSpecialtiesRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SpecialtyService::new(state.db.clone());
    let user = service.assign_specialties(request).await?;
    Ok(Json(json!(user)))
}

#[axum::debug_handler]
pub async fn list_users_with_specialties(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let service = SpecialtyService::new(state.db.clone());
    let users = service.users_with_specialties().await?;
    Ok(Json(json!(users)))
}

use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;

use shared_database::AppState;
use shared_models::auth::{AuthUser, TokenResponse};
use shared_models::error::AppError;
use shared_utils::jwt::validate_token;
use user_cell::services::UserService;

use crate::models::{AuthResponse, GoogleLoginRequest, LoginRequest};
use crate::services::AuthService;

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let service = AuthService::new(state.config.clone(), state.db.clone());
    let response = service.login_with_credentials(request).await?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn google_login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GoogleLoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if request.token.trim().is_empty() {
        return Err(AppError::BadRequest("Token is required".to_string()));
    }

    let service = AuthService::new(state.config.clone(), state.db.clone());
    let response = service.login_with_google(&request.token).await?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn verify_token(
    State(state): State<Arc<AppState>>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Verifying token");

    let TypedHeader(auth) =
        auth.ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let user = validate_token(auth.token(), &state.config.jwt_secret)
        .map_err(|e| AppError::Auth(e.to_string()))?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role: user.role,
    }))
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    debug!("Loading profile for user: {}", user.id);

    let service = UserService::new(state.db.clone());
    let account = service.get_user(user.id).await?;
    Ok(Json(json!(account)))
}

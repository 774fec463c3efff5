use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use shared_database::AppState;
use shared_models::auth::{ADMIN_ROLES, STAFF_ROLES};
use shared_utils::extractor::{auth_middleware, require_roles};

use crate::handlers;

pub fn user_routes(state: Arc<AppState>) -> Router {
    let authenticated = Router::new()
        .route("/doctors", get(handlers::list_doctors))
        .route("/{id}", get(handlers::get_user).put(handlers::update_user));

    let staff = Router::new()
        .route("/", get(handlers::list_users))
        .route_layer(middleware::from_fn_with_state(STAFF_ROLES, require_roles));

    let admin = Router::new()
        .route("/", post(handlers::create_user))
        .route("/{id}", delete(handlers::delete_user))
        .route("/{id}/deactivate", patch(handlers::deactivate_user))
        .route_layer(middleware::from_fn_with_state(ADMIN_ROLES, require_roles));

    Router::new()
        .merge(authenticated)
        .merge(staff)
        .merge(admin)
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

pub fn role_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_roles))
        .route("/{id}", get(handlers::get_role))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

pub fn specialty_routes(state: Arc<AppState>) -> Router {
    let authenticated = Router::new().route("/", get(handlers::list_specialties));

    let staff = Router::new()
        .route("/users", get(handlers::list_users_with_specialties))
        .route_layer(middleware::from_fn_with_state(STAFF_ROLES, require_roles));

    let admin = Router::new()
        .route("/", post(handlers::create_specialty))
        .route("/assign", post(handlers::assign_specialties))
        .route_layer(middleware::from_fn_with_state(ADMIN_ROLES, require_roles));

    Router::new()
        .merge(authenticated)
        .merge(staff)
        .merge(admin)
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};

use shared_database::AppState;
use shared_models::auth::{CLINICAL_ROLES, STAFF_ROLES};
use shared_utils::extractor::{auth_middleware, require_roles};

use crate::handlers;

pub fn schedule_routes(state: Arc<AppState>) -> Router {
    // Ownership is checked in the handlers for these.
    let authenticated = Router::new()
        .route("/", post(handlers::create_schedule))
        .route("/user/{user_id}", get(handlers::get_user_schedules))
        .route("/{id}", get(handlers::get_schedule).put(handlers::update_schedule))
        .route("/{id}/cancel", patch(handlers::cancel_schedule));

    let staff = Router::new()
        .route("/", get(handlers::list_schedules))
        .route("/doctor/{doctor_id}", get(handlers::get_doctor_schedules))
        .route("/{id}/confirm", patch(handlers::confirm_schedule))
        .route_layer(middleware::from_fn_with_state(STAFF_ROLES, require_roles));

    let clinical = Router::new()
        .route("/{id}/complete", patch(handlers::complete_schedule))
        .route_layer(middleware::from_fn_with_state(CLINICAL_ROLES, require_roles));

    Router::new()
        .merge(authenticated)
        .merge(staff)
        .merge(clinical)
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

pub fn attendance_routes(state: Arc<AppState>) -> Router {
    let authenticated = Router::new()
        .route("/schedule/{schedule_id}", get(handlers::get_schedule_attendance))
        .route("/patient/{patient_id}", get(handlers::get_patient_attendances))
        .route("/{id}", get(handlers::get_attendance))
        .route("/{id}/summary", get(handlers::get_attendance_summary));

    let staff = Router::new()
        .route("/", get(handlers::list_attendances))
        .route_layer(middleware::from_fn_with_state(STAFF_ROLES, require_roles));

    let clinical = Router::new()
        .route("/start", post(handlers::start_attendance))
        .route("/{id}", put(handlers::update_attendance))
        .route("/{id}/complete", put(handlers::complete_attendance))
        .route("/{id}/cancel", put(handlers::cancel_attendance))
        .route_layer(middleware::from_fn_with_state(CLINICAL_ROLES, require_roles));

    Router::new()
        .merge(authenticated)
        .merge(staff)
        .merge(clinical)
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

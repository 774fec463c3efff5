use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::{attendance_routes, schedule_routes};
use auth_cell::router::auth_routes;
use clinical_records_cell::router::{
    allergy_routes, clinical_note_routes, medical_certificate_routes, medical_exam_routes,
    medication_routes, vital_signs_routes,
};
use inventory_cell::router::{manufacturer_routes, medicine_routes};
use shared_database::AppState;
use user_cell::router::{role_routes, specialty_routes, user_routes};

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/users", user_routes(state.clone()))
        .nest("/roles", role_routes(state.clone()))
        .nest("/specialties", specialty_routes(state.clone()))
        .nest("/schedule", schedule_routes(state.clone()))
        .nest("/attendance", attendance_routes(state.clone()))
        .nest("/vital-signs", vital_signs_routes(state.clone()))
        .nest("/allergies", allergy_routes(state.clone()))
        .nest("/medications", medication_routes(state.clone()))
        .nest("/clinical-notes", clinical_note_routes(state.clone()))
        .nest("/medical-exams", medical_exam_routes(state.clone()))
        .nest("/medical-certificates", medical_certificate_routes(state.clone()))
        .nest("/medicamentos", medicine_routes(state.clone()))
        .nest("/fabricantes", manufacturer_routes(state))
}

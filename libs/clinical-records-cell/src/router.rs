// libs/clinical-records-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};

use shared_database::AppState;
use shared_models::auth::CLINICAL_ROLES;
use shared_utils::extractor::{auth_middleware, require_roles};

use crate::handlers;
use crate::models::{
    Allergy, ClinicalNote, ClinicalRecord, MedicalCertificate, MedicalExam, Medication, VitalSigns,
};

type RecordRouter = Router<Arc<AppState>>;

/// Reads (owner or staff) and writes (clinical roles) every record kind has.
fn record_routes<R: ClinicalRecord>() -> (RecordRouter, RecordRouter) {
    let reads = Router::new()
        .route("/user/{user_id}", get(handlers::list_by_user::<R>))
        .route("/attendance/{attendance_id}", get(handlers::list_by_attendance::<R>))
        .route("/{id}", get(handlers::get_record::<R>));

    let writes = Router::new()
        .route("/", post(handlers::create_record::<R>))
        .route(
            "/{id}",
            put(handlers::update_record::<R>).delete(handlers::delete_record::<R>),
        );

    (reads, writes)
}

fn finish(state: Arc<AppState>, reads: RecordRouter, writes: RecordRouter) -> Router {
    let writes = writes.route_layer(middleware::from_fn_with_state(CLINICAL_ROLES, require_roles));

    Router::new()
        .merge(reads)
        .merge(writes)
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

pub fn vital_signs_routes(state: Arc<AppState>) -> Router {
    let (reads, writes) = record_routes::<VitalSigns>();
    let reads = reads.route("/user/{user_id}/latest", get(handlers::latest_vital_signs));
    finish(state, reads, writes)
}

pub fn allergy_routes(state: Arc<AppState>) -> Router {
    let (reads, writes) = record_routes::<Allergy>();
    let reads = reads.route("/user/{user_id}/active", get(handlers::active_allergies));
    let writes = writes.route("/{id}/deactivate", put(handlers::deactivate_allergy));
    finish(state, reads, writes)
}

pub fn medication_routes(state: Arc<AppState>) -> Router {
    let (reads, writes) = record_routes::<Medication>();
    let reads = reads.route("/user/{user_id}/active", get(handlers::active_medications));
    let writes = writes.route("/{id}/deactivate", put(handlers::deactivate_medication));
    finish(state, reads, writes)
}

pub fn clinical_note_routes(state: Arc<AppState>) -> Router {
    let (reads, writes) = record_routes::<ClinicalNote>();
    let reads = reads.route("/user/{user_id}/type/{note_type}", get(handlers::notes_by_type));
    finish(state, reads, writes)
}

pub fn medical_exam_routes(state: Arc<AppState>) -> Router {
    let (reads, writes) = record_routes::<MedicalExam>();
    let reads = reads.route("/user/{user_id}/pending", get(handlers::pending_exams));
    let writes = writes.route("/{id}/status", patch(handlers::update_exam_status));
    finish(state, reads, writes)
}

pub fn medical_certificate_routes(state: Arc<AppState>) -> Router {
    let (reads, writes) = record_routes::<MedicalCertificate>();
    finish(state, reads, writes)
}

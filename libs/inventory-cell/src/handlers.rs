// libs/inventory-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::error::AppError;

use crate::models::{
    CreateManufacturerRequest, CreateMedicineRequest, ExpiryQuery, ManufacturerQuery, NameQuery,
    StockAdjustmentRequest, UpdateManufacturerRequest, UpdateMedicineRequest,
};
use crate::services::{ManufacturerService, MedicineService};

// ==============================================================================
// MEDICINE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_medicines(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let service = MedicineService::new(state.db.clone());
    let medicines = service.list().await?;
    Ok(Json(json!(medicines)))
}

#[axum::debug_handler]
pub async fn search_by_name(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NameQuery>,
) -> Result<Json<Value>, AppError> {
    let service = MedicineService::new(state.db.clone());
    let medicines = service.search_by_name(&query.nome).await?;
    Ok(Json(json!(medicines)))
}

#[axum::debug_handler]
pub async fn search_by_manufacturer(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ManufacturerQuery>,
) -> Result<Json<Value>, AppError> {
    let service = MedicineService::new(state.db.clone());
    let medicines = service.search_by_manufacturer(&query.fabricante).await?;
    Ok(Json(json!(medicines)))
}

#[axum::debug_handler]
pub async fn expiring_medicines(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExpiryQuery>,
) -> Result<Json<Value>, AppError> {
    let service = MedicineService::new(state.db.clone());
    let medicines = service.expiring_within(query.dias).await?;
    Ok(Json(json!(medicines)))
}

#[axum::debug_handler]
pub async fn low_stock_medicines(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let service = MedicineService::new(state.db.clone());
    let medicines = service.low_stock().await?;
    Ok(Json(json!(medicines)))
}

#[axum::debug_handler]
pub async fn stock_report(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let service = MedicineService::new(state.db.clone());
    let report = service.stock_report().await?;
    Ok(Json(json!(report)))
}

#[axum::debug_handler]
pub async fn get_medicine(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = MedicineService::new(state.db.clone());
    let medicine = service.get(id).await?;
    Ok(Json(json!(medicine)))
}

#[axum::debug_handler]
pub async fn create_medicine(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateMedicineRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = MedicineService::new(state.db.clone());
    let medicine = service.create(request).await?;
    Ok((StatusCode::CREATED, Json(json!(medicine))))
}

#[axum::debug_handler]
pub async fn update_medicine(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateMedicineRequest>,
) -> Result<Json<Value>, AppError> {
    let service = MedicineService::new(state.db.clone());
    let medicine = service.update(id, request).await?;
    Ok(Json(json!(medicine)))
}

#[axum::debug_handler]
pub async fn adjust_stock(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<StockAdjustmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = MedicineService::new(state.db.clone());
    let medicine = service.adjust_stock(id, request.quantity).await?;
    Ok(Json(json!(medicine)))
}

#[axum::debug_handler]
pub async fn delete_medicine(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = MedicineService::new(state.db.clone());
    service.deactivate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// MANUFACTURER HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_manufacturers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let service = ManufacturerService::new(state.db.clone());
    let manufacturers = service.list().await?;
    Ok(Json(json!(manufacturers)))
}

#[axum::debug_handler]
pub async fn get_manufacturer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = ManufacturerService::new(state.db.clone());
    let manufacturer = service.get(id).await?;
    Ok(Json(json!(manufacturer)))
}

#[axum::debug_handler]
pub async fn create_manufacturer(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateManufacturerRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = ManufacturerService::new(state.db.clone());
    let manufacturer = service.create(request).await?;
    Ok((StatusCode::CREATED, Json(json!(manufacturer))))
}

#[axum::debug_handler]
pub async fn update_manufacturer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateManufacturerRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ManufacturerService::new(state.db.clone());
    let manufacturer = service.update(id, request).await?;
    Ok(Json(json!(manufacturer)))
}

#[axum::debug_handler]
pub async fn delete_manufacturer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = ManufacturerService::new(state.db.clone());
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// libs/inventory-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_database::AppState;
use shared_models::auth::{ADMIN_ROLES, STAFF_ROLES};
use shared_utils::extractor::{auth_middleware, require_roles};

use crate::handlers;

pub fn medicine_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_medicines).post(handlers::create_medicine))
        .route("/nome", get(handlers::search_by_name))
        .route("/fabricante", get(handlers::search_by_manufacturer))
        .route("/vencimento", get(handlers::expiring_medicines))
        .route("/estoque-baixo", get(handlers::low_stock_medicines))
        .route("/relatorio", get(handlers::stock_report))
        .route(
            "/{id}",
            get(handlers::get_medicine)
                .put(handlers::update_medicine)
                .delete(handlers::delete_medicine),
        )
        .route("/{id}/estoque", put(handlers::adjust_stock))
        .route_layer(middleware::from_fn_with_state(STAFF_ROLES, require_roles))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

pub fn manufacturer_routes(state: Arc<AppState>) -> Router {
    let reads = Router::new()
        .route("/", get(handlers::list_manufacturers))
        .route("/{id}", get(handlers::get_manufacturer))
        .route_layer(middleware::from_fn_with_state(STAFF_ROLES, require_roles));

    let writes = Router::new()
        .route("/", post(handlers::create_manufacturer))
        .route(
            "/{id}",
            put(handlers::update_manufacturer).delete(handlers::delete_manufacturer),
        )
        .route_layer(middleware::from_fn_with_state(ADMIN_ROLES, require_roles));

    Router::new()
        .merge(reads)
        .merge(writes)
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

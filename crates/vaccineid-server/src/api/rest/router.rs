//! Router creation and configuration

use super::handlers::*;
use super::types::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create REST API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/patient", get(get_patient).post(create_patient))
        .route("/patient/search", post(search_patients))
        .route("/patient/:id/record", post(add_record))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

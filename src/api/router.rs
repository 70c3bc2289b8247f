//! Route table and middleware assembly.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::app::AppState;

use super::handlers::{
    ApiDoc, get_task_handler, health_check_handler, liveness_handler, readiness_handler,
    submit_tx_handler, system_status_handler, tx_status_by_hash_handler,
};

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/tx/send", post(submit_tx_handler))
        .route("/tx/{id}", get(get_task_handler))
        .route("/tx/{id}/status", get(tx_status_by_hash_handler))
        .route("/health", get(health_check_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .route("/status", get(system_status_handler))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

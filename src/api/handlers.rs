//! HTTP request handlers with OpenAPI documentation.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::{OpenApi, ToSchema};

use crate::app::AppState;
use crate::domain::{
    AppError, ChainError, ChainTxStatus, ErrorDetail, ErrorResponse, HealthResponse, HealthStatus,
    StoreError, SystemStatus, TaskStatus, TransferRequest,
};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ethereum Transfer Relayer API",
        version = "0.1.0",
        description = "API for submitting transfers to a queue-backed relayer and tracking their on-chain status",
        license(
            name = "MIT"
        )
    ),
    paths(
        submit_tx_handler,
        get_task_handler,
        tx_status_by_hash_handler,
        health_check_handler,
        liveness_handler,
        readiness_handler,
        system_status_handler,
    ),
    components(
        schemas(
            TransferRequest,
            TaskStatus,
            ChainTxStatus,
            SubmitTxResponse,
            AlreadyAcceptedResponse,
            TaskStatusResponse,
            TxHashStatusResponse,
            HealthResponse,
            HealthStatus,
            SystemStatus,
            ErrorResponse,
            ErrorDetail,
        )
    ),
    tags(
        (name = "tx", description = "Transfer submission and tracking endpoints"),
        (name = "health", description = "Health check endpoints")
    )
)]
pub struct ApiDoc;

/// Response for a newly accepted submission
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitTxResponse {
    /// Identifier to poll for the task's evolving state
    pub task_id: String,
    /// Always `queued` at acceptance time
    pub status: TaskStatus,
}

/// Response replayed for a duplicate idempotency key
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AlreadyAcceptedResponse {
    /// Task created by the original submission
    pub task_id: String,
    #[schema(example = "already accepted")]
    pub message: String,
}

/// Current view of a task; fields not yet known are empty strings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskStatusResponse {
    pub task_id: String,
    /// Transaction hash, empty until the transfer is broadcast
    #[schema(example = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b")]
    pub tx_hash: String,
    /// Task status, empty until the dispatch worker picks the task up
    #[schema(example = "sent")]
    pub status: String,
}

/// Chain-side status for a known transaction hash
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TxHashStatusResponse {
    pub hash: String,
    /// `null` while the chain has no authoritative answer yet
    pub status: Option<ChainTxStatus>,
}

/// Submit a transfer for asynchronous dispatch
///
/// Requires an `Idempotency-Key` header. The transfer is validated, assigned
/// a task id, and enqueued; broadcasting and confirmation tracking happen in
/// the background. Re-submitting under the same key within the 24h retention
/// window replays the original task id without enqueuing anything.
///
/// **Response indicates acceptance, not broadcast.** Poll `GET /tx/{id}` to
/// track the status progression
/// `queued → processing → {sent → {confirmed|failed|pending}} | failed_to_send`.
#[utoipa::path(
    post,
    path = "/tx/send",
    tag = "tx",
    request_body = TransferRequest,
    params(
        ("Idempotency-Key" = String, Header, description = "Caller-supplied token deduplicating retried submissions")
    ),
    responses(
        (status = 202, description = "Transfer accepted and enqueued", body = SubmitTxResponse),
        (status = 200, description = "Duplicate idempotency key; original task replayed", body = AlreadyAcceptedResponse),
        (status = 400, description = "Missing idempotency key or invalid request", body = ErrorResponse),
        (status = 503, description = "Work queue unavailable", body = ErrorResponse)
    )
)]
pub async fn submit_tx_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<TransferRequest>,
) -> Result<axum::response::Response, AppError> {
    let idempotency_key = headers
        .get("Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let ticket = state
        .service
        .submit_transfer(idempotency_key, &payload)
        .await?;

    let response = if ticket.accepted {
        (
            StatusCode::ACCEPTED,
            Json(SubmitTxResponse {
                task_id: ticket.task_id,
                status: TaskStatus::Queued,
            }),
        )
            .into_response()
    } else {
        (
            StatusCode::OK,
            Json(AlreadyAcceptedResponse {
                task_id: ticket.task_id,
                message: "already accepted".to_string(),
            }),
        )
            .into_response()
    };

    Ok(response)
}

/// Get the tracked state of a task
///
/// Tolerant of unknown ids: a task that is not yet processed, or whose
/// records have expired, comes back with empty fields rather than a 404.
#[utoipa::path(
    get,
    path = "/tx/{id}",
    tag = "tx",
    params(
        ("id" = String, Path, description = "Task identifier returned by the submit endpoint")
    ),
    responses(
        (status = 200, description = "Current task view", body = TaskStatusResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn get_task_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskStatusResponse>, AppError> {
    let view = state.service.task_status(&id).await?;
    Ok(Json(TaskStatusResponse {
        task_id: view.task_id,
        tx_hash: view.tx_hash.unwrap_or_default(),
        status: view.status.map(|s| s.to_string()).unwrap_or_default(),
    }))
}

/// Get the chain-side status of a transaction by hash
///
/// Bypasses the task abstraction and queries the chain client directly.
#[utoipa::path(
    get,
    path = "/tx/{id}/status",
    tag = "tx",
    params(
        ("id" = String, Path, description = "Transaction hash")
    ),
    responses(
        (status = 200, description = "Chain status; null while unconfirmed", body = TxHashStatusResponse),
        (status = 502, description = "Chain client error", body = ErrorResponse)
    )
)]
pub async fn tx_status_by_hash_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TxHashStatusResponse>, AppError> {
    let status = state.service.tx_status_by_hash(&id).await?;
    Ok(Json(TxHashStatusResponse { hash: id, status }))
}

/// Detailed health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Health status", body = HealthResponse)
    )
)]
pub async fn health_check_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.service.health_check().await;
    Json(health)
}

/// Kubernetes liveness probe
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses(
        (status = 200, description = "Application is alive")
    )
)]
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Kubernetes readiness probe
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "health",
    responses(
        (status = 200, description = "Application is ready to serve traffic"),
        (status = 503, description = "Application is not ready")
    )
)]
pub async fn readiness_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    let health = state.service.health_check().await;
    match health.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Aggregate system status: store reachability, queue depth, chain head
#[utoipa::path(
    get,
    path = "/status",
    tag = "health",
    responses(
        (status = 200, description = "System status", body = SystemStatus)
    )
)]
pub async fn system_status_handler(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    Json(state.service.system_status().await)
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_type, message) = match &self {
            AppError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                self.to_string(),
            ),
            AppError::QueueUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "queue_unavailable",
                self.to_string(),
            ),
            AppError::Store(store_err) => match store_err {
                StoreError::Connection(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "store_error",
                    self.to_string(),
                ),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "store_error",
                    self.to_string(),
                ),
            },
            AppError::Chain(chain_err) => match chain_err {
                ChainError::Connection(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "chain_error",
                    self.to_string(),
                ),
                _ => (StatusCode::BAD_GATEWAY, "chain_error", self.to_string()),
            },
            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration_error",
                self.to_string(),
            ),
            AppError::Serialization(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "serialization_error",
                self.to_string(),
            ),
        };

        if status.is_server_error() {
            error!(error_type = %error_type, message = %message, "Server error");
        }

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                r#type: error_type.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}

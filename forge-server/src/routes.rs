//! HTTP route handlers for the generation API.

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use forge::core::types::{AppSpec, LogEntry, ProjectRecord, StepRecord};
use forge::metrics::MetricsSnapshot;
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::sse;
use crate::state::AppState;

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/generate-app", post(generate_app))
        .route("/projects/{id}", get(get_project))
        .route("/projects/{id}/steps", get(get_steps))
        .route("/projects/{id}/logs", get(get_logs))
        .route("/projects/{id}/execute", post(execute_project))
        .route("/projects/{id}/events", get(sse::events_handler))
        .route("/metrics", get(get_metrics))
}

/// Uniform error body: `{"error": true, "message": "..."}`.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(err: &anyhow::Error) -> Self {
        error!(error = %format!("{err:#}"), "request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({"error": true, "message": self.message}));
        (self.status, body).into_response()
    }
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Serialize)]
struct GenerateResponse {
    project_id: String,
    status: forge::core::types::ProjectStatus,
    logs: Vec<LogEntry>,
}

/// POST /api/v1/generate-app - create a project and start generation.
async fn generate_app(
    State(state): State<AppState>,
    Json(spec): Json<AppSpec>,
) -> Result<Json<GenerateResponse>, ApiError> {
    if let Err(message) = spec.validate() {
        return Err(ApiError::bad_request(message));
    }
    let started = state
        .service
        .start_generation(&spec)
        .await
        .map_err(|err| ApiError::internal(&err))?;
    Ok(Json(GenerateResponse {
        project_id: started.project_id,
        status: started.status,
        logs: started.logs,
    }))
}

/// GET /api/v1/projects/:id - project document.
async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProjectRecord>, ApiError> {
    state
        .service
        .project(&id)
        .map(Json)
        .map_err(|_| ApiError::not_found(format!("project {id} not found")))
}

/// GET /api/v1/projects/:id/steps - steps in execution order.
async fn get_steps(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StepRecord>>, ApiError> {
    state.service.project(&id).map_err(|_| {
        ApiError::not_found(format!("project {id} not found"))
    })?;
    state
        .service
        .steps(&id)
        .map(Json)
        .map_err(|err| ApiError::internal(&err))
}

/// GET /api/v1/projects/:id/logs - full log history.
async fn get_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<LogEntry>>, ApiError> {
    state.service.project(&id).map_err(|_| {
        ApiError::not_found(format!("project {id} not found"))
    })?;
    state
        .service
        .logs(&id)
        .map(Json)
        .map_err(|err| ApiError::internal(&err))
}

#[derive(Serialize)]
struct ExecuteResponse {
    scheduled: bool,
}

/// POST /api/v1/projects/:id/execute - trigger pending step execution.
async fn execute_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    state.service.project(&id).map_err(|_| {
        ApiError::not_found(format!("project {id} not found"))
    })?;
    let scheduled = state
        .service
        .execute_pending(&id)
        .map_err(|err| ApiError::internal(&err))?;
    Ok(Json(ExecuteResponse { scheduled }))
}

/// GET /api/v1/metrics - process-local counters.
async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

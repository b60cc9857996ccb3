//! HTTP route handlers for the code server.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};

use super::error::ApiError;
use super::metrics::{Metrics, Operation};
use super::response::{CodeStatusResponse, InfoResponse, IssueResponse};
use crate::{CodeDb, CodeStatus};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<CodeDb>,
    pub metrics: Arc<Metrics>,
}

/// Handle GET /api/v1/code
pub async fn handle_issue(
    State(state): State<AppState>,
) -> Result<Json<IssueResponse>, ApiError> {
    let result = state.db.next().await;
    state.metrics.record(Operation::Issue, &result);

    let code = result?;
    state.metrics.codes_issued.inc();
    Ok(Json(IssueResponse::success(code)))
}

/// Handle GET /api/v1/info
pub async fn handle_info(State(state): State<AppState>) -> Result<Json<InfoResponse>, ApiError> {
    let result = state.db.capacity().await;
    state.metrics.record(Operation::Info, &result);

    let capacity = result?;
    Ok(Json(InfoResponse::success(&capacity)))
}

/// Handle PUT /api/v1/code/{code}
pub async fn handle_dump(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<CodeStatusResponse>, ApiError> {
    let result = state.db.dump(&code).await;
    state.metrics.record(Operation::Dump, &result);

    result?;
    state.metrics.codes_dumped.inc();
    Ok(Json(CodeStatusResponse::success(code, CodeStatus::Dumped)))
}

/// Handle GET /api/v1/code/{code}
pub async fn handle_status(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<CodeStatusResponse>, ApiError> {
    let result = state.db.status(&code).await;
    state.metrics.record(Operation::Status, &result);

    let status = result?;
    Ok(Json(CodeStatusResponse::success(code, status)))
}

/// Handle GET /-/healthy
pub async fn handle_healthy() -> &'static str {
    "OK"
}

/// Handle GET /metrics
pub async fn handle_metrics(State(state): State<AppState>) -> String {
    state.metrics.encode()
}

//! Submission and readiness endpoints (§4.7 "Background dispatch buffer").

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::api::AppState;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub accepted: bool,
}

/// POST /submit: enqueue one file for analysis. Returns as soon as the
/// track has been handed to the scheduler, not when it finishes —
/// progress is observed via `GET /events`.
pub async fn submit(State(state): State<AppState>, Json(req): Json<SubmitRequest>) -> ApiResult<Json<SubmitResponse>> {
    if req.path.as_os_str().is_empty() {
        return Err(ApiError::BadRequest("path must not be empty".to_string()));
    }
    let _handle = state.scheduler.submit(req.path);
    Ok(Json(SubmitResponse { accepted: true }))
}

/// POST /ready: signal that the UI is attached and watching `/events`,
/// releasing any submissions buffered behind the readiness watchdog.
pub async fn mark_ready(State(state): State<AppState>) -> Json<SubmitResponse> {
    state.scheduler.signal_ready();
    Json(SubmitResponse { accepted: true })
}

pub fn submit_routes() -> Router<AppState> {
    Router::new()
        .route("/submit", post(submit))
        .route("/ready", post(mark_ready))
}

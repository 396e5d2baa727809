//! Per-component error types (§7). Each is caught at its phase boundary
//! and converted to a status string on the record rather than propagated;
//! only [`ProbeError`] is fatal for a track (§7 table) and only
//! [`StoreError`] is fatal for a store write.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe process exited with status {0}")]
    NonZeroExit(i32),
    #[error("probe produced invalid data: {0}")]
    InvalidData(String),
    #[error("probe process failed to start: {0}")]
    Spawn(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum TagError {
    #[error("tag read failed: {0}")]
    ReadFailed(String),
}

#[derive(Debug, Error)]
pub enum TempoError {
    #[error("tempo estimation produced no candidate")]
    NoEstimate,
    #[error("decode error: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum CreativeError {
    #[error("LLM server offline: {0}")]
    Offline(String),
    #[error("configured model not present on server")]
    ModelMissing,
    #[error("could not parse LLM response as JSON")]
    ParseError,
}

impl CreativeError {
    /// The `creative_status` string surfaced on the record (§4.4, §6).
    pub fn status_str(&self) -> &'static str {
        match self {
            CreativeError::Offline(_) => "offline",
            CreativeError::ModelMissing => "model_missing",
            CreativeError::ParseError => "parse_error",
        }
    }
}

#[derive(Debug, Error)]
pub enum EnsembleError {
    #[error("classifier process failed: {0}")]
    Spawn(String),
    #[error("classifier output could not be parsed: {0}")]
    ParseError(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// API error type for the readiness/progress HTTP surface (§4, §6 ambient
/// addition) — not part of THE CORE, but needed to drive it end to end.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
        };
        let body = Json(json!({"error": {"code": code, "message": message}}));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

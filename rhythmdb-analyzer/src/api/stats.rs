//! Scheduler statistics endpoint, surfaced alongside the event stream for
//! a UI that polls rather than subscribes.

use axum::{extract::State, routing::get, Json, Router};

use crate::api::AppState;
use crate::orchestrator::statistics::StatsSnapshot;

pub async fn stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.scheduler.stats())
}

pub fn stats_routes() -> Router<AppState> {
    Router::new().route("/stats", get(stats))
}

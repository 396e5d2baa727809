//! HTTP surface (§4, §6 ambient addition): readiness, progress streaming,
//! and health — the outer shell driving the scheduler, not part of the
//! core pipeline itself.

pub mod health;
pub mod stats;
pub mod sse;
pub mod submit;

use axum::Router;
use std::sync::Arc;

use crate::orchestrator::Scheduler;

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
}

pub fn router(scheduler: Arc<Scheduler>) -> Router {
    let state = AppState { scheduler };
    Router::new()
        .merge(health::health_routes())
        .merge(sse::sse_routes())
        .merge(submit::submit_routes())
        .merge(stats::stats_routes())
        .with_state(state)
}

//! Server-sent progress stream (§4.7, §7): forwards [`AnalysisEvent`]s from
//! the scheduler's [`EventBus`] to any number of subscribers, with a
//! heartbeat comment so idle connections aren't reaped by intermediaries.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, warn};

use crate::api::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

pub async fn event_stream(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.scheduler.event_bus().subscribe();

    let stream = async_stream::stream! {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {
                    yield Ok(Event::default().comment("heartbeat"));
                }
                event = rx.recv() => {
                    match event {
                        Ok(event) => match serde_json::to_string(&event) {
                            Ok(json) => yield Ok(Event::default().data(json)),
                            Err(e) => warn!("failed to serialize analysis event: {e}"),
                        },
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            debug!("SSE subscriber lagged by {n} events");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(HEARTBEAT_INTERVAL).text("heartbeat"))
}

pub fn sse_routes() -> Router<AppState> {
    Router::new().route("/events", get(event_stream))
}

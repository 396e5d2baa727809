//! Progress event vocabulary and broadcast bus (§4.7, §7).
//!
//! Mirrors the teacher's `EventBus`/`WkmpEvent` pattern: a single
//! broadcast channel of a tagged enum, cloned cheaply and subscribed to by
//! any number of consumers (the SSE handler, tests, a CLI progress bar).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Which of the three phases an event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Technical,
    Creative,
    Instrumentation,
}

/// Per-phase status, surfaced to the UI (§7 "user-visible behavior").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PhaseStatus {
    Processing,
    Complete,
    Error,
}

/// Events the scheduler broadcasts while processing a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AnalysisEvent {
    /// A phase transitioned for a track.
    PhaseStatus {
        file: String,
        stage: Stage,
        status: PhaseStatus,
        /// Human-readable note (e.g. a `creative_status` cause string).
        note: Option<String>,
    },
    /// Fine-grained progress within a phase. `pct` is one of
    /// `{0, 25, 50, 75, 100}` per spec.md §4.7.
    Progress { file: String, pct: u8, label: String },
    /// The scheduler observed the partial (technical-only) record for a
    /// track become available.
    PartialReady { file: String },
    /// The scheduler persisted the final merged record for a track.
    Merged { file: String },
}

/// Broadcast bus for [`AnalysisEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AnalysisEvent>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity (events older than
    /// the capacity are dropped for slow subscribers, never for the bus).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, dropping it silently if there are no subscribers.
    pub fn emit_lossy(&self, event: AnalysisEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_emitted_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        bus.emit_lossy(AnalysisEvent::Progress {
            file: "a.mp3".into(),
            pct: 25,
            label: "technical".into(),
        });
        let event = rx.recv().await.unwrap();
        matches!(event, AnalysisEvent::Progress { .. });
    }
}

//! Scheduler statistics (§4.7), grounded on the teacher's
//! `workflow_orchestrator::statistics` module — a small set of atomic
//! counters with a `display_string` surfaced to the UI, rather than a
//! `Mutex`-guarded struct that would serialize every phase transition.

use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct SchedulerStats {
    queued: AtomicUsize,
    technical_running: AtomicUsize,
    technical_done: AtomicUsize,
    creative_done: AtomicUsize,
    instrumentation_done: AtomicUsize,
    merged: AtomicUsize,
    probe_failed: AtomicUsize,
}

impl SchedulerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_technical_running(&self) {
        self.technical_running.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_technical_done(&self) {
        self.technical_done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_creative_done(&self) {
        self.creative_done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_instrumentation_done(&self) {
        self.instrumentation_done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_merged(&self) {
        self.merged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_probe_failed(&self) {
        self.probe_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            queued: self.queued.load(Ordering::Relaxed),
            technical_running: self.technical_running.load(Ordering::Relaxed),
            technical_done: self.technical_done.load(Ordering::Relaxed),
            creative_done: self.creative_done.load(Ordering::Relaxed),
            instrumentation_done: self.instrumentation_done.load(Ordering::Relaxed),
            merged: self.merged.load(Ordering::Relaxed),
            probe_failed: self.probe_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StatsSnapshot {
    pub queued: usize,
    pub technical_running: usize,
    pub technical_done: usize,
    pub creative_done: usize,
    pub instrumentation_done: usize,
    pub merged: usize,
    pub probe_failed: usize,
}

impl StatsSnapshot {
    pub fn display_string(&self) -> String {
        format!("{} merged of {} queued ({} probe failures)", self.merged, self.queued, self.probe_failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let stats = SchedulerStats::new();
        stats.inc_queued();
        stats.inc_queued();
        stats.inc_merged();
        let snap = stats.snapshot();
        assert_eq!(snap.queued, 2);
        assert_eq!(snap.merged, 1);
    }
}

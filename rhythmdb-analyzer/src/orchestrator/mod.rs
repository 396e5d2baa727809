//! Phase scheduler (C7, §4.7): three bounded pools (Technical, Creative,
//! Instrumentation), per-track ordering, and progress events. Modeled per
//! spec.md §9's redesign note: three worker pools consuming from typed
//! channels, with per-track state owned by a single task that drives the
//! phase machine and publishes progress through the shared [`EventBus`].
//! Concurrency shape grounded on the teacher's `workflow_orchestrator`
//! (`tokio_util::sync::CancellationToken` propagated into every suspension
//! point, `tokio::spawn` per unit of work, a dedicated stats module).

pub mod phase_creative;
pub mod phase_instrumentation;
pub mod phase_technical;
pub mod statistics;

use rhythmdb_common::config::{SchedulerMode, Settings};
use rhythmdb_common::events::{AnalysisEvent, EventBus, PhaseStatus, Stage};
use rhythmdb_common::models::TrackRecord;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::services::audio_probes::AudioProbes;
use crate::services::creative_client::CreativeClient;
use crate::services::ensemble_client::EnsembleClient;
use crate::services::probe::ContainerProbe;
use crate::services::tags::TagReader;
use crate::store::LibraryStore;

/// A submission resolves twice: once with the technical-only partial
/// record, once with the final merged record (§9 redesign note).
#[derive(Debug, Clone)]
pub enum TrackEvent {
    Partial(TrackRecord),
    Final(TrackRecord),
}

/// Handle returned by [`Scheduler::submit`]; the caller awaits on `rx` for
/// the partial then final event, or drops it to stop listening (the
/// scheduler keeps running regardless — `rx` is an observation channel,
/// not a control one).
pub struct SubmissionHandle {
    pub rx: mpsc::Receiver<TrackEvent>,
    pub cancel: CancellationToken,
}

/// Background dispatch readiness gate (§4.7 "Background dispatch buffer"):
/// submissions queue until the UI signals readiness or a 5s watchdog fires.
const READINESS_WATCHDOG: Duration = Duration::from_secs(5);

pub struct Scheduler {
    settings: Settings,
    event_bus: EventBus,
    store: Arc<LibraryStore>,
    probe: Arc<ContainerProbe>,
    tags: Arc<TagReader>,
    audio_probes: Arc<AudioProbes>,
    creative_client: Arc<CreativeClient>,
    ensemble_client: Arc<EnsembleClient>,
    tech_sem: Arc<Semaphore>,
    creative_sem: Arc<Semaphore>,
    instr_sem: Arc<Semaphore>,
    stats: Arc<statistics::SchedulerStats>,
    ready: Arc<AtomicBool>,
    ready_notify: Arc<Notify>,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new(settings: Settings, store: Arc<LibraryStore>) -> Self {
        let concurrency = settings.concurrency;
        Self {
            event_bus: EventBus::default(),
            store,
            probe: Arc::new(ContainerProbe::new(settings.probe_binary.clone())),
            tags: Arc::new(TagReader::new()),
            audio_probes: Arc::new(AudioProbes::new(settings.probe_binary.clone())),
            creative_client: Arc::new(CreativeClient::new(settings.llm_endpoint.clone(), settings.llm_model.clone())),
            ensemble_client: Arc::new(EnsembleClient::new(settings.ensemble_binary.clone())),
            tech_sem: Arc::new(Semaphore::new(concurrency)),
            creative_sem: Arc::new(Semaphore::new(concurrency)),
            instr_sem: Arc::new(Semaphore::new(concurrency)),
            stats: Arc::new(statistics::SchedulerStats::new()),
            ready: Arc::new(AtomicBool::new(false)),
            ready_notify: Arc::new(Notify::new()),
            shutdown: CancellationToken::new(),
            settings,
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn stats(&self) -> statistics::StatsSnapshot {
        self.stats.snapshot()
    }

    /// Signal that the UI (or caller) is ready to observe progress events;
    /// unblocks any buffered submissions immediately instead of waiting out
    /// the watchdog.
    pub fn signal_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
        self.ready_notify.notify_waiters();
    }

    async fn wait_for_readiness(&self) {
        if self.ready.load(Ordering::SeqCst) {
            return;
        }
        let _ = tokio::time::timeout(READINESS_WATCHDOG, self.ready_notify.notified()).await;
    }

    /// Submit one file for analysis. Returns immediately with a handle the
    /// caller can drain for the partial-then-final events.
    pub fn submit(self: &Arc<Self>, path: PathBuf) -> SubmissionHandle {
        let (tx, rx) = mpsc::channel(2);
        let cancel = self.shutdown.child_token();
        let scheduler = Arc::clone(self);
        let track_cancel = cancel.clone();

        self.stats.inc_queued();
        tokio::spawn(async move {
            scheduler.run_track(path, tx, track_cancel).await;
        });

        SubmissionHandle { rx, cancel }
    }

    async fn run_track(&self, path: PathBuf, tx: mpsc::Sender<TrackEvent>, cancel: CancellationToken) {
        self.wait_for_readiness().await;
        if cancel.is_cancelled() {
            return;
        }

        let Some(mut record) = self.run_technical_phase(&path, &cancel).await else {
            return;
        };

        let _ = tx.send(TrackEvent::Partial(record.clone())).await;
        self.event_bus.emit_lossy(AnalysisEvent::PartialReady { file: record.file.clone() });

        self.run_background_phases(&path, &mut record, &cancel).await;

        if cancel.is_cancelled() {
            return;
        }

        if let Err(err) = self.store.upsert_and_persist(record.clone()).await {
            tracing::error!(file = %record.file, error = %err, "store upsert failed");
            return;
        }
        if let Err(err) = crate::writer::write_per_file_json(&path, &record, self.waveform_dir().as_deref()) {
            tracing::error!(file = %record.file, error = %err, "per-file write failed");
        }

        self.stats.inc_merged();
        self.event_bus.emit_lossy(AnalysisEvent::Merged { file: record.file.clone() });
        let _ = tx.send(TrackEvent::Final(record)).await;
    }

    fn waveform_dir(&self) -> Option<PathBuf> {
        Some(self.settings.db_folder.join("waveforms"))
    }

    async fn run_technical_phase(&self, path: &Path, cancel: &CancellationToken) -> Option<TrackRecord> {
        let _permit = tokio::select! {
            permit = self.tech_sem.acquire() => permit.ok()?,
            _ = cancel.cancelled() => return None,
        };

        self.stats.inc_technical_running();
        self.event_bus.emit_lossy(AnalysisEvent::PhaseStatus {
            file: path.to_string_lossy().to_string(),
            stage: Stage::Technical,
            status: PhaseStatus::Processing,
            note: None,
        });

        let services = phase_technical::TechnicalServices {
            probe: &self.probe,
            tags: &self.tags,
            audio_probes: &self.audio_probes,
        };

        match phase_technical::run(path, &services).await {
            Ok(record) => {
                self.stats.inc_technical_done();
                self.event_bus.emit_lossy(AnalysisEvent::PhaseStatus {
                    file: record.file.clone(),
                    stage: Stage::Technical,
                    status: PhaseStatus::Complete,
                    note: None,
                });
                Some(record)
            }
            Err(err) => {
                self.stats.inc_probe_failed();
                self.event_bus.emit_lossy(AnalysisEvent::PhaseStatus {
                    file: path.to_string_lossy().to_string(),
                    stage: Stage::Technical,
                    status: PhaseStatus::Error,
                    note: Some(err.to_string()),
                });
                None
            }
        }
    }

    async fn run_background_phases(&self, path: &Path, record: &mut TrackRecord, cancel: &CancellationToken) {
        match self.settings.mode {
            SchedulerMode::Concurrent => {
                let creative_fut = self.run_creative(record.clone(), cancel);
                let instr_fut = self.run_instrumentation(path, record.clone(), cancel);
                let (creative, instrumentation) = tokio::join!(creative_fut, instr_fut);
                apply_creative(record, creative);
                apply_instrumentation(record, instrumentation);
                // Instrumentation ran concurrently with Creative, so its view of
                // `creative.genre` may have been empty; re-derive the elevation
                // now that the merge above made the genre set final.
                record.analysis.electronic_elements = phase_instrumentation::elevate_electronic_elements(
                    record.analysis.electronic_elements.clone(),
                    &record.creative.genre,
                );
            }
            SchedulerMode::Sequential => {
                let creative = self.run_creative(record.clone(), cancel).await;
                apply_creative(record, creative);
                let instrumentation = self.run_instrumentation(path, record.clone(), cancel).await;
                apply_instrumentation(record, instrumentation);
            }
        }
    }

    async fn run_creative(&self, mut record: TrackRecord, cancel: &CancellationToken) -> Option<TrackRecord> {
        let _permit = tokio::select! {
            permit = self.creative_sem.acquire() => permit.ok()?,
            _ = cancel.cancelled() => return None,
        };
        self.event_bus.emit_lossy(AnalysisEvent::PhaseStatus {
            file: record.file.clone(),
            stage: Stage::Creative,
            status: PhaseStatus::Processing,
            note: None,
        });
        phase_creative::run(&mut record, &self.creative_client, &[]).await;
        self.stats.inc_creative_done();
        self.event_bus.emit_lossy(AnalysisEvent::PhaseStatus {
            file: record.file.clone(),
            stage: Stage::Creative,
            status: PhaseStatus::Complete,
            note: Some(record.creative_status.clone()),
        });
        Some(record)
    }

    async fn run_instrumentation(&self, path: &Path, mut record: TrackRecord, cancel: &CancellationToken) -> Option<TrackRecord> {
        let _permit = tokio::select! {
            permit = self.instr_sem.acquire() => permit.ok()?,
            _ = cancel.cancelled() => return None,
        };
        self.event_bus.emit_lossy(AnalysisEvent::PhaseStatus {
            file: record.file.clone(),
            stage: Stage::Instrumentation,
            status: PhaseStatus::Processing,
            note: None,
        });
        phase_instrumentation::run(&mut record, path, &self.ensemble_client, self.settings.use_demucs).await;
        self.stats.inc_instrumentation_done();
        self.event_bus.emit_lossy(AnalysisEvent::PhaseStatus {
            file: record.file.clone(),
            stage: Stage::Instrumentation,
            status: PhaseStatus::Complete,
            note: None,
        });
        Some(record)
    }

    /// Graceful shutdown (§4.7, §5): cancel all in-flight and queued work.
    /// Callers that hold a [`SubmissionHandle`] observe no further events.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

fn apply_creative(record: &mut TrackRecord, result: Option<TrackRecord>) {
    if let Some(r) = result {
        record.creative = r.creative;
        record.creative_status = r.creative_status;
    }
}

fn apply_instrumentation(record: &mut TrackRecord, result: Option<TrackRecord>) {
    if let Some(r) = result {
        record.analysis = r.analysis;
    }
}

//! End-to-end exercise of the phase scheduler (C7) through the public
//! crate surface: submission ordering, the readiness watchdog, and
//! shutdown/cancellation. All three external adapters (ffprobe, the
//! ensemble classifier, the LLM endpoint) are pointed at addresses/binaries
//! that cannot succeed, so every sub-step takes its documented
//! never-fails-the-track degraded path (§4.2, §4.4, §4.5) and the test
//! stays hermetic.

use rhythmdb_analyzer::orchestrator::{Scheduler, TrackEvent};
use rhythmdb_analyzer::store::LibraryStore;
use rhythmdb_common::config::{SchedulerMode, Settings};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn test_settings(db_folder: PathBuf) -> Settings {
    Settings {
        db_folder,
        concurrency: 2,
        mode: SchedulerMode::Concurrent,
        llm_endpoint: "http://127.0.0.1:1/api/chat".to_string(),
        llm_model: "llama3".to_string(),
        ensemble_binary: PathBuf::from("/nonexistent/ensemble-classifier"),
        probe_binary: PathBuf::from("/nonexistent/ffprobe"),
        probe_timeout_secs: 15,
        use_demucs: false,
    }
}

fn write_tone(path: &std::path::Path) {
    let spec = hound::WavSpec { channels: 1, sample_rate: 44_100, bits_per_sample: 16, sample_format: hound::SampleFormat::Int };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..44_100 {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();
}

async fn new_scheduler(db_dir: &TempDir) -> Arc<Scheduler> {
    let store = Arc::new(LibraryStore::open(db_dir.path()).await.unwrap());
    let scheduler = Arc::new(Scheduler::new(test_settings(db_dir.path().to_path_buf()), store));
    scheduler.signal_ready();
    scheduler
}

/// spec.md §8 scenario 6: the partial (technical-only) event always
/// precedes the final (merged) event for the same submission.
#[tokio::test]
async fn submit_emits_partial_before_final() {
    let db_dir = TempDir::new().unwrap();
    let audio_dir = TempDir::new().unwrap();
    let path = audio_dir.path().join("track.wav");
    write_tone(&path);

    let scheduler = new_scheduler(&db_dir).await;
    let mut handle = scheduler.submit(path);

    let first = handle.rx.recv().await.expect("partial event");
    assert!(matches!(first, TrackEvent::Partial(_)), "expected Partial first, got {first:?}");

    let second = handle.rx.recv().await.expect("final event");
    assert!(matches!(second, TrackEvent::Final(_)), "expected Final second, got {second:?}");
}

/// spec.md §8 scenario 2: LLM offline degrades `creative` to defaults with
/// a `creative_status` cause string, but Instrumentation still runs and the
/// record still reaches the store with its technical facts intact.
#[tokio::test]
async fn llm_offline_degrades_creative_but_still_persists_the_track() {
    let db_dir = TempDir::new().unwrap();
    let audio_dir = TempDir::new().unwrap();
    let path = audio_dir.path().join("track.wav");
    write_tone(&path);

    let scheduler = new_scheduler(&db_dir).await;
    let mut handle = scheduler.submit(path);

    let _partial = handle.rx.recv().await.expect("partial event");
    let TrackEvent::Final(record) = handle.rx.recv().await.expect("final event") else {
        panic!("expected Final event");
    };

    assert_eq!(record.creative_status, "offline");
    assert_eq!(record.creative, rhythmdb_common::models::CreativeFacts::default());
    assert!(record.technical.sample_rate_hz > 0);

    let snapshot = scheduler.stats();
    assert_eq!(snapshot.merged, 1);
}

/// §4.7 "Background dispatch buffer": without a [`Scheduler::signal_ready`]
/// call, a submission still completes once the watchdog fires.
#[tokio::test]
async fn readiness_watchdog_releases_buffered_submissions() {
    let db_dir = TempDir::new().unwrap();
    let audio_dir = TempDir::new().unwrap();
    let path = audio_dir.path().join("track.wav");
    write_tone(&path);

    let store = Arc::new(LibraryStore::open(db_dir.path()).await.unwrap());
    let scheduler = Arc::new(Scheduler::new(test_settings(db_dir.path().to_path_buf()), store));
    // Deliberately not calling signal_ready(): the submission must still
    // complete once the watchdog timeout elapses.

    let mut handle = scheduler.submit(path);
    let result = tokio::time::timeout(Duration::from_secs(8), async {
        handle.rx.recv().await;
        handle.rx.recv().await
    })
    .await;

    assert!(result.is_ok(), "submission never completed within the watchdog bound");
    assert!(matches!(result.unwrap(), Some(TrackEvent::Final(_))));
}

/// [`Scheduler::shutdown`] cancels in-flight work; a handle obtained before
/// shutdown observes no further events.
#[tokio::test]
async fn shutdown_cancels_in_flight_submission() {
    let db_dir = TempDir::new().unwrap();
    let audio_dir = TempDir::new().unwrap();
    let path = audio_dir.path().join("track.wav");
    write_tone(&path);

    let scheduler = new_scheduler(&db_dir).await;
    let mut handle = scheduler.submit(path);
    scheduler.shutdown();

    let result = tokio::time::timeout(Duration::from_secs(2), handle.rx.recv()).await;
    match result {
        Ok(Some(event)) => assert!(matches!(event, TrackEvent::Partial(_)), "unexpected event after shutdown: {event:?}"),
        Ok(None) => {}
        Err(_) => panic!("cancellation never observed within bound"),
    }
}

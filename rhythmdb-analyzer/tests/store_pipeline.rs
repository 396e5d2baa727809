//! End-to-end exercise of the persistence layer (C8/C9) through the public
//! crate surface: upsert, per-file write, and criteria rebuild acting on
//! the same `TrackRecord` the Technical phase would hand off.

use chrono::Utc;
use rhythmdb_analyzer::store::LibraryStore;
use rhythmdb_analyzer::writer::write_per_file_json;
use rhythmdb_common::models::{TagMap, TechnicalFacts, TrackKey, TrackRecord};
use tempfile::TempDir;

fn technical_record(path: &str, bpm: Option<u32>, artist: Option<&str>) -> TrackRecord {
    let key = TrackKey::derive(path);
    let technical = TechnicalFacts {
        duration_sec: 180.5,
        sample_rate_hz: 44_100,
        channels: 2,
        bit_rate: Some(320_000),
        codec: "mp3".to_string(),
        has_wav_version: false,
        tags: TagMap { artist: artist.map(str::to_string), ..TagMap::default() },
        bpm,
        bpm_source: None,
        bpm_alt_half: None,
        bpm_alt_double: None,
        bpm_estimated: None,
    };
    TrackRecord::from_technical(key, path.to_string(), "song.mp3".to_string(), technical, Utc::now())
}

#[tokio::test]
async fn upserting_case_variant_paths_collapses_to_one_entry_and_rebuilds_criteria() {
    // spec.md §8 scenario 5
    let dir = TempDir::new().unwrap();
    let store = LibraryStore::open(dir.path()).await.unwrap();

    store.upsert_and_persist(technical_record("/Music/Song.mp3", Some(120), Some("Artist A"))).await.unwrap();
    let snapshot = store.snapshot().await;
    let first_created_at = snapshot.tracks.values().next().unwrap().created_at;

    store.upsert_and_persist(technical_record("/music/Song.MP3", Some(121), Some("Artist A"))).await.unwrap();
    let snapshot = store.snapshot().await;

    assert_eq!(snapshot.tracks.len(), 1);
    let entry = snapshot.tracks.values().next().unwrap();
    assert_eq!(entry.created_at, first_created_at);
    assert!(entry.updated_at >= first_created_at);
    assert_eq!(entry.technical.bpm, Some(121));

    let criteria_raw = tokio::fs::read_to_string(dir.path().join("CriteriaDB.json")).await.unwrap();
    let criteria: rhythmdb_common::models::CriteriaStore = serde_json::from_str(&criteria_raw).unwrap();
    assert_eq!(criteria.artists, vec!["Artist A".to_string()]);
}

#[tokio::test]
async fn per_file_document_reflects_the_persisted_record() {
    let dir = TempDir::new().unwrap();
    let audio_dir = TempDir::new().unwrap();
    let audio_path = audio_dir.path().join("track.mp3");
    std::fs::write(&audio_path, b"not real audio, just a placeholder").unwrap();

    let record = technical_record(&audio_path.to_string_lossy(), Some(128), Some("Artist B"));
    let waveform_dir = dir.path().join("waveforms");
    let waveform = write_per_file_json(&audio_path, &record, Some(&waveform_dir)).unwrap();

    assert!(waveform.is_some());
    let json_path = audio_path.with_extension("json");
    assert!(json_path.exists());

    let contents = std::fs::read_to_string(&json_path).unwrap();
    let doc: rhythmdb_common::models::PerFileDocument = serde_json::from_str(&contents).unwrap();
    assert_eq!(doc.bpm, Some(128));
}

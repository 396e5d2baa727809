//! Library store (C9, §4.9, §5): single-writer-per-file main store and
//! criteria store, each guarded by its own exclusive lock, persisted with
//! the tmp-and-rename pattern from [`crate::writer`].

pub mod criteria_store;
pub mod main_store;

use rhythmdb_common::models::{MainStore, TrackRecord};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::writer::write_atomic_json;

pub struct LibraryStore {
    main_store_path: PathBuf,
    criteria_store_path: PathBuf,
    main: Mutex<MainStore>,
}

impl LibraryStore {
    /// Load (or initialize empty) both store files rooted at `db_folder`.
    pub async fn open(db_folder: &Path) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(db_folder).await?;
        let main_store_path = db_folder.join("RhythmDB.json");
        let criteria_store_path = db_folder.join("CriteriaDB.json");

        let main = match tokio::fs::read_to_string(&main_store_path).await {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(_) => MainStore::default(),
        };

        Ok(Self { main_store_path, criteria_store_path, main: Mutex::new(main) })
    }

    /// Upsert `record`, persist the main store, then rebuild and persist
    /// the criteria store (§4.9: upsert and rebuild each take their own
    /// exclusive lock — sequenced here since a single writer drives both).
    pub async fn upsert_and_persist(&self, record: TrackRecord) -> Result<(), StoreError> {
        let mut guard = self.main.lock().await;
        main_store::upsert(&mut guard, record);
        write_atomic_json(&self.main_store_path, &*guard)?;

        let criteria = criteria_store::rebuild(&guard);
        write_atomic_json(&self.criteria_store_path, &criteria)?;
        Ok(())
    }

    /// Clone the current in-memory main store, mainly for tests and the
    /// stats endpoint's callers that want a consistent read.
    pub async fn snapshot(&self) -> MainStore {
        self.main.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rhythmdb_common::models::{TagMap, TechnicalFacts, TrackKey};
    use tempfile::TempDir;

    fn record(path: &str) -> TrackRecord {
        let key = TrackKey::derive(path);
        let technical = TechnicalFacts {
            duration_sec: 120.0,
            sample_rate_hz: 44_100,
            channels: 2,
            bit_rate: Some(192_000),
            codec: "mp3".into(),
            has_wav_version: false,
            tags: TagMap::default(),
            bpm: Some(120),
            bpm_source: None,
            bpm_alt_half: None,
            bpm_alt_double: None,
            bpm_estimated: None,
        };
        TrackRecord::from_technical(key, path.to_string(), "song.mp3".to_string(), technical, Utc::now())
    }

    #[tokio::test]
    async fn upsert_and_persist_writes_both_store_files() {
        let dir = TempDir::new().unwrap();
        let store = LibraryStore::open(dir.path()).await.unwrap();
        store.upsert_and_persist(record("/a.mp3")).await.unwrap();

        assert!(dir.path().join("RhythmDB.json").exists());
        assert!(dir.path().join("CriteriaDB.json").exists());
    }

    #[tokio::test]
    async fn reopening_loads_prior_state() {
        let dir = TempDir::new().unwrap();
        {
            let store = LibraryStore::open(dir.path()).await.unwrap();
            store.upsert_and_persist(record("/a.mp3")).await.unwrap();
        }
        let reopened = LibraryStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.snapshot().await.tracks.len(), 1);
    }
}

//! Per-track writer (C8, §4.8) and the shared atomic-write primitive used
//! by both the per-file JSON and the two library stores (§5: "write to
//! `*.tmp`, fsync, rename").

use chrono::Utc;
use rhythmdb_common::models::{PerFileDocument, TrackRecord};
use std::path::Path;

use crate::error::StoreError;

/// Serialize `value` and write it to `path` atomically: write to a sibling
/// `.tmp` file, fsync, then rename over the destination. A reader never
/// observes a partially written file.
pub fn write_atomic_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let tmp_path = path.with_extension(match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{ext}.tmp"),
        None => "tmp".to_string(),
    });

    let contents = serde_json::to_vec_pretty(value)?;
    {
        let file = std::fs::File::create(&tmp_path)?;
        use std::io::Write;
        let mut file = file;
        file.write_all(&contents)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Derive the deterministic waveform cache filename: `<stem>-<hash10>.png`
/// (§5 "Waveform cache directory").
pub fn waveform_filename(path: &Path) -> String {
    let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    let hash = short_path_hash(&path.to_string_lossy());
    format!("{stem}-{hash}.png")
}

fn short_path_hash(input: &str) -> String {
    // FNV-1a, truncated to 10 hex chars: deterministic, no extra crate needed
    // for a cache-filename disambiguator (not a security boundary).
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in input.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    format!("{hash:016x}")[..10].to_string()
}

/// Assemble the authoritative per-file JSON projection (§6) from a finished
/// [`TrackRecord`] and write it beside the audio file atomically.
pub fn write_per_file_json(audio_path: &Path, record: &TrackRecord, waveform_dir: Option<&Path>) -> Result<Option<String>, StoreError> {
    let waveform_png = waveform_dir.map(|dir| dir.join(waveform_filename(audio_path)).to_string_lossy().to_string());

    let mut record = record.clone();
    record.waveform_png = waveform_png.clone();
    record.analyzed_at = Utc::now();

    let doc = PerFileDocument::from_record(&record);
    let json_path = audio_path.with_extension("json");
    write_atomic_json(&json_path, &doc)?;

    Ok(waveform_png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_atomic_json_leaves_no_tmp_file_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        write_atomic_json(&path, &serde_json::json!({"a": 1})).unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("out.json.tmp").exists());
    }

    #[test]
    fn waveform_filename_is_deterministic() {
        let path = Path::new("/music/Song.mp3");
        assert_eq!(waveform_filename(path), waveform_filename(path));
    }

    #[test]
    fn waveform_filename_differs_by_path() {
        assert_ne!(
            waveform_filename(Path::new("/music/a.mp3")),
            waveform_filename(Path::new("/music/b.mp3"))
        );
    }
}

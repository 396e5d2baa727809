//! Directory scanner (§6 "Supported audio extensions", §9 dependency table):
//! recursive discovery of `.mp3`/`.wav`/`.aif`/`.aiff` files, extension
//! pre-filter followed by magic-byte confirmation. Grounded on the teacher's
//! `file_scanner.rs` two-phase design, simplified to a single sequential
//! pass (no `rayon` dependency in this crate's stack) and `infer` in place
//! of the teacher's hand-rolled byte-pattern match.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("path not found: {0}")]
    NotFound(PathBuf),
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
}

const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "wav", "aif", "aiff"];

/// Recursively discover supported audio files under `root`. Entries that
/// fail to open or don't match an audio extension/magic are skipped, not
/// fatal to the scan as a whole.
pub fn scan(root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    if !root.exists() {
        return Err(ScanError::NotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if has_supported_extension(path) && looks_like_audio(path) {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

fn looks_like_audio(path: &Path) -> bool {
    match infer::get_from_path(path) {
        Ok(Some(kind)) => kind.matcher_type() == infer::MatcherType::Audio,
        // infer doesn't ship matchers for every container we accept (notably
        // plain AIFF); fall back to trusting the extension in that case.
        _ => true,
    }
}

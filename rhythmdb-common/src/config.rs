//! Configuration resolution: CLI → environment → TOML file → compiled
//! default, the same priority order as the teacher's `resolve_root_folder`.
//!
//! Mutable global state (logging mode, queue singletons) is deliberately
//! avoided (spec.md §9): everything the scheduler needs is collected into
//! one [`Settings`] value and passed to its constructor explicitly.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ordering mode for the phase scheduler (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerMode {
    Sequential,
    Concurrent,
}

impl Default for SchedulerMode {
    fn default() -> Self {
        SchedulerMode::Concurrent
    }
}

/// Resolved analyzer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Folder holding `RhythmDB.json`, `CriteriaDB.json`, and the waveform
    /// cache directory.
    pub db_folder: PathBuf,
    /// Degree of each of the three bounded work pools, `N ∈ [1,8]`.
    pub concurrency: usize,
    pub mode: SchedulerMode,
    /// Local chat-completion endpoint, e.g. `http://localhost:11434/api/chat`.
    pub llm_endpoint: String,
    pub llm_model: String,
    /// Path to the ensemble classifier executable.
    pub ensemble_binary: PathBuf,
    /// Path to the container/stream probe executable (ffprobe-compatible).
    pub probe_binary: PathBuf,
    /// Per-window probe timeout in seconds (§4.2).
    pub probe_timeout_secs: u64,
    /// Whether to request stem separation (demucs) from the ensemble.
    pub use_demucs: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_folder: default_db_folder(),
            concurrency: 4,
            mode: SchedulerMode::Concurrent,
            llm_endpoint: "http://localhost:11434/api/chat".to_string(),
            llm_model: "llama3".to_string(),
            ensemble_binary: PathBuf::from("ensemble-classifier"),
            probe_binary: PathBuf::from("ffprobe"),
            probe_timeout_secs: 15,
            use_demucs: false,
        }
    }
}

impl Settings {
    /// Clamp `concurrency` to the documented `[1,8]` bound.
    pub fn normalize(mut self) -> Self {
        self.concurrency = self.concurrency.clamp(1, 8);
        self
    }

    /// Resolve settings from, in priority order: an explicit TOML path (if
    /// given), the `RHYTHMDB_CONFIG` environment variable, the OS-default
    /// config directory, falling back to [`Settings::default`] for any
    /// field the file omits.
    pub fn resolve(explicit_toml: Option<&std::path::Path>) -> Result<Self> {
        let mut settings = Settings::default();

        if let Some(path) = explicit_toml.map(PathBuf::from).or_else(default_config_path) {
            if let Ok(contents) = std::fs::read_to_string(&path) {
                let file_settings: PartialSettings = toml::from_str(&contents)
                    .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
                file_settings.apply_onto(&mut settings);
            }
        }

        apply_env_overrides(&mut settings);
        Ok(settings.normalize())
    }
}

/// Mirror of [`Settings`] with every field optional, used to parse a
/// partial TOML file without requiring every key to be present.
#[derive(Debug, Default, Deserialize)]
struct PartialSettings {
    db_folder: Option<PathBuf>,
    concurrency: Option<usize>,
    mode: Option<SchedulerMode>,
    llm_endpoint: Option<String>,
    llm_model: Option<String>,
    ensemble_binary: Option<PathBuf>,
    probe_binary: Option<PathBuf>,
    probe_timeout_secs: Option<u64>,
    use_demucs: Option<bool>,
}

impl PartialSettings {
    fn apply_onto(self, settings: &mut Settings) {
        if let Some(v) = self.db_folder {
            settings.db_folder = v;
        }
        if let Some(v) = self.concurrency {
            settings.concurrency = v;
        }
        if let Some(v) = self.mode {
            settings.mode = v;
        }
        if let Some(v) = self.llm_endpoint {
            settings.llm_endpoint = v;
        }
        if let Some(v) = self.llm_model {
            settings.llm_model = v;
        }
        if let Some(v) = self.ensemble_binary {
            settings.ensemble_binary = v;
        }
        if let Some(v) = self.probe_binary {
            settings.probe_binary = v;
        }
        if let Some(v) = self.probe_timeout_secs {
            settings.probe_timeout_secs = v;
        }
        if let Some(v) = self.use_demucs {
            settings.use_demucs = v;
        }
    }
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(v) = std::env::var("RHYTHMDB_DB_FOLDER") {
        settings.db_folder = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("RHYTHMDB_CONCURRENCY") {
        if let Ok(n) = v.parse() {
            settings.concurrency = n;
        }
    }
    if let Ok(v) = std::env::var("RHYTHMDB_LLM_ENDPOINT") {
        settings.llm_endpoint = v;
    }
    if let Ok(v) = std::env::var("RHYTHMDB_LLM_MODEL") {
        settings.llm_model = v;
    }
}

fn default_config_path() -> Option<PathBuf> {
    if let Ok(v) = std::env::var("RHYTHMDB_CONFIG") {
        return Some(PathBuf::from(v));
    }
    dirs::config_dir().map(|d| d.join("rhythmdb").join("config.toml"))
}

fn default_db_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("rhythmdb"))
        .unwrap_or_else(|| PathBuf::from("./rhythmdb_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_concurrency_clamped() {
        let mut settings = Settings::default();
        settings.concurrency = 99;
        let normalized = settings.normalize();
        assert_eq!(normalized.concurrency, 8);
    }

    #[test]
    #[serial_test::serial]
    fn env_override_wins_over_default() {
        std::env::set_var("RHYTHMDB_LLM_MODEL", "custom-model");
        let mut settings = Settings::default();
        apply_env_overrides(&mut settings);
        assert_eq!(settings.llm_model, "custom-model");
        std::env::remove_var("RHYTHMDB_LLM_MODEL");
    }
}

//! Audio probes (C2, §4.2): windowed hint extraction used by the tempo
//! estimator's percussion/rock-bias logic and the creative prompt. Each
//! window is isolated and wall-clock bounded; an all-windows failure
//! degrades to `status=skipped` rather than failing the track. Timeout
//! isolation pattern grounded on the teacher's per-window bounded work in
//! `workflow_orchestrator` (probe pools with per-item timeouts).

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// Per-window probe timeout (§4.2, §5 "Timeouts").
pub const WINDOW_TIMEOUT_SECS: u64 = 15;
const NUM_WINDOWS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowResult {
    pub clap_top: Vec<LabelScore>,
    pub ast_labels: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioProbeResult {
    pub hints: HashMap<String, bool>,
    pub per_window: Vec<WindowResult>,
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
struct RawWindowOutput {
    #[serde(default)]
    clap_top: Vec<RawLabelScore>,
    #[serde(default)]
    ast_labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawLabelScore {
    label: String,
    score: f32,
}

pub struct AudioProbes {
    binary: std::path::PathBuf,
}

impl AudioProbes {
    pub fn new(binary: std::path::PathBuf) -> Self {
        Self { binary }
    }

    /// §4.2: `runAudioProbes(path, duration)`. Never errors; a complete
    /// failure across all windows yields an empty, `status="skipped"` result.
    pub async fn run(&self, path: &Path, duration_sec: f64) -> AudioProbeResult {
        let mut windows = Vec::new();
        for i in 0..NUM_WINDOWS {
            let start = duration_sec * i as f64 / NUM_WINDOWS as f64;
            match self.probe_window(path, start).await {
                Some(result) => windows.push(result),
                None => continue,
            }
        }

        if windows.is_empty() {
            return AudioProbeResult { hints: HashMap::new(), per_window: Vec::new(), status: "skipped" };
        }

        let hints = derive_hints(&windows);
        AudioProbeResult { hints, per_window: windows, status: "ok" }
    }

    async fn probe_window(&self, path: &Path, start_sec: f64) -> Option<WindowResult> {
        let fut = tokio::task::spawn_blocking({
            let binary = self.binary.clone();
            let path = path.to_path_buf();
            move || {
                Command::new(&binary)
                    .arg("--audio")
                    .arg(&path)
                    .arg("--start")
                    .arg(format!("{start_sec:.3}"))
                    .output()
            }
        });

        let result = tokio::time::timeout(Duration::from_secs(WINDOW_TIMEOUT_SECS), fut).await.ok()?.ok()?.ok()?;
        if !result.status.success() {
            return None;
        }
        let raw: RawWindowOutput = serde_json::from_slice(&result.stdout).ok()?;
        Some(WindowResult {
            clap_top: raw.clap_top.into_iter().map(|l| LabelScore { label: l.label, score: l.score }).collect(),
            ast_labels: raw.ast_labels,
        })
    }
}

/// Derive boolean hint labels (e.g. `drums`, `guitar`, `electric guitar`,
/// `brass`) from whether any window's top labels mention them.
fn derive_hints(windows: &[WindowResult]) -> HashMap<String, bool> {
    let mut hints = HashMap::new();
    let watched = ["drums", "guitar", "electric guitar", "brass"];
    for &label in &watched {
        let present = windows.iter().any(|w| {
            w.clap_top.iter().any(|ls| ls.label.eq_ignore_ascii_case(label))
                || w.ast_labels.iter().any(|l| l.eq_ignore_ascii_case(label))
        });
        hints.insert(label.to_string(), present);
    }
    hints
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_hints_detects_watched_labels_case_insensitively() {
        let windows = vec![WindowResult {
            clap_top: vec![LabelScore { label: "Drums".to_string(), score: 0.9 }],
            ast_labels: vec!["Electric Guitar".to_string()],
        }];
        let hints = derive_hints(&windows);
        assert_eq!(hints.get("drums"), Some(&true));
        assert_eq!(hints.get("electric guitar"), Some(&true));
        assert_eq!(hints.get("brass"), Some(&false));
    }

    #[test]
    fn derive_hints_false_when_no_window_mentions_label() {
        let windows = vec![WindowResult::default()];
        let hints = derive_hints(&windows);
        assert!(hints.values().all(|v| !*v));
    }
}

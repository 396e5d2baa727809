//! Ensemble adapter (C5): spawns the external classifier, parses its
//! output, applies the mix-only rescue. Subprocess-spawning shape grounded
//! on the teacher's `EssentiaClient::analyze_file` (`spawn_blocking` around
//! `std::process::Command`, temp-file JSON output, cleanup on both paths).

use rhythmdb_common::models::{DecisionTrace, ElectronicElements, EnsembleMode, InstrumentationFacts};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

use crate::error::EnsembleError;

/// Mix-only rescue thresholds (§4.5, §9 open question: "hard-coded and
/// tuned to a specific classifier distribution" — kept here as the single
/// place to recalibrate).
const RESCUE_MEAN_SUM_THRESHOLD: f32 = 0.006;
const RESCUE_POS_SUM_THRESHOLD: f32 = 0.02;
const RESCUE_POS_PANNS_SOLO_THRESHOLD: f32 = 0.06;
const RESCUE_MAX_CANDIDATES: usize = 4;

/// Fixed candidate set the rescue considers, in classifier-internal label
/// form; [`rescue_display_name`] maps to the display taxonomy.
const RESCUE_CANDIDATES: &[&str] = &[
    "electric_guitar",
    "acoustic_guitar",
    "bass_guitar",
    "drum_kit",
    "piano",
    "organ",
    "brass",
    "strings",
];

fn rescue_display_name(label: &str) -> &'static str {
    match label {
        "electric_guitar" => "Electric Guitar",
        "acoustic_guitar" => "Acoustic Guitar",
        "bass_guitar" => "Bass Guitar",
        "drum_kit" => "Drum Kit (acoustic)",
        "piano" => "Piano",
        "organ" => "Organ",
        "brass" => "Brass",
        "strings" => "Strings",
        other => unreachable!("unexpected rescue candidate {other}"),
    }
}

#[derive(Debug, Deserialize)]
struct RawEnsembleOutput {
    #[serde(default)]
    instruments: Vec<String>,
    #[serde(default)]
    used_demucs: bool,
    #[serde(default = "default_mode")]
    mode: EnsembleMode,
    #[serde(default)]
    decision_trace: DecisionTrace,
    #[serde(default)]
    electronic_elements: Option<ElectronicElements>,
}

fn default_mode() -> EnsembleMode {
    EnsembleMode::MixOnly
}

pub struct EnsembleClient {
    binary: std::path::PathBuf,
}

/// Result of one ensemble invocation, before finalization (C6).
pub struct EnsembleResult {
    pub raw_instruments: Vec<String>,
    pub rescued_instruments: Vec<String>,
    pub facts: InstrumentationFacts,
}

impl EnsembleClient {
    pub fn new(binary: std::path::PathBuf) -> Self {
        Self { binary }
    }

    /// Run the classifier on `audio_path`, never failing the track: a
    /// spawn/parse error resolves to an empty-instruments result with
    /// [`InstrumentationFacts::default`] (§4.5 "never throws").
    pub async fn analyze(&self, audio_path: &Path, use_demucs: bool) -> EnsembleResult {
        match self.run(audio_path, use_demucs).await {
            Ok(output) => {
                let mut facts = InstrumentationFacts {
                    raw_labels: output.instruments.clone(),
                    decision_trace: output.decision_trace,
                    used_demucs: output.used_demucs,
                    mode: output.mode,
                    electronic_elements: output.electronic_elements,
                };
                apply_boosts(&mut facts);

                let rescued = if output.instruments.is_empty() && !output.used_demucs {
                    mix_only_rescue(&facts.decision_trace)
                } else {
                    Vec::new()
                };

                EnsembleResult {
                    raw_instruments: facts.raw_labels.clone(),
                    rescued_instruments: rescued,
                    facts,
                }
            }
            Err(_) => EnsembleResult {
                raw_instruments: Vec::new(),
                rescued_instruments: Vec::new(),
                facts: InstrumentationFacts::default(),
            },
        }
    }

    async fn run(&self, audio_path: &Path, use_demucs: bool) -> Result<RawEnsembleOutput, EnsembleError> {
        let output_path = std::env::temp_dir().join(format!("rhythmdb-ensemble-{}.json", uuid::Uuid::new_v4()));

        let status = tokio::task::spawn_blocking({
            let binary = self.binary.clone();
            let audio = audio_path.to_path_buf();
            let out = output_path.clone();
            move || {
                Command::new(&binary)
                    .arg("--audio")
                    .arg(&audio)
                    .arg("--json-out")
                    .arg(&out)
                    .arg("--demucs")
                    .arg(if use_demucs { "1" } else { "0" })
                    .output()
            }
        })
        .await
        .map_err(|e| EnsembleError::Spawn(format!("task join error: {e}")))?
        .map_err(|e| EnsembleError::Spawn(e.to_string()))?;

        if !status.status.success() {
            let _ = std::fs::remove_file(&output_path);
            return Err(EnsembleError::Spawn(format!(
                "exit code {:?}: {}",
                status.status.code(),
                String::from_utf8_lossy(&status.stderr)
            )));
        }

        let contents = tokio::fs::read_to_string(&output_path)
            .await
            .map_err(|e| EnsembleError::ParseError(e.to_string()))?;
        let _ = tokio::fs::remove_file(&output_path).await;

        serde_json::from_str(&contents).map_err(|e| EnsembleError::ParseError(e.to_string()))
    }
}

/// Merge `decision_trace.boosts.*.added` labels not already present in
/// `raw_labels` (§4.5 "Booster merge").
fn apply_boosts(facts: &mut InstrumentationFacts) {
    for boost in facts.decision_trace.boosts.values() {
        for label in &boost.added {
            if !facts.raw_labels.contains(label) {
                facts.raw_labels.push(label.clone());
            }
        }
    }
}

/// Mix-only rescue (§4.5): pick up to 4 candidates from the fixed set whose
/// per-model statistics pass the threshold test, ranked by
/// `mean*0.7 + pos*0.3`.
fn mix_only_rescue(trace: &DecisionTrace) -> Vec<String> {
    let mut scored: Vec<(&str, f32)> = Vec::new();
    for &candidate in RESCUE_CANDIDATES {
        let mean_panns = trace.per_model.panns.mean(candidate);
        let mean_yamnet = trace.per_model.yamnet.mean(candidate);
        let pos_panns = trace.per_model.panns.pos(candidate);
        let pos_yamnet = trace.per_model.yamnet.pos(candidate);

        let mean_sum = mean_panns + mean_yamnet;
        let pos_sum = pos_panns + pos_yamnet;

        let passes = (mean_sum >= RESCUE_MEAN_SUM_THRESHOLD && pos_sum >= RESCUE_POS_SUM_THRESHOLD)
            || pos_panns >= RESCUE_POS_PANNS_SOLO_THRESHOLD;
        if passes {
            let score = mean_sum * 0.7 + pos_sum * 0.3;
            scored.push((candidate, score));
        }
    }
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
    scored
        .into_iter()
        .take(RESCUE_MAX_CANDIDATES)
        .map(|(label, _)| rescue_display_name(label).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhythmdb_common::models::ModelStats;
    use std::collections::HashMap;

    fn trace_with(candidate: &str, mean_panns: f32, pos_panns: f32, mean_yamnet: f32, pos_yamnet: f32) -> DecisionTrace {
        let mut panns_mean = HashMap::new();
        panns_mean.insert(candidate.to_string(), mean_panns);
        let mut panns_pos = HashMap::new();
        panns_pos.insert(candidate.to_string(), pos_panns);
        let mut yamnet_mean = HashMap::new();
        yamnet_mean.insert(candidate.to_string(), mean_yamnet);
        let mut yamnet_pos = HashMap::new();
        yamnet_pos.insert(candidate.to_string(), pos_yamnet);

        DecisionTrace {
            per_model: rhythmdb_common::models::PerModelStats {
                panns: ModelStats { mean_probs: panns_mean, pos_ratio: panns_pos },
                yamnet: ModelStats { mean_probs: yamnet_mean, pos_ratio: yamnet_pos },
            },
            ..Default::default()
        }
    }

    #[test]
    fn rescue_picks_up_candidate_via_pos_panns_solo_branch() {
        // spec.md §8 end-to-end scenario 3.
        let trace = trace_with("electric_guitar", 0.01, 0.07, 0.0, 0.0);
        let rescued = mix_only_rescue(&trace);
        assert_eq!(rescued, vec!["Electric Guitar".to_string()]);
    }

    #[test]
    fn rescue_rejects_candidate_below_both_thresholds() {
        let trace = trace_with("piano", 0.001, 0.001, 0.001, 0.001);
        assert!(mix_only_rescue(&trace).is_empty());
    }

    #[test]
    fn rescue_caps_at_four_candidates() {
        let mut panns_mean = HashMap::new();
        let mut panns_pos = HashMap::new();
        for c in RESCUE_CANDIDATES {
            panns_mean.insert(c.to_string(), 0.01);
            panns_pos.insert(c.to_string(), 0.1);
        }
        let trace = DecisionTrace {
            per_model: rhythmdb_common::models::PerModelStats {
                panns: ModelStats { mean_probs: panns_mean, pos_ratio: panns_pos },
                yamnet: ModelStats::default(),
            },
            ..Default::default()
        };
        assert_eq!(mix_only_rescue(&trace).len(), RESCUE_MAX_CANDIDATES);
    }

    #[test]
    fn boosts_append_labels_not_already_present() {
        let mut facts = InstrumentationFacts { raw_labels: vec!["Piano".to_string()], ..Default::default() };
        let mut boosts = HashMap::new();
        boosts.insert("rule1".to_string(), rhythmdb_common::models::Boost { added: vec!["Organ".to_string(), "Piano".to_string()] });
        facts.decision_trace.boosts = boosts;
        apply_boosts(&mut facts);
        assert_eq!(facts.raw_labels, vec!["Piano".to_string(), "Organ".to_string()]);
    }
}

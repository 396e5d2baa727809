//! Instrumentation facts (C5 output) — ensemble classifier results plus
//! the decision trace the mix-only rescue (§4.5) inspects.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-model probability/positivity statistics keyed by instrument label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelStats {
    #[serde(default)]
    pub mean_probs: HashMap<String, f32>,
    #[serde(default)]
    pub pos_ratio: HashMap<String, f32>,
}

impl ModelStats {
    pub fn mean(&self, label: &str) -> f32 {
        self.mean_probs.get(label).copied().unwrap_or(0.0)
    }

    pub fn pos(&self, label: &str) -> f32 {
        self.pos_ratio.get(label).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerModelStats {
    #[serde(default)]
    pub panns: ModelStats,
    #[serde(default)]
    pub yamnet: ModelStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulesStats {
    pub mean_thresh: f32,
}

/// A boost record the ensemble classifier may emit: labels it pushed in
/// beyond its primary inference, merged in before finalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Boost {
    #[serde(default)]
    pub added: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionTrace {
    #[serde(default)]
    pub per_model: PerModelStats,
    #[serde(default)]
    pub rules: RulesStats,
    #[serde(default)]
    pub boosts: HashMap<String, Boost>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnsembleMode {
    Stems,
    MixOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectronicElements {
    pub detected: bool,
    pub confidence: Confidence,
    #[serde(default)]
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentationFacts {
    #[serde(default)]
    pub raw_labels: Vec<String>,
    pub decision_trace: DecisionTrace,
    pub used_demucs: bool,
    pub mode: EnsembleMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub electronic_elements: Option<ElectronicElements>,
}

impl Default for InstrumentationFacts {
    fn default() -> Self {
        Self {
            raw_labels: Vec::new(),
            decision_trace: DecisionTrace::default(),
            used_demucs: false,
            mode: EnsembleMode::MixOnly,
            electronic_elements: None,
        }
    }
}

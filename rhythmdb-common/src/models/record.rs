//! The per-track analysis record, assembled by the writer (C8) and owned by
//! the library store (C9) thereafter.

use super::creative::CreativeFacts;
use super::instrumentation::{DecisionTrace, ElectronicElements, EnsembleMode};
use super::key::TrackKey;
use super::technical::TechnicalFacts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The finalized instrumentation view carried on a record: the canonical
/// list produced by the finalizer (C6) plus the raw ensemble output and its
/// decision trace, retained for diagnostics/UI badges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBlock {
    /// Raw ensemble + rescue labels, pre-finalization.
    #[serde(default)]
    pub instruments: Vec<String>,
    /// Canonical, finalized instrument list (C6 output).
    #[serde(default)]
    pub final_instruments: Vec<String>,
    #[serde(default)]
    pub decision_trace: DecisionTrace,
    #[serde(default)]
    pub used_demucs: bool,
    #[serde(default = "default_mode")]
    pub mode: EnsembleMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub electronic_elements: Option<ElectronicElements>,
}

fn default_mode() -> EnsembleMode {
    EnsembleMode::MixOnly
}

impl Default for AnalysisBlock {
    fn default() -> Self {
        Self {
            instruments: Vec::new(),
            final_instruments: Vec::new(),
            decision_trace: DecisionTrace::default(),
            used_demucs: false,
            mode: EnsembleMode::MixOnly,
            electronic_elements: None,
        }
    }
}

/// Canonical, internal representation of a track's analysis — what lives
/// in the main store. Created only once Technical succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub key: TrackKey,
    pub path: String,
    pub file: String,
    pub analyzed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub technical: TechnicalFacts,
    #[serde(default)]
    pub creative: CreativeFacts,
    /// `offline | model_missing | parse_error | ok`, or a pending marker
    /// while the Creative phase is still in flight.
    pub creative_status: String,
    #[serde(default)]
    pub analysis: AnalysisBlock,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waveform_png: Option<String>,
}

impl TrackRecord {
    /// Build a fresh record from just-completed Technical facts. Creative
    /// and Instrumentation fields are left at their documented defaults
    /// until the background phases complete.
    pub fn from_technical(
        key: TrackKey,
        path: String,
        file: String,
        technical: TechnicalFacts,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            path,
            file,
            analyzed_at: now,
            created_at: now,
            updated_at: now,
            technical,
            creative: CreativeFacts::default(),
            creative_status: "pending".to_string(),
            analysis: AnalysisBlock::default(),
            waveform_png: None,
        }
    }
}

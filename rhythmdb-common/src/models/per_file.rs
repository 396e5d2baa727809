//! The authoritative per-file JSON projection (§6), written beside the
//! audio file by the per-track writer (C8).

use super::creative::CreativeFacts;
use super::instrumentation::{DecisionTrace, ElectronicElements, EnsembleMode};
use super::record::TrackRecord;
use super::technical::{BpmSource, TagMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleView {
    pub used_demucs: bool,
    pub mode: EnsembleMode,
    pub decision_trace: DecisionTrace,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub electronic_elements: Option<ElectronicElements>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerFileDocument {
    pub file: String,
    pub path: String,
    pub analyzed_at: DateTime<Utc>,
    pub duration_sec: f64,
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub bit_rate: Option<u32>,
    pub title: Option<String>,
    pub id3: TagMap,
    pub has_wav_version: bool,
    pub estimated_tempo_bpm: Option<u32>,
    pub tempo_bpm: Option<u32>,
    pub bpm: Option<u32>,
    pub tempo_source: Option<BpmSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo_alt_half_bpm: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo_alt_double_bpm: Option<u32>,
    pub creative: CreativeFacts,
    pub creative_status: String,
    pub instruments: Vec<String>,
    pub final_instruments: Vec<String>,
    pub instruments_ensemble: EnsembleView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waveform_png: Option<String>,
}

impl PerFileDocument {
    /// Project a [`TrackRecord`] into its authoritative per-file JSON shape.
    pub fn from_record(record: &TrackRecord) -> Self {
        let t = &record.technical;
        Self {
            file: record.file.clone(),
            path: record.path.clone(),
            analyzed_at: record.analyzed_at,
            duration_sec: t.duration_sec,
            sample_rate_hz: t.sample_rate_hz,
            channels: t.channels,
            bit_rate: t.bit_rate,
            title: t.tags.title.clone(),
            id3: t.tags.clone(),
            has_wav_version: t.has_wav_version,
            estimated_tempo_bpm: t.bpm_estimated.or(t.bpm),
            tempo_bpm: t.bpm,
            bpm: t.bpm,
            tempo_source: t.bpm_source,
            tempo_alt_half_bpm: t.bpm_alt_half,
            tempo_alt_double_bpm: t.bpm_alt_double,
            creative: record.creative.clone(),
            creative_status: record.creative_status.clone(),
            instruments: record.analysis.instruments.clone(),
            final_instruments: record.analysis.final_instruments.clone(),
            instruments_ensemble: EnsembleView {
                used_demucs: record.analysis.used_demucs,
                mode: record.analysis.mode,
                decision_trace: record.analysis.decision_trace.clone(),
                electronic_elements: record.analysis.electronic_elements.clone(),
            },
            waveform_png: record.waveform_png.clone(),
        }
    }
}

//! Technical facts (C2/C3 output) — container metadata, embedded tags, BPM.

use serde::{Deserialize, Serialize};

/// Source that produced the final BPM value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BpmSource {
    Thirds,
    Acf,
    Id3,
}

/// Embedded tag map read by the tag adapter. Every field is best-effort;
/// a failed tag read yields an all-`None`/empty `TagMap`, never an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagMap {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<i32>,
    #[serde(default)]
    pub genre: Vec<String>,
    pub track: Option<u32>,
    pub comment: Option<String>,
    pub composer: Option<String>,
    pub copyright: Option<String>,
    /// Raw `TBPM` frame text, parsed separately by the tempo estimator.
    pub tbpm: Option<String>,
    pub key: Option<String>,
    pub mood: Option<String>,
}

/// Technical metadata and tempo estimate for a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalFacts {
    pub duration_sec: f64,
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub bit_rate: Option<u32>,
    pub codec: String,
    pub has_wav_version: bool,
    pub tags: TagMap,
    /// `bpm ∈ [50,200] ∪ {null}`.
    pub bpm: Option<u32>,
    pub bpm_source: Option<BpmSource>,
    pub bpm_alt_half: Option<u32>,
    pub bpm_alt_double: Option<u32>,
    /// The estimator's raw output, kept even when the ID3 override
    /// replaces `bpm` — the per-file JSON surfaces both (§6).
    pub bpm_estimated: Option<u32>,
}

impl TechnicalFacts {
    /// Apply the ID3 `TBPM` override: a valid `[1,399]` integer in
    /// `tags.tbpm` replaces the estimate and forces `bpm_source = Id3`.
    /// The pre-override estimate is preserved in `bpm_estimated`.
    pub fn apply_id3_override(&mut self) {
        self.bpm_estimated = self.bpm;
        if let Some(tbpm) = self.tags.tbpm.as_deref().and_then(parse_tbpm) {
            if (1..=399).contains(&tbpm) {
                self.bpm = Some(tbpm);
                self.bpm_source = Some(BpmSource::Id3);
            }
        }
    }

    /// Emit alt tempos only when they fall within `[50,200]`.
    pub fn compute_alt_tempos(&mut self) {
        let Some(bpm) = self.bpm else {
            self.bpm_alt_half = None;
            self.bpm_alt_double = None;
            return;
        };
        let half = (bpm as f64 / 2.0).round() as u32;
        let double = (bpm as f64 * 2.0).round() as u32;
        self.bpm_alt_half = (50..=200).contains(&half).then_some(half);
        self.bpm_alt_double = (50..=200).contains(&double).then_some(double);
    }
}

/// Parse a (possibly decorated, e.g. `"148 bpm"`) TBPM string into an integer.
pub fn parse_tbpm(raw: &str) -> Option<u32> {
    let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        // tolerate leading whitespace
        let trimmed = raw.trim_start();
        let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
        return digits.parse().ok();
    }
    digits.parse().ok()
}

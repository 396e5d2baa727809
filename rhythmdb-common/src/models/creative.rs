//! Creative facts (C4 output) — LLM-derived classification and narrative.

use serde::{Deserialize, Serialize};

/// Creative classification for a track, normalized into the closed
/// taxonomies in [`crate::taxonomy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreativeFacts {
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub mood: Vec<String>,
    #[serde(default)]
    pub theme: Vec<String>,
    #[serde(default, rename = "suggestedInstruments")]
    pub suggested_instruments: Vec<String>,
    #[serde(default)]
    pub vocals: Vec<String>,
    #[serde(default, rename = "lyricThemes")]
    pub lyric_themes: Vec<String>,
    #[serde(default)]
    pub narrative: String,
    pub confidence: f32,
}

impl Default for CreativeFacts {
    fn default() -> Self {
        Self {
            genre: Vec::new(),
            mood: Vec::new(),
            theme: Vec::new(),
            suggested_instruments: Vec::new(),
            vocals: vec!["No Vocals".to_string()],
            lyric_themes: Vec::new(),
            narrative: String::new(),
            confidence: 0.0,
        }
    }
}

impl CreativeFacts {
    /// Enforce the `vocals`/`lyric_themes` invariant: `vocals` is never
    /// empty, and `vocals == ["No Vocals"]` implies `lyric_themes == []`.
    pub fn enforce_vocals_invariant(&mut self) {
        let mapped_all = !self.vocals.is_empty();
        if !mapped_all {
            self.vocals = vec!["No Vocals".to_string()];
        }
        if self.vocals == ["No Vocals".to_string()] {
            self.lyric_themes.clear();
        }
    }

    /// Clamp `narrative` to the 200 character invariant.
    pub fn clamp_narrative(&mut self) {
        if self.narrative.chars().count() > 200 {
            self.narrative = self.narrative.chars().take(200).collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_vocals_and_no_lyric_themes() {
        let facts = CreativeFacts::default();
        assert_eq!(facts.vocals, vec!["No Vocals".to_string()]);
        assert!(facts.lyric_themes.is_empty());
    }

    #[test]
    fn no_vocals_clears_lyric_themes() {
        let mut facts = CreativeFacts::default();
        facts.lyric_themes = vec!["Love".into()];
        facts.enforce_vocals_invariant();
        assert!(facts.lyric_themes.is_empty());
    }

    #[test]
    fn narrative_clamped_to_200_chars() {
        let mut facts = CreativeFacts::default();
        facts.narrative = "x".repeat(250);
        facts.clamp_narrative();
        assert_eq!(facts.narrative.chars().count(), 200);
    }
}

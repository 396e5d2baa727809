//! Criteria rebuild (C9, §4.9): a full sweep of the main store into sorted,
//! deduplicated facet sets. Pure function of the store's current contents —
//! two successive rebuilds without an intervening upsert are byte-identical
//! (§8 "Criteria rebuild is a pure function").

use rhythmdb_common::models::{CriteriaStore, MainStore};
use rhythmdb_common::taxonomy::tempo_band;
use std::collections::BTreeSet;

use super::main_store::resolve_instruments;

/// Rebuild the criteria store from scratch by sweeping every track.
pub fn rebuild(store: &MainStore) -> CriteriaStore {
    let mut genre = CaseFoldSet::new();
    let mut mood = CaseFoldSet::new();
    let mut vocals = CaseFoldSet::new();
    let mut theme = CaseFoldSet::new();
    let mut instrument = CaseFoldSet::new();
    let mut tempo_bands = CaseFoldSet::new();
    let mut keys = CaseFoldSet::new();
    let mut artists = CaseFoldSet::new();
    let mut electronic_elements = CaseFoldSet::new();

    for record in store.tracks.values() {
        genre.extend(&record.creative.genre);
        mood.extend(&record.creative.mood);
        vocals.extend(&record.creative.vocals);
        theme.extend(&record.creative.theme);

        for label in resolve_instruments(record) {
            instrument.insert(strip_section_suffix(&label));
        }

        if let Some(bpm) = record.technical.bpm {
            tempo_bands.insert(tempo_band(bpm).to_string());
        }

        if let Some(key) = &record.technical.tags.key {
            keys.insert(key.clone());
        }
        if let Some(artist) = &record.technical.tags.artist {
            artists.insert(artist.clone());
        }

        if let Some(elements) = &record.analysis.electronic_elements {
            electronic_elements.insert(if elements.detected { "Yes".to_string() } else { "No".to_string() });
        }
    }

    CriteriaStore {
        genre: genre.into_sorted_vec(),
        mood: mood.into_sorted_vec(),
        instrument: instrument.into_sorted_vec(),
        vocals: vocals.into_sorted_vec(),
        theme: theme.into_sorted_vec(),
        tempo_bands: tempo_bands.into_sorted_vec(),
        keys: keys.into_sorted_vec(),
        artists: artists.into_sorted_vec(),
        electronic_elements: electronic_elements.into_sorted_vec(),
    }
}

fn strip_section_suffix(label: &str) -> String {
    label.strip_suffix(" (section)").unwrap_or(label).to_string()
}

/// Case-insensitively deduplicated, original-case-preserving set; sorts
/// case-insensitively on output (§4.9 "sorted case-insensitively").
struct CaseFoldSet {
    seen_lower: BTreeSet<String>,
    originals: Vec<String>,
}

impl CaseFoldSet {
    fn new() -> Self {
        Self { seen_lower: BTreeSet::new(), originals: Vec::new() }
    }

    fn insert(&mut self, value: String) {
        let lower = value.to_lowercase();
        if self.seen_lower.insert(lower) {
            self.originals.push(value);
        }
    }

    fn extend(&mut self, values: &[String]) {
        for v in values {
            self.insert(v.clone());
        }
    }

    fn into_sorted_vec(mut self) -> Vec<String> {
        self.originals.sort_by_key(|s| s.to_lowercase());
        self.originals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rhythmdb_common::models::{TagMap, TechnicalFacts, TrackKey, TrackRecord};

    fn record(path: &str, bpm: Option<u32>) -> TrackRecord {
        let key = TrackKey::derive(path);
        let technical = TechnicalFacts {
            duration_sec: 120.0,
            sample_rate_hz: 44_100,
            channels: 2,
            bit_rate: Some(192_000),
            codec: "mp3".into(),
            has_wav_version: false,
            tags: TagMap::default(),
            bpm,
            bpm_source: None,
            bpm_alt_half: None,
            bpm_alt_double: None,
            bpm_estimated: None,
        };
        TrackRecord::from_technical(key, path.to_string(), "song.mp3".to_string(), technical, Utc::now())
    }

    #[test]
    fn tempo_bucketing_matches_bpm_boundaries() {
        let mut store = MainStore::default();
        store.tracks.insert(TrackKey::derive("/a.mp3"), record("/a.mp3", Some(90)));
        let criteria = rebuild(&store);
        assert_eq!(criteria.tempo_bands, vec!["Medium (90-110 BPM)".to_string()]);
    }

    #[test]
    fn instrument_facet_strips_section_suffix() {
        let mut store = MainStore::default();
        let mut r = record("/a.mp3", None);
        r.analysis.final_instruments = vec!["Strings (section)".to_string()];
        store.tracks.insert(r.key.clone(), r);
        let criteria = rebuild(&store);
        assert_eq!(criteria.instrument, vec!["Strings".to_string()]);
    }

    #[test]
    fn rebuild_is_pure_and_deterministic() {
        let mut store = MainStore::default();
        let mut r = record("/a.mp3", Some(140));
        r.creative.genre = vec!["Rock".to_string(), "rock".to_string()];
        store.tracks.insert(r.key.clone(), r);

        let first = rebuild(&store);
        let second = rebuild(&store);
        assert_eq!(first, second);
        assert_eq!(first.genre, vec!["Rock".to_string()]);
    }

    #[test]
    fn electronic_elements_facet_reflects_detection() {
        let mut store = MainStore::default();
        let mut r = record("/a.mp3", None);
        r.analysis.electronic_elements = Some(rhythmdb_common::models::ElectronicElements {
            detected: true,
            confidence: rhythmdb_common::models::Confidence::High,
            reasons: vec![],
        });
        store.tracks.insert(r.key.clone(), r);
        let criteria = rebuild(&store);
        assert_eq!(criteria.electronic_elements, vec!["Yes".to_string()]);
    }
}

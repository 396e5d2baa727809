//! Main store upsert (C9, §4.9): merge-by-key with scalar overwrite, list
//! union, and the documented instrument precedence order.

use chrono::Utc;
use rhythmdb_common::models::{MainStore, TrackRecord};

/// Merge `incoming` into `store` by `incoming.key` (§4.9 "Upsert").
///
/// Scalar fields: new non-empty overwrites old. List fields under
/// `creative` (`genre, mood, vocals, theme`): set union preserving
/// existing order first, appending new. `creative.instrument` uses the
/// instrument precedence chain, not the creative facts at all.
/// `updated_at` is always refreshed; `created_at` only on first write.
pub fn upsert(store: &mut MainStore, incoming: TrackRecord) {
    match store.tracks.get_mut(&incoming.key) {
        None => {
            let mut record = incoming;
            record.created_at = record.analyzed_at;
            record.updated_at = record.analyzed_at;
            store.tracks.insert(record.key.clone(), record);
        }
        Some(existing) => {
            let created_at = existing.created_at;

            existing.path = incoming.path;
            existing.file = incoming.file;
            existing.analyzed_at = incoming.analyzed_at;
            existing.technical = incoming.technical;

            existing.creative.genre = union_preserving_order(&existing.creative.genre, &incoming.creative.genre);
            existing.creative.mood = union_preserving_order(&existing.creative.mood, &incoming.creative.mood);
            existing.creative.vocals = union_preserving_order(&existing.creative.vocals, &incoming.creative.vocals);
            existing.creative.theme = union_preserving_order(&existing.creative.theme, &incoming.creative.theme);
            if !incoming.creative.suggested_instruments.is_empty() {
                existing.creative.suggested_instruments = incoming.creative.suggested_instruments;
            }
            if !incoming.creative.lyric_themes.is_empty() {
                existing.creative.lyric_themes = incoming.creative.lyric_themes;
            }
            if !incoming.creative.narrative.is_empty() {
                existing.creative.narrative = incoming.creative.narrative;
            }
            if incoming.creative.confidence != 0.0 {
                existing.creative.confidence = incoming.creative.confidence;
            }
            if !incoming.creative_status.is_empty() {
                existing.creative_status = incoming.creative_status;
            }

            existing.analysis = incoming.analysis;
            if incoming.waveform_png.is_some() {
                existing.waveform_png = incoming.waveform_png;
            }

            existing.created_at = created_at;
            existing.updated_at = Utc::now();
        }
    }
}

fn union_preserving_order(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut out = existing.to_vec();
    for item in incoming {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

/// Instrument precedence (§4.9, highest wins, first non-empty):
/// `analysis.final_instruments > analysis.instruments >
/// creative.suggested_instruments`.
///
/// The spec's root-level `finalInstruments`/`instruments`/`creative.instrument`
/// legacy fields have no counterpart in this store's `TrackRecord` (they
/// belonged to the source's duplicated top-level mirror of `analysis.*`,
/// §9 "duplicate/divergent ... variants"); the chain here preserves the
/// documented ordering over the fields this store actually carries.
pub fn resolve_instruments(record: &TrackRecord) -> Vec<String> {
    if !record.analysis.final_instruments.is_empty() {
        return record.analysis.final_instruments.clone();
    }
    if !record.analysis.instruments.is_empty() {
        return record.analysis.instruments.clone();
    }
    record.creative.suggested_instruments.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhythmdb_common::models::{TagMap, TechnicalFacts, TrackKey};

    fn record(path: &str) -> TrackRecord {
        let key = TrackKey::derive(path);
        let technical = TechnicalFacts {
            duration_sec: 120.0,
            sample_rate_hz: 44_100,
            channels: 2,
            bit_rate: Some(192_000),
            codec: "mp3".into(),
            has_wav_version: false,
            tags: TagMap::default(),
            bpm: Some(120),
            bpm_source: None,
            bpm_alt_half: None,
            bpm_alt_double: None,
            bpm_estimated: None,
        };
        TrackRecord::from_technical(key, path.to_string(), "song.mp3".to_string(), technical, Utc::now())
    }

    #[test]
    fn path_normalization_collapses_to_one_entry() {
        let mut store = MainStore::default();
        upsert(&mut store, record("/Music/Song.mp3"));
        let created_at_first = store.tracks.values().next().unwrap().created_at;
        upsert(&mut store, record("/music/Song.MP3"));

        assert_eq!(store.tracks.len(), 1);
        let entry = store.tracks.values().next().unwrap();
        assert_eq!(entry.created_at, created_at_first);
        assert!(entry.updated_at >= created_at_first);
    }

    #[test]
    fn instrument_precedence_prefers_final_instruments() {
        let mut r = record("/a.mp3");
        r.analysis.instruments = vec!["Piano".to_string()];
        r.analysis.final_instruments = vec!["Brass".to_string()];
        r.creative.suggested_instruments = vec!["Flute".to_string()];
        assert_eq!(resolve_instruments(&r), vec!["Brass".to_string()]);
    }

    #[test]
    fn instrument_precedence_falls_back_to_suggested_when_analysis_empty() {
        let mut r = record("/a.mp3");
        r.creative.suggested_instruments = vec!["Flute".to_string()];
        assert_eq!(resolve_instruments(&r), vec!["Flute".to_string()]);
    }

    #[test]
    fn creative_scalar_fields_keep_old_value_when_incoming_is_empty() {
        let mut store = MainStore::default();
        let mut first = record("/a.mp3");
        first.creative.suggested_instruments = vec!["Piano".to_string()];
        first.creative.lyric_themes = vec!["Love".to_string()];
        first.creative.narrative = "A quiet ballad.".to_string();
        first.creative.confidence = 0.8;
        upsert(&mut store, first);

        let second = record("/a.mp3");
        upsert(&mut store, second);

        let entry = store.tracks.values().next().unwrap();
        assert_eq!(entry.creative.suggested_instruments, vec!["Piano".to_string()]);
        assert_eq!(entry.creative.lyric_themes, vec!["Love".to_string()]);
        assert_eq!(entry.creative.narrative, "A quiet ballad.".to_string());
        assert_eq!(entry.creative.confidence, 0.8);
    }

    #[test]
    fn creative_scalar_fields_overwritten_when_incoming_is_non_empty() {
        let mut store = MainStore::default();
        let mut first = record("/a.mp3");
        first.creative.suggested_instruments = vec!["Piano".to_string()];
        first.creative.narrative = "A quiet ballad.".to_string();
        first.creative.confidence = 0.5;
        upsert(&mut store, first);

        let mut second = record("/a.mp3");
        second.creative.suggested_instruments = vec!["Synth".to_string()];
        second.creative.narrative = "An upbeat remix.".to_string();
        second.creative.confidence = 0.9;
        upsert(&mut store, second);

        let entry = store.tracks.values().next().unwrap();
        assert_eq!(entry.creative.suggested_instruments, vec!["Synth".to_string()]);
        assert_eq!(entry.creative.narrative, "An upbeat remix.".to_string());
        assert_eq!(entry.creative.confidence, 0.9);
    }

    #[test]
    fn creative_list_fields_union_without_duplication() {
        let mut store = MainStore::default();
        let mut first = record("/a.mp3");
        first.creative.genre = vec!["Rock".to_string()];
        upsert(&mut store, first);

        let mut second = record("/a.mp3");
        second.creative.genre = vec!["Rock".to_string(), "Electronic".to_string()];
        upsert(&mut store, second);

        let entry = store.tracks.values().next().unwrap();
        assert_eq!(entry.creative.genre, vec!["Rock".to_string(), "Electronic".to_string()]);
    }
}

//! Closed taxonomies for the creative and instrumentation phases.
//!
//! These lists are fixed by the external contract: the creative client's
//! prompt enumerates them, the normalization step clamps free-form model
//! output into them, and the criteria store only ever contains values drawn
//! from them (instruments being the one facet that also carries the
//! finalizer's synthesized family tokens).

/// Closed mood taxonomy.
pub const MOODS: &[&str] = &[
    "Upbeat/Energetic",
    "Happy/Cheerful",
    "Inspiring/Uplifting",
    "Epic/Powerful",
    "Dramatic/Emotional",
    "Chill/Mellow",
    "Funny/Quirky",
    "Angry/Aggressive",
];

/// Closed genre taxonomy.
pub const GENRES: &[&str] = &[
    "Cinematic",
    "Corporate",
    "Hip hop/Rap",
    "Rock",
    "Electronic",
    "Ambient",
    "Funk",
    "Classical",
];

/// Genres that elevate an `electronic_elements` detection from `low` to
/// `medium` confidence. Per spec.md §9 this provenance is undocumented in
/// the source; fixed here as the single place that can be recalibrated.
pub const ELECTRONIC_ELEMENT_GENRES: &[&str] = &["Electronic", "Hip hop/Rap", "Funk"];

/// Closed theme taxonomy.
pub const THEMES: &[&str] = &[
    "Corporate",
    "Documentary",
    "Action",
    "Lifestyle",
    "Sports",
    "Drama",
    "Nature",
    "Technology",
];

/// Closed vocals taxonomy.
pub const VOCALS: &[&str] = &[
    "No Vocals",
    "Background Vocals",
    "Female Vocals",
    "Lead Vocals",
    "Vocal Samples",
    "Male Vocals",
];

/// Canonical instrument taxonomy (representative subset; finalization may
/// additionally synthesize the family tokens `Brass`, `Woodwinds`, `Strings`).
pub const INSTRUMENTS: &[&str] = &[
    // keyboards
    "Piano", "Keyboard", "Organ", "Synth",
    // guitars / bass
    "Electric Guitar", "Acoustic Guitar", "Bass Guitar",
    // drums / percussion
    "Drum Kit (acoustic)", "Drum Machine", "Percussion", "Hand Percussion",
    // mallets
    "Marimba", "Vibraphone", "Xylophone",
    // strings
    "Violin", "Viola", "Cello", "Double Bass", "Harp", "Strings",
    // brass
    "Trumpet", "Trombone", "French Horn", "Tuba", "Flugelhorn", "Cornet", "Brass",
    // woodwinds
    "Saxophone", "Flute", "Clarinet", "Oboe", "Bassoon", "Piccolo", "Woodwinds",
    // world
    "Sitar", "Djembe", "Accordion", "Banjo", "Ukulele",
];

/// A tempo facet bucket: label plus its `[lo, hi)` bound (hi is `None` for
/// the open-ended top bucket).
pub struct TempoBand {
    pub label: &'static str,
    pub lo: u32,
    pub hi: Option<u32>,
}

/// Fixed tempo band table. Lower bound inclusive, upper bound exclusive,
/// per spec.md §8's `bpm = 90 -> "Medium (90-110 BPM)"`,
/// `bpm = 60 -> "Slow (60-90 BPM)"`, `bpm = 160 -> "Very Fast (160+ BPM)"`.
pub const TEMPO_BANDS: &[TempoBand] = &[
    TempoBand { label: "Very Slow (Below 60 BPM)", lo: 0, hi: Some(60) },
    TempoBand { label: "Slow (60-90 BPM)", lo: 60, hi: Some(90) },
    TempoBand { label: "Medium (90-110 BPM)", lo: 90, hi: Some(110) },
    TempoBand { label: "Upbeat (110-140 BPM)", lo: 110, hi: Some(140) },
    TempoBand { label: "Fast (140-160 BPM)", lo: 140, hi: Some(160) },
    TempoBand { label: "Very Fast (160+ BPM)", lo: 160, hi: None },
];

/// Bucket a BPM value into its fixed tempo band label.
///
/// Exactly one band is returned for any `bpm`; the table is exhaustive and
/// its bounds are contiguous (lower inclusive, upper exclusive).
pub fn tempo_band(bpm: u32) -> &'static str {
    for band in TEMPO_BANDS {
        let below_hi = band.hi.map_or(true, |hi| bpm < hi);
        if bpm >= band.lo && below_hi {
            return band.label;
        }
    }
    // Unreachable: the table covers [0, inf) contiguously.
    TEMPO_BANDS.last().unwrap().label
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_lower_inclusive_upper_exclusive() {
        assert_eq!(tempo_band(90), "Medium (90-110 BPM)");
        assert_eq!(tempo_band(89), "Slow (60-90 BPM)");
        assert_eq!(tempo_band(60), "Slow (60-90 BPM)");
        assert_eq!(tempo_band(59), "Very Slow (Below 60 BPM)");
        assert_eq!(tempo_band(160), "Very Fast (160+ BPM)");
        assert_eq!(tempo_band(159), "Fast (140-160 BPM)");
        assert_eq!(tempo_band(400), "Very Fast (160+ BPM)");
    }

    #[test]
    fn every_bpm_maps_to_exactly_one_band() {
        for bpm in 0..300u32 {
            let matches = TEMPO_BANDS
                .iter()
                .filter(|b| bpm >= b.lo && b.hi.map_or(true, |hi| bpm < hi))
                .count();
            assert_eq!(matches, 1, "bpm {bpm} matched {matches} bands");
        }
    }
}

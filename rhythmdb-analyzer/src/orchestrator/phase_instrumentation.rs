//! Instrumentation phase (§4.7 `INSTR_RUNNING`, §4.5–§4.6): C5 ensemble +
//! mix-only rescue, then C6 finalization into `analysis.{instruments,
//! final_instruments}`.

use rhythmdb_common::models::TrackRecord;
use std::path::Path;

use crate::services::ensemble_client::EnsembleClient;
use crate::services::finalizer;

/// Mutate `record.analysis` in place.
pub async fn run(record: &mut TrackRecord, path: &Path, client: &EnsembleClient, use_demucs: bool) {
    let result = client.analyze(path, use_demucs).await;

    let final_instruments = finalizer::finalize(&result.raw_instruments, &result.rescued_instruments, &[]);

    record.analysis.instruments = result.raw_instruments;
    record.analysis.final_instruments = final_instruments;
    record.analysis.decision_trace = result.facts.decision_trace;
    record.analysis.used_demucs = result.facts.used_demucs;
    record.analysis.mode = result.facts.mode;
    record.analysis.electronic_elements = elevate_electronic_elements(result.facts.electronic_elements, &record.creative.genre);
}

/// §9 open question (resolved): elevate `electronic_elements.confidence`
/// from `low` to `medium` when the Creative genre set intersects the fixed
/// list in [`rhythmdb_common::taxonomy::ELECTRONIC_ELEMENT_GENRES`].
pub(crate) fn elevate_electronic_elements(
    elements: Option<rhythmdb_common::models::ElectronicElements>,
    genres: &[String],
) -> Option<rhythmdb_common::models::ElectronicElements> {
    use rhythmdb_common::models::Confidence;
    use rhythmdb_common::taxonomy::ELECTRONIC_ELEMENT_GENRES;

    elements.map(|mut e| {
        if e.confidence == Confidence::Low && genres.iter().any(|g| ELECTRONIC_ELEMENT_GENRES.contains(&g.as_str())) {
            e.confidence = Confidence::Medium;
        }
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhythmdb_common::models::{Confidence, ElectronicElements};

    #[test]
    fn elevates_low_confidence_when_genre_matches() {
        let elements = ElectronicElements { detected: true, confidence: Confidence::Low, reasons: vec![] };
        let out = elevate_electronic_elements(Some(elements), &["Electronic".to_string()]).unwrap();
        assert_eq!(out.confidence, Confidence::Medium);
    }

    #[test]
    fn leaves_confidence_alone_when_genre_does_not_match() {
        let elements = ElectronicElements { detected: true, confidence: Confidence::Low, reasons: vec![] };
        let out = elevate_electronic_elements(Some(elements), &["Classical".to_string()]).unwrap();
        assert_eq!(out.confidence, Confidence::Low);
    }

    #[test]
    fn none_stays_none() {
        assert!(elevate_electronic_elements(None, &["Electronic".to_string()]).is_none());
    }
}

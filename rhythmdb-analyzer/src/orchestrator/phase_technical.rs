//! Technical phase (§4.7 `TECH_RUNNING`): C2 probe + tags + audio hints,
//! C3 tempo estimation, ID3 override, alt tempos. The only phase whose
//! failure is fatal for the track (§7).

use chrono::Utc;
use rhythmdb_common::models::{TrackKey, TrackRecord};
use std::path::Path;

use crate::error::ProbeError;
use crate::services::{audio_probes::AudioProbes, probe::ContainerProbe, tags::TagReader, tempo};

pub struct TechnicalServices<'a> {
    pub probe: &'a ContainerProbe,
    pub tags: &'a TagReader,
    pub audio_probes: &'a AudioProbes,
}

/// Run the Technical phase for one file. A probe failure is propagated
/// as-is (fatal, §7); every other sub-step degrades gracefully.
pub async fn run(path: &Path, services: &TechnicalServices<'_>) -> Result<TrackRecord, ProbeError> {
    let container = services.probe.probe(path).await?;
    let tags = services.tags.read(path);
    let probes = services.audio_probes.run(path, container.duration_sec).await;

    let drums_present = probes.hints.get("drums").copied().unwrap_or(false);
    let rock_hinted = ["guitar", "electric guitar", "brass"]
        .iter()
        .any(|l| probes.hints.get(*l).copied().unwrap_or(false));

    let estimate = tempo::estimate(path, drums_present, rock_hinted).unwrap_or(tempo::TempoEstimate { bpm: None, source: None });

    let has_wav_version = path.with_extension("wav").exists();

    let mut technical = rhythmdb_common::models::TechnicalFacts {
        duration_sec: container.duration_sec,
        sample_rate_hz: container.sample_rate_hz,
        channels: container.channels,
        bit_rate: container.bit_rate,
        codec: container.codec,
        has_wav_version,
        tags,
        bpm: estimate.bpm,
        bpm_source: estimate.source,
        bpm_alt_half: None,
        bpm_alt_double: None,
        bpm_estimated: None,
    };
    technical.apply_id3_override();
    technical.compute_alt_tempos();

    let key = TrackKey::derive(path);
    let file = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    let now = Utc::now();

    Ok(TrackRecord::from_technical(key, path.to_string_lossy().to_string(), file, technical, now))
}

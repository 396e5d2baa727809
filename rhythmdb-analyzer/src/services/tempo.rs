//! Tempo estimator (C3): thirds strategy with an autocorrelation fallback,
//! decode grounded on the teacher's `audio_decoder::decode_audio_file`
//! (symphonia probe → default track → decode loop → mono mixdown), resample
//! grounded on the teacher's `audio_loader` use of `rubato::SincFixedIn`.

use rhythmdb_common::models::BpmSource;
use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use std::path::Path;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample as SymSample;

use crate::error::TempoError;

const TARGET_RATE: u32 = 44_100;

/// Mono f32 PCM at its native sample rate (§4.3 "mono 44.1 kHz stream" is
/// the *post-resample* target, not a decode precondition).
#[derive(Debug)]
struct Decoded {
    samples: Vec<f32>,
    sample_rate: u32,
}

fn to_f32<S: SymSample>(s: S) -> f32
where
    f32: FromSample<S>,
{
    f32::from_sample(s)
}

fn mixdown(buf: &AudioBufferRef) -> Vec<f32> {
    macro_rules! mix {
        ($b:expr) => {{
            let channels = $b.spec().channels.count().max(1);
            let frames = $b.frames();
            let mut out = Vec::with_capacity(frames);
            for i in 0..frames {
                let mut sum = 0.0f32;
                for ch in 0..channels {
                    sum += to_f32($b.chan(ch)[i]);
                }
                out.push(sum / channels as f32);
            }
            out
        }};
    }
    match buf {
        AudioBufferRef::F32(b) => mix!(b),
        AudioBufferRef::F64(b) => mix!(b),
        AudioBufferRef::U8(b) => mix!(b),
        AudioBufferRef::U16(b) => mix!(b),
        AudioBufferRef::U24(b) => mix!(b),
        AudioBufferRef::U32(b) => mix!(b),
        AudioBufferRef::S8(b) => mix!(b),
        AudioBufferRef::S16(b) => mix!(b),
        AudioBufferRef::S24(b) => mix!(b),
        AudioBufferRef::S32(b) => mix!(b),
    }
}

/// Decode the whole file to mono PCM at its native sample rate.
fn decode_whole(path: &Path) -> Result<Decoded, TempoError> {
    let file = std::fs::File::open(path).map_err(|e| TempoError::Decode(e.to_string()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| TempoError::Decode(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| TempoError::Decode("no audio track".to_string()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| TempoError::Decode("unknown sample rate".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| TempoError::Decode(e.to_string()))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(TempoError::Decode(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = decoder.decode(&packet).map_err(|e| TempoError::Decode(e.to_string()))?;
        samples.extend_from_slice(&mixdown(&decoded));
    }

    Ok(Decoded { samples, sample_rate })
}

/// Resample mono `input` from `from_rate` to `to_rate` using rubato's
/// sinc-windowed resampler; a no-op when the rates already match.
fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || input.is_empty() {
        return input.to_vec();
    }
    let ratio = to_rate as f64 / from_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let chunk_size = input.len();
    let Ok(mut resampler) = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 1) else {
        return input.to_vec();
    };
    match resampler.process(&[input.to_vec()], None) {
        Ok(mut out) => out.remove(0),
        Err(_) => input.to_vec(),
    }
}

/// Rectified per-frame energy-difference onset envelope, peak-normalized.
fn onset_envelope(samples: &[f32], frame: usize, hop: usize) -> Vec<f32> {
    if samples.len() < frame * 2 {
        return Vec::new();
    }
    let mut energies = Vec::new();
    let mut i = 0;
    while i + frame <= samples.len() {
        let e: f32 = samples[i..i + frame].iter().map(|s| s * s).sum();
        energies.push(e);
        i += hop;
    }
    let mut envelope: Vec<f32> = energies
        .windows(2)
        .map(|w| (w[1] - w[0]).max(0.0))
        .collect();
    let peak = envelope.iter().cloned().fold(0.0f32, f32::max);
    if peak > 0.0 {
        for v in envelope.iter_mut() {
            *v /= peak;
        }
    }
    envelope
}

/// Autocorrelate `envelope` over the lag range implied by `[min_bpm,max_bpm]`
/// at the given frame rate (samples/sec of the envelope itself), returning
/// `(bpm, confidence)` for the strongest peak, where confidence is
/// `best/(best+second_best)`.
fn autocorrelate_bpm(envelope: &[f32], envelope_rate: f64, min_bpm: f64, max_bpm: f64) -> Option<(f64, f64)> {
    if envelope.len() < 8 {
        return None;
    }
    let min_lag = ((60.0 / max_bpm) * envelope_rate).floor().max(1.0) as usize;
    let max_lag = ((60.0 / min_bpm) * envelope_rate).ceil() as usize;
    let max_lag = max_lag.min(envelope.len() - 1);
    if min_lag >= max_lag {
        return None;
    }

    let mut scores: Vec<(usize, f64)> = Vec::with_capacity(max_lag - min_lag);
    for lag in min_lag..=max_lag {
        let mut score = 0.0f64;
        for i in 0..envelope.len() - lag {
            score += (envelope[i] as f64) * (envelope[i + lag] as f64);
        }
        scores.push((lag, score));
    }
    scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
    let (best_lag, best_score) = scores[0];
    let second_best = scores.get(1).map(|s| s.1).unwrap_or(0.0);
    let confidence = if best_score + second_best > 0.0 {
        best_score / (best_score + second_best)
    } else {
        0.0
    };
    let bpm = 60.0 * envelope_rate / best_lag as f64;
    Some((bpm, confidence))
}

/// Fold `bpm` into `[70,180]` by repeated doubling/halving (§4.3 Thirds).
fn fold_into_band(mut bpm: f64) -> f64 {
    while bpm < 70.0 {
        bpm *= 2.0;
    }
    while bpm > 180.0 {
        bpm /= 2.0;
    }
    bpm
}

/// Percussion-aware normalization (§4.3 Thirds, second paragraph).
fn percussion_normalize(folded: f64, drums_present: bool) -> f64 {
    if drums_present && (70.0..95.0).contains(&folded) {
        let doubled = folded * 2.0;
        if (100.0..190.0).contains(&doubled) {
            return doubled;
        }
    }
    if !drums_present && (135.0..170.0).contains(&folded) {
        let halved = folded / 2.0;
        if (68.0..100.0).contains(&halved) {
            return halved;
        }
    }
    folded
}

/// One ~¼-of-a-third window estimate via onset-envelope autocorrelation.
fn window_bpm(mono_44k: &[f32]) -> Option<f64> {
    let envelope = onset_envelope(mono_44k, 1024, 256);
    let envelope_rate = TARGET_RATE as f64 / 256.0;
    autocorrelate_bpm(&envelope, envelope_rate, 40.0, 220.0).map(|(bpm, _)| bpm)
}

/// Thirds strategy (§4.3): three windows at start/middle/end, each widened
/// once to up to 60s if the first pull is under 6s.
fn thirds_strategy(mono_44k: &[f32], drums_present: bool) -> Option<u32> {
    let total = mono_44k.len();
    if total == 0 {
        return None;
    }
    let third = total / 3;
    let quarter = (third / 4).max(1);
    let min_samples = (6.0 * TARGET_RATE as f64) as usize;
    let max_samples = (60.0 * TARGET_RATE as f64) as usize;

    let window_at = |start: usize| -> &[f32] {
        let mut len = quarter;
        if len < min_samples {
            len = (len * 3 / 2).min(max_samples).min(total - start);
        }
        let end = (start + len).min(total);
        &mono_44k[start..end]
    };

    let starts = [0, third, total.saturating_sub(third.max(1))];
    let mut bpms = Vec::new();
    for &start in &starts {
        if start >= total {
            continue;
        }
        if let Some(raw) = window_bpm(window_at(start)) {
            let folded = fold_into_band(raw);
            bpms.push(percussion_normalize(folded, drums_present));
        }
    }
    if bpms.is_empty() {
        return None;
    }
    let mean = bpms.iter().sum::<f64>() / bpms.len() as f64;
    Some(mean.round() as u32)
}

/// ACF fallback strategy (§4.3).
fn acf_strategy(mono_native: &[f32], native_rate: u32, duration_sec: f64, rock_hinted: bool) -> Option<u32> {
    let window_secs = (0.4 * duration_sec).clamp(20.0, 60.0);
    let window_samples = (window_secs * native_rate as f64) as usize;
    if mono_native.is_empty() {
        return None;
    }
    let center = mono_native.len() / 2;
    let half = window_samples / 2;
    let start = center.saturating_sub(half);
    let end = (start + window_samples).min(mono_native.len());
    if start >= end {
        return None;
    }
    let window = &mono_native[start..end];

    // Downsample by 2 via simple decimation (§4.3: "downsampled by 2").
    let decimated: Vec<f32> = window.iter().step_by(2).copied().collect();
    let decimated_rate = native_rate as f64 / 2.0;

    let envelope = onset_envelope(&decimated, 1024, 256);
    let envelope_rate = decimated_rate / 256.0;
    let (raw, confidence) = autocorrelate_bpm(&envelope, envelope_rate, 50.0, 200.0)?;
    let _ = confidence;

    let chosen = choose_octave_candidate(raw);
    let final_bpm = apply_rock_bias(chosen, raw, rock_hinted);
    Some(final_bpm.round() as u32)
}

/// Reference tempo used to resolve octave ambiguity among `{raw, raw/2, raw*2}` (§4.3).
const ACF_REFERENCE_BPM: f64 = 120.0;

/// Among `{raw, raw/2, raw*2}`, pick the octave candidate closest to a typical track tempo.
fn choose_octave_candidate(raw: f64) -> f64 {
    let candidates = [raw, raw / 2.0, raw * 2.0];
    candidates
        .iter()
        .copied()
        .min_by(|a, b| (a - ACF_REFERENCE_BPM).abs().partial_cmp(&(b - ACF_REFERENCE_BPM).abs()).unwrap())
        .unwrap_or(raw)
}

/// Rock-bias override (§4.3): guitar/brass hints distrust a folded-down candidate.
fn apply_rock_bias(chosen: f64, raw: f64, rock_hinted: bool) -> f64 {
    if rock_hinted && chosen < 110.0 && raw >= 120.0 {
        raw.round()
    } else {
        chosen
    }
}

/// Estimated BPM plus provenance, before any ID3 override (applied by the
/// caller via [`rhythmdb_common::models::TechnicalFacts::apply_id3_override`]).
pub struct TempoEstimate {
    pub bpm: Option<u32>,
    pub source: Option<BpmSource>,
}

/// Run the tempo estimator over a decoded file: thirds first, ACF fallback.
pub fn estimate(path: &Path, drums_present: bool, rock_hinted: bool) -> Result<TempoEstimate, TempoError> {
    let decoded = decode_whole(path)?;
    if decoded.samples.is_empty() {
        return Ok(TempoEstimate { bpm: None, source: None });
    }
    let duration_sec = decoded.samples.len() as f64 / decoded.sample_rate as f64;
    let mono_44k = resample(&decoded.samples, decoded.sample_rate, TARGET_RATE);

    if let Some(bpm) = thirds_strategy(&mono_44k, drums_present) {
        return Ok(TempoEstimate { bpm: Some(bpm), source: Some(BpmSource::Thirds) });
    }
    if let Some(bpm) = acf_strategy(&decoded.samples, decoded.sample_rate, duration_sec, rock_hinted) {
        return Ok(TempoEstimate { bpm: Some(bpm), source: Some(BpmSource::Acf) });
    }
    Ok(TempoEstimate { bpm: None, source: None })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click_track(bpm: f64, seconds: f64, rate: u32) -> Vec<f32> {
        let period = (60.0 / bpm * rate as f64) as usize;
        let total = (seconds * rate as f64) as usize;
        let mut out = vec![0.0f32; total];
        let mut i = 0;
        while i < total {
            for k in 0..32.min(total - i) {
                out[i + k] = 1.0 - (k as f32 / 32.0);
            }
            i += period.max(1);
        }
        out
    }

    #[test]
    fn fold_into_band_brings_values_into_range() {
        assert!((70.0..=180.0).contains(&fold_into_band(35.0)));
        assert!((70.0..=180.0).contains(&fold_into_band(300.0)));
        assert_eq!(fold_into_band(120.0), 120.0);
    }

    #[test]
    fn percussion_normalize_doubles_when_drums_present_and_low() {
        let out = percussion_normalize(80.0, true);
        assert_eq!(out, 160.0);
    }

    #[test]
    fn percussion_normalize_halves_when_drums_absent_and_high() {
        let out = percussion_normalize(150.0, false);
        assert_eq!(out, 75.0);
    }

    #[test]
    fn percussion_normalize_noop_outside_trigger_bands() {
        assert_eq!(percussion_normalize(120.0, true), 120.0);
        assert_eq!(percussion_normalize(120.0, false), 120.0);
    }

    #[test]
    fn choose_octave_candidate_prefers_value_nearest_reference_tempo() {
        assert_eq!(choose_octave_candidate(120.0), 120.0);
        assert_eq!(choose_octave_candidate(200.0), 100.0);
        assert_eq!(choose_octave_candidate(60.0), 120.0);
    }

    #[test]
    fn rock_bias_snaps_to_raw_when_folded_candidate_is_too_slow() {
        let raw = 200.0;
        let chosen = choose_octave_candidate(raw);
        assert!(chosen < 110.0, "expected a folded-down candidate, got {chosen}");
        assert_eq!(apply_rock_bias(chosen, raw, true), raw.round());
        assert_eq!(apply_rock_bias(chosen, raw, false), chosen);
    }

    #[test]
    fn rock_bias_is_noop_when_raw_below_threshold() {
        let raw = 90.0;
        let chosen = choose_octave_candidate(raw);
        assert_eq!(apply_rock_bias(chosen, raw, true), chosen);
    }

    #[test]
    fn autocorrelate_recovers_click_track_tempo() {
        let rate = 44_100u32;
        let samples = click_track(120.0, 10.0, rate);
        let envelope = onset_envelope(&samples, 1024, 256);
        let envelope_rate = rate as f64 / 256.0;
        let (bpm, confidence) = autocorrelate_bpm(&envelope, envelope_rate, 60.0, 200.0).unwrap();
        let folded = fold_into_band(bpm);
        assert!((candidate_near(folded, 120.0, 6.0)), "got {folded}");
        assert!(confidence > 0.0);
    }

    fn candidate_near(value: f64, target: f64, tol: f64) -> bool {
        (value - target).abs() <= tol || (value * 2.0 - target).abs() <= tol || (value / 2.0 - target).abs() <= tol
    }

    #[test]
    fn decode_missing_file_is_a_decode_error() {
        let err = decode_whole(Path::new("/nonexistent/does-not-exist.mp3")).unwrap_err();
        matches!(err, TempoError::Decode(_));
    }
}

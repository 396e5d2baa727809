//! Container/stream probe (C2, §4.2): a `ContainerProbe` trait with two
//! implementations, matching the teacher's pairing of an external-tool
//! adapter with an in-process decoding fallback. `FfprobeAdapter` spawns an
//! ffprobe-compatible binary (subprocess shape grounded on the teacher's
//! `EssentiaClient`: spawn_blocking + `Command::output()` + JSON parse).
//! `SymphoniaContainerProbe` reads container metadata directly via
//! `symphonia` when no such binary is available. `FallbackContainerProbe`
//! composes the two: try ffprobe, fall back to symphonia on any failure.
//! A container probe failure from both is fatal for the track per spec.md §7.

use futures::future::BoxFuture;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::ProbeError;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(deserialize_with = "deserialize_lenient_f64")]
    duration: f64,
    #[serde(default, deserialize_with = "deserialize_lenient_opt_u32")]
    bit_rate: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: String,
    #[serde(default)]
    codec_name: String,
    #[serde(default, deserialize_with = "deserialize_lenient_opt_u32")]
    sample_rate: Option<u32>,
    #[serde(default)]
    channels: Option<u16>,
}

fn deserialize_lenient_f64<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(d)?;
    Ok(match v {
        serde_json::Value::String(s) => s.parse().unwrap_or(0.0),
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        _ => 0.0,
    })
}

fn deserialize_lenient_opt_u32<'de, D>(d: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(d)?;
    Ok(match v {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.as_u64().map(|x| x as u32),
        _ => None,
    })
}

/// Technical facts derivable from the container/stream probe alone, before
/// tags and BPM are merged in by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbedContainer {
    pub duration_sec: f64,
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub bit_rate: Option<u32>,
    pub codec: String,
}

/// §4.2: `probeContainer(path) → TechnicalFacts-minus-bpm`, behind a trait
/// so the ffprobe-backed and symphonia-backed implementations are
/// interchangeable.
pub trait ContainerProbeBackend: Send + Sync {
    fn probe<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<ProbedContainer, ProbeError>>;
}

pub struct FfprobeAdapter {
    binary: PathBuf,
}

impl FfprobeAdapter {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    async fn probe_impl(&self, path: &Path) -> Result<ProbedContainer, ProbeError> {
        let output = tokio::task::spawn_blocking({
            let binary = self.binary.clone();
            let path = path.to_path_buf();
            move || {
                Command::new(&binary)
                    .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
                    .arg(&path)
                    .output()
            }
        })
        .await
        .map_err(|e| ProbeError::InvalidData(format!("task join error: {e}")))??;

        if !output.status.success() {
            return Err(ProbeError::NonZeroExit(output.status.code().unwrap_or(-1)));
        }

        let parsed: ProbeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| ProbeError::InvalidData(e.to_string()))?;

        let stream = parsed
            .streams
            .iter()
            .find(|s| s.codec_type == "audio")
            .ok_or_else(|| ProbeError::InvalidData("no audio stream".to_string()))?;

        Ok(ProbedContainer {
            duration_sec: parsed.format.duration,
            sample_rate_hz: stream.sample_rate.unwrap_or(44_100),
            channels: stream.channels.unwrap_or(2),
            bit_rate: parsed.format.bit_rate,
            codec: stream.codec_name.clone(),
        })
    }
}

impl ContainerProbeBackend for FfprobeAdapter {
    fn probe<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<ProbedContainer, ProbeError>> {
        Box::pin(self.probe_impl(path))
    }
}

/// Decoding fallback used when no ffprobe-compatible binary is configured
/// or it fails to run: reads container metadata directly via `symphonia`'s
/// format probe without decoding any audio packets.
pub struct SymphoniaContainerProbe;

impl SymphoniaContainerProbe {
    fn probe_sync(path: &Path) -> Result<ProbedContainer, ProbeError> {
        let file = std::fs::File::open(path).map_err(|e| ProbeError::InvalidData(e.to_string()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| ProbeError::InvalidData(e.to_string()))?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| ProbeError::InvalidData("no audio track".to_string()))?;

        let sample_rate = track.codec_params.sample_rate.unwrap_or(44_100);
        let channels = track.codec_params.channels.map(|c| c.count() as u16).unwrap_or(2);
        let n_frames = track.codec_params.n_frames.unwrap_or(0);
        let duration_sec = if sample_rate > 0 { n_frames as f64 / sample_rate as f64 } else { 0.0 };

        Ok(ProbedContainer {
            duration_sec,
            sample_rate_hz: sample_rate,
            channels,
            bit_rate: None,
            codec: format!("{:?}", track.codec_params.codec),
        })
    }
}

impl ContainerProbeBackend for SymphoniaContainerProbe {
    fn probe<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<ProbedContainer, ProbeError>> {
        let path = path.to_path_buf();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || Self::probe_sync(&path))
                .await
                .map_err(|e| ProbeError::InvalidData(format!("task join error: {e}")))?
        })
    }
}

/// The probe actually wired into the scheduler: try ffprobe first, fall
/// back to the symphonia-backed probe on any failure (missing binary,
/// unsupported container, non-zero exit).
pub struct ContainerProbe {
    primary: FfprobeAdapter,
    fallback: SymphoniaContainerProbe,
}

impl ContainerProbe {
    pub fn new(binary: PathBuf) -> Self {
        Self { primary: FfprobeAdapter::new(binary), fallback: SymphoniaContainerProbe }
    }

    pub async fn probe(&self, path: &Path) -> Result<ProbedContainer, ProbeError> {
        match self.primary.probe(path).await {
            Ok(container) => Ok(container),
            Err(_) => self.fallback.probe(path).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ffprobe_style_json_with_string_numbers() {
        let json = r#"{
            "format": {"duration": "185.32", "bit_rate": "192000"},
            "streams": [{"codec_type": "audio", "codec_name": "mp3", "sample_rate": "44100", "channels": 2}]
        }"#;
        let parsed: ProbeOutput = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.format.duration, 185.32);
        assert_eq!(parsed.format.bit_rate, Some(192_000));
        assert_eq!(parsed.streams[0].sample_rate, Some(44_100));
    }

    #[test]
    fn skips_non_audio_streams() {
        let json = r#"{
            "format": {"duration": 10.0},
            "streams": [
                {"codec_type": "video", "codec_name": "mjpeg"},
                {"codec_type": "audio", "codec_name": "pcm_s16le", "sample_rate": 48000, "channels": 1}
            ]
        }"#;
        let parsed: ProbeOutput = serde_json::from_str(json).unwrap();
        let stream = parsed.streams.iter().find(|s| s.codec_type == "audio").unwrap();
        assert_eq!(stream.codec_name, "pcm_s16le");
    }

    #[tokio::test]
    async fn falls_back_to_symphonia_when_ffprobe_binary_is_missing() {
        let probe = ContainerProbe::new(PathBuf::from("/nonexistent/ffprobe-binary"));
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");

        let spec = hound::WavSpec { channels: 1, sample_rate: 44_100, bits_per_sample: 16, sample_format: hound::SampleFormat::Int };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..44_100 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let result = probe.probe(&path).await.unwrap();
        assert_eq!(result.sample_rate_hz, 44_100);
        assert_eq!(result.channels, 1);
        assert!((result.duration_sec - 1.0).abs() < 0.01);
    }
}

//! Creative client (C4): talks to a local chat-completion endpoint,
//! parses/repairs its JSON, and normalizes free-form output into the closed
//! taxonomies (§4.4). HTTP client shape grounded on the teacher's
//! `musicbrainz_client::MusicBrainzClient` (reqwest::Client + typed error
//! enum + `?`-propagated request/parse stages).

use rhythmdb_common::models::CreativeFacts;
use rhythmdb_common::taxonomy::{GENRES, INSTRUMENTS, MOODS, THEMES, VOCALS};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::CreativeError;
use crate::services::json_repair;

const MAX_SUGGESTED_INSTRUMENTS: usize = 8;
/// Below this `jaro_winkler` score a free-form label is dropped rather than
/// mapped to a taxonomy entry.
const FUZZY_MATCH_THRESHOLD: f64 = 0.84;
/// Temperature chosen by model size, matching the teacher's per-model
/// tuning pattern in its LLM-backed clients.
const LARGE_MODEL_TEMPERATURE: f32 = 0.3;
const SMALL_MODEL_TEMPERATURE: f32 = 0.7;
/// Heuristic: local chat models whose name does not suggest a "large" tier
/// get the higher, more creative temperature.
const LARGE_MODEL_MARKERS: &[&str] = &["70b", "34b", "13b", "mixtral", "gpt"];

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    stream: bool,
    format: &'a str,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

/// Raw shape requested from the model, before taxonomy normalization.
#[derive(Debug, Default, Deserialize)]
struct RawCreative {
    #[serde(default)]
    mood: Vec<String>,
    #[serde(default)]
    genre: Vec<String>,
    #[serde(default)]
    theme: Vec<String>,
    #[serde(default)]
    instrument: Vec<String>,
    #[serde(default)]
    vocals: Vec<String>,
    #[serde(default, rename = "lyricThemes")]
    lyric_themes: Vec<String>,
    #[serde(default)]
    narrative: String,
    #[serde(default)]
    confidence: Value,
}

pub struct CreativeClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

impl CreativeClient {
    pub fn new(endpoint: String, model: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { http, endpoint, model }
    }

    fn tags_endpoint(&self) -> String {
        let base = self.endpoint.trim_end_matches("/api/chat");
        format!("{base}/api/tags")
    }

    /// Model precheck (§4.4): fail fast and distinctly if the configured
    /// model is absent from the server's listing.
    async fn precheck_model(&self) -> Result<(), CreativeError> {
        let resp = self
            .http
            .get(self.tags_endpoint())
            .send()
            .await
            .map_err(|e| CreativeError::Offline(e.to_string()))?;
        let tags: TagsResponse = resp
            .json()
            .await
            .map_err(|_| CreativeError::Offline("malformed /api/tags response".to_string()))?;
        if tags.models.iter().any(|m| m.name == self.model) {
            Ok(())
        } else {
            Err(CreativeError::ModelMissing)
        }
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are a music analysis assistant. Classify the track strictly using these \
             closed vocabularies:\nmood: {:?}\ngenre: {:?}\ntheme: {:?}\ninstrument: {:?}\n\
             vocals: {:?}\n\nRespond with a single JSON object with exactly these fields: \
             {{mood,genre,theme,instrument,vocals,lyricThemes,narrative,confidence}}. \
             No prose, no markdown fences.",
            MOODS, GENRES, THEMES, INSTRUMENTS, VOCALS
        )
    }

    fn user_prompt(&self, title: &str, bpm: Option<u32>, hints: &[String]) -> String {
        format!(
            "Title: {title}\nBPM: {}\nDetected sound hints: {}",
            bpm.map(|b| b.to_string()).unwrap_or_else(|| "unknown".to_string()),
            if hints.is_empty() { "none".to_string() } else { hints.join(", ") }
        )
    }

    fn temperature(&self) -> f32 {
        let lowered = self.model.to_lowercase();
        if LARGE_MODEL_MARKERS.iter().any(|m| lowered.contains(m)) {
            LARGE_MODEL_TEMPERATURE
        } else {
            SMALL_MODEL_TEMPERATURE
        }
    }

    async fn call_chat(&self, title: &str, bpm: Option<u32>, hints: &[String]) -> Result<String, CreativeError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: self.system_prompt() },
                ChatMessage { role: "user", content: self.user_prompt(title, bpm, hints) },
            ],
            stream: false,
            format: "json",
            options: ChatOptions { temperature: self.temperature(), top_p: 0.9 },
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| CreativeError::Offline(e.to_string()))?;

        let body: Value = resp
            .json()
            .await
            .map_err(|e| CreativeError::Offline(e.to_string()))?;

        extract_content(&body).ok_or(CreativeError::ParseError)
    }

    /// Full §4.4 behavioral contract: precheck, prompt, parse-with-repair,
    /// normalize. Never returns `Err` for anything but `ModelMissing` — all
    /// other failures fold into `CreativeFacts::default()` by the caller,
    /// which inspects the returned error's `status_str()`.
    pub async fn analyze(
        &self,
        title: &str,
        bpm: Option<u32>,
        hints: &[String],
    ) -> Result<CreativeFacts, CreativeError> {
        self.precheck_model().await?;

        let content = self.call_chat(title, bpm, hints).await?;

        let raw: RawCreative = serde_json::from_str(&content)
            .or_else(|_| serde_json::from_str(&json_repair::repair(&content)))
            .map_err(|_| CreativeError::ParseError)?;

        Ok(normalize(raw))
    }
}

fn extract_content(body: &Value) -> Option<String> {
    body.pointer("/message/content")
        .or_else(|| body.get("response"))
        .or_else(|| body.get("content"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Map a free-form label onto the closest taxonomy entry, exact match
/// first then `jaro_winkler` fuzzy fallback (§4.4 "separate synonym
/// tables").
fn normalize_one(label: &str, taxonomy: &[&'static str]) -> Option<&'static str> {
    if let Some(exact) = taxonomy.iter().find(|t| t.eq_ignore_ascii_case(label)) {
        return Some(exact);
    }
    taxonomy
        .iter()
        .map(|t| (*t, strsim::jaro_winkler(&label.to_lowercase(), &t.to_lowercase())))
        .filter(|(_, score)| *score >= FUZZY_MATCH_THRESHOLD)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .map(|(t, _)| t)
}

fn normalize_list(labels: &[String], taxonomy: &[&'static str]) -> Vec<String> {
    let mut out = Vec::new();
    for label in labels {
        if let Some(canon) = normalize_one(label, taxonomy) {
            if !out.iter().any(|x: &String| x == canon) {
                out.push(canon.to_string());
            }
        }
    }
    out
}

/// Normalize the `vocals` list (§4.4): unlike the other taxonomy lists, any
/// entry that fails to map forces the whole list to `["No Vocals"]` rather
/// than being silently dropped.
fn normalize_vocals(labels: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    for label in labels {
        match normalize_one(label, VOCALS) {
            Some(canon) => {
                if !out.iter().any(|x: &String| x == canon) {
                    out.push(canon.to_string());
                }
            }
            None => return vec!["No Vocals".to_string()],
        }
    }
    out
}

fn parse_confidence(value: &Value) -> f32 {
    match value {
        Value::Number(n) => {
            let v = n.as_f64().unwrap_or(0.0) as f32;
            if v > 1.0 {
                (v / 2.0).clamp(0.0, 1.0)
            } else {
                v.clamp(0.0, 1.0)
            }
        }
        Value::String(s) => {
            let trimmed = s.trim().trim_end_matches('%');
            trimmed
                .parse::<f32>()
                .map(|v| if s.trim_end().ends_with('%') { (v / 100.0).clamp(0.0, 1.0) } else { v.clamp(0.0, 1.0) })
                .unwrap_or(0.0)
        }
        _ => 0.0,
    }
}

fn normalize(raw: RawCreative) -> CreativeFacts {
    let mut instruments = normalize_list(&raw.instrument, INSTRUMENTS);
    instruments.truncate(MAX_SUGGESTED_INSTRUMENTS);

    let mut facts = CreativeFacts {
        genre: normalize_list(&raw.genre, GENRES),
        mood: normalize_list(&raw.mood, MOODS),
        theme: normalize_list(&raw.theme, THEMES),
        suggested_instruments: instruments,
        vocals: normalize_vocals(&raw.vocals),
        lyric_themes: raw.lyric_themes,
        narrative: raw.narrative,
        confidence: parse_confidence(&raw.confidence),
    };
    facts.enforce_vocals_invariant();
    facts.clamp_narrative();
    facts
}

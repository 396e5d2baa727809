//! Library-wide store shapes (§3, §6): `RhythmDB.json` and `CriteriaDB.json`.

use super::key::TrackKey;
use super::record::TrackRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `RhythmDB.json` — the main store, keyed by [`TrackKey`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MainStore {
    #[serde(default)]
    pub tracks: HashMap<TrackKey, TrackRecord>,
}

/// `CriteriaDB.json` — sorted, deduplicated facet value sets for the UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriteriaStore {
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub mood: Vec<String>,
    #[serde(default)]
    pub instrument: Vec<String>,
    #[serde(default)]
    pub vocals: Vec<String>,
    #[serde(default)]
    pub theme: Vec<String>,
    #[serde(default)]
    pub tempo_bands: Vec<String>,
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub electronic_elements: Vec<String>,
}

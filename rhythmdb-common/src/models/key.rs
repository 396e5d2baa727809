//! Path key normalizer (C1).
//!
//! `TrackKey` is the sole identity used by the library store: a
//! case-insensitive, forward-slash-normalized absolute path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Case-insensitive, forward-slash-normalized path identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackKey(String);

impl TrackKey {
    /// Derive the canonical key for a path: replace backslashes with
    /// forward slashes, then lowercase. No existence check; idempotent.
    pub fn derive(path: impl AsRef<Path>) -> Self {
        Self(key(&path.as_ref().to_string_lossy()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackKey {
    fn from(s: &str) -> Self {
        Self(key(s))
    }
}

/// Normalize a raw path string into a track key: `\` -> `/`, then lowercase.
pub fn key(raw: &str) -> String {
    raw.replace('\\', "/").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separator_and_case_collapse() {
        let a = TrackKey::derive("/Music/Song.mp3");
        let b = TrackKey::derive("/music/Song.MP3");
        assert_eq!(a, b);

        let c = TrackKey::derive("C:\\Music\\Song.mp3");
        let d = TrackKey::derive("c:/music/song.mp3");
        assert_eq!(c, d);
    }

    #[test]
    fn idempotent() {
        let once = key("/Music/Song.MP3");
        let twice = key(&once);
        assert_eq!(once, twice);
    }
}

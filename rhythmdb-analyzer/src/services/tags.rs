//! Tag adapter (C2, §4.2): lofty as the primary, format-agnostic reader,
//! with `id3` layered on top for the frame-level `TBPM` text lofty doesn't
//! expose directly. Read shape grounded on the teacher's
//! `MetadataExtractor::extract` (`lofty::probe::Probe::open(..).read()`,
//! `primary_tag().or_else(first_tag)`).

use lofty::file::TaggedFileExt;
use lofty::prelude::*;
use lofty::probe::Probe;
use rhythmdb_common::models::TagMap;
use std::path::Path;

use crate::error::TagError;
use id3::TagLike;

pub struct TagReader;

impl TagReader {
    pub fn new() -> Self {
        Self
    }

    /// §4.2: failure here is non-fatal — callers get [`TagMap::default`].
    pub fn read(&self, path: &Path) -> TagMap {
        match self.try_read(path) {
            Ok(tags) => tags,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "tag read failed, using empty tags");
                TagMap::default()
            }
        }
    }

    fn try_read(&self, path: &Path) -> Result<TagMap, TagError> {
        let tagged_file = Probe::open(path)
            .map_err(|e| TagError::ReadFailed(e.to_string()))?
            .read()
            .map_err(|e| TagError::ReadFailed(e.to_string()))?;

        let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
            return Ok(TagMap::default());
        };

        let mut tags = TagMap {
            title: tag.title().map(|s| s.to_string()),
            artist: tag.artist().map(|s| s.to_string()),
            album: tag.album().map(|s| s.to_string()),
            year: tag.year().map(|y| y as i32),
            genre: tag.genre().map(|g| vec![g.to_string()]).unwrap_or_default(),
            track: tag.track(),
            comment: tag.comment().map(|s| s.to_string()),
            composer: None,
            copyright: None,
            tbpm: None,
            key: None,
            mood: None,
        };

        // id3 frame-level extraction for fields lofty's generic `Tag`
        // doesn't surface: raw `TBPM`, `TCOM`, `TCOP`, `TKEY`, `TMOO`.
        if let Ok(id3_tag) = id3::Tag::read_from_path(path) {
            tags.tbpm = id3_tag.get("TBPM").and_then(|f| f.content().text()).map(str::to_string);
            tags.composer = id3_tag.get("TCOM").and_then(|f| f.content().text()).map(str::to_string);
            tags.copyright = id3_tag.get("TCOP").and_then(|f| f.content().text()).map(str::to_string);
            tags.key = id3_tag.get("TKEY").and_then(|f| f.content().text()).map(str::to_string);
            tags.mood = id3_tag.get("TMOO").and_then(|f| f.content().text()).map(str::to_string);
        }

        Ok(tags)
    }
}

impl Default for TagReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_default_tags_not_a_panic() {
        let reader = TagReader::new();
        let tags = reader.read(Path::new("/nonexistent/file.mp3"));
        assert_eq!(tags, TagMap::default());
    }
}

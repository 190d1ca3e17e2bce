//! Lyric provider capability
//!
//! A provider returns the raw lyric payload for a track id, or nothing. How
//! it gets there (file, network, cache) is its own business. Failures never
//! reach the lyric view: they degrade to the placeholder line.

use crate::error::{Error, Result};
use async_trait::async_trait;
use bana_common::lyrics::{parse_lyric_payload, placeholder_lines};
use bana_common::{LyricLine, Track, TrackId};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[async_trait]
pub trait LyricProvider: Send + Sync {
    /// Raw LRC text (or `{"lyric": ...}` envelope), `None` if there is none
    async fn fetch_lyric_payload(&self, track_id: &TrackId) -> Result<Option<String>>;
}

/// Reads `<dir>/<track id>.lrc`
#[derive(Debug, Clone)]
pub struct FileLyricProvider {
    dir: PathBuf,
}

impl FileLyricProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, track_id: &TrackId) -> PathBuf {
        self.dir.join(format!("{}.lrc", track_id))
    }
}

#[async_trait]
impl LyricProvider for FileLyricProvider {
    async fn fetch_lyric_payload(&self, track_id: &TrackId) -> Result<Option<String>> {
        let path = self.path_for(track_id);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No lyric file");
                Ok(None)
            }
            Err(e) => Err(Error::Provider(format!("{}: {}", path.display(), e))),
        }
    }
}

/// Parsed lines for `payload`, or the placeholder line for `track`
pub fn lines_or_placeholder(track: &Track, payload: Option<&str>) -> Vec<LyricLine> {
    match parse_lyric_payload(payload) {
        Ok(lines) => lines,
        Err(e) => {
            debug!(track_id = %track.id, error = %e, "Using placeholder lyrics");
            placeholder_lines(track)
        }
    }
}

/// Fetch and parse lyrics for `track`; never fails
pub async fn load_lyrics(provider: &dyn LyricProvider, track: &Track) -> Vec<LyricLine> {
    let payload = match provider.fetch_lyric_payload(&track.id).await {
        Ok(payload) => payload,
        Err(e) => {
            warn!(track_id = %track.id, error = %e, "Lyric fetch failed");
            None
        }
    };
    lines_or_placeholder(track, payload.as_deref())
}

//! Track value type and playlist file loading
//!
//! Tracks are produced by the catalog/search layer and are never mutated by
//! the playback core. Two tracks are the same track when their ids match,
//! regardless of the remaining metadata.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;

/// Opaque track identifier assigned by the catalog layer
///
/// Catalog payloads carry ids either as strings or as integers; both forms
/// deserialize into the same textual identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TrackId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for TrackId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for TrackId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Self(text),
            RawId::Number(number) => Self(number.to_string()),
        })
    }
}

/// Immutable track descriptor
///
/// Field aliases accept the catalog API's native names
/// (`song`, `sing`, `pic`, `url`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Catalog identifier (equality key)
    pub id: TrackId,

    /// Song title
    #[serde(alias = "song")]
    pub title: String,

    /// Performing artist
    #[serde(alias = "sing")]
    pub artist: String,

    /// Artwork reference (URL or path), opaque to the core
    #[serde(default, alias = "pic")]
    pub artwork_ref: String,

    /// Audio source reference handed to the device on bind
    #[serde(alias = "url")]
    pub source_ref: String,
}

impl Track {
    pub fn new(
        id: impl Into<TrackId>,
        title: impl Into<String>,
        artist: impl Into<String>,
        source_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            artwork_ref: String::new(),
            source_ref: source_ref.into(),
        }
    }

    /// "{title} - {artist}", used for placeholders and log lines
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.title, self.artist)
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Track {}

/// Playlist file envelope: either a bare array or `{ "data": [...] }`
#[derive(Deserialize)]
#[serde(untagged)]
enum PlaylistDocument {
    Bare(Vec<Track>),
    Wrapped { data: Vec<Track> },
}

/// Parse a playlist JSON document into an ordered track list
pub fn parse_playlist(json: &str) -> Result<Vec<Track>> {
    let document: PlaylistDocument = serde_json::from_str(json.trim())?;
    let tracks = match document {
        PlaylistDocument::Bare(tracks) => tracks,
        PlaylistDocument::Wrapped { data } => data,
    };
    Ok(tracks)
}

/// Load a playlist JSON file from disk
pub fn load_playlist(path: &Path) -> Result<Vec<Track>> {
    let content = std::fs::read_to_string(path)?;
    let tracks = parse_playlist(&content)?;
    if tracks.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Playlist contains no tracks: {}",
            path.display()
        )));
    }
    Ok(tracks)
}

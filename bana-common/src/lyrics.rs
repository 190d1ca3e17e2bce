//! LRC lyric parsing
//!
//! Converts a raw timestamped-text payload into an ordered, deduplicated
//! sequence of [`LyricLine`]s.
//!
//! Accepted tag forms are `[mm:ss]` and `[mm:ss.f]`, `[mm:ss.ff]`,
//! `[mm:ss.fff]`. A single raw line may carry several tags
//! (`[00:10.00][00:20.00]chorus`), producing one line per tag. Lines without
//! a tag, or whose text is empty once tags are removed, are skipped
//! (this drops `[ar:...]`/`[ti:...]` metadata headers as well).

use crate::track::Track;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

static TIME_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(\d{2}):(\d{2})(?:\.(\d{1,3}))?\]").expect("time tag pattern is valid")
});

/// One timed lyric line
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LyricLine {
    /// Line start time in milliseconds
    pub time_ms: u64,
    /// Line text
    pub text: String,
}

impl LyricLine {
    pub fn new(time_ms: u64, text: impl Into<String>) -> Self {
        Self {
            time_ms,
            text: text.into(),
        }
    }
}

/// JSON envelope some lyric endpoints wrap the LRC text in
#[derive(Debug, Deserialize)]
struct LyricEnvelope {
    #[serde(default)]
    lyric: Option<String>,
}

/// Parse LRC text into lines sorted ascending by time, deduplicated by
/// (time, text)
pub fn parse_lrc(text: &str) -> Vec<LyricLine> {
    let mut lines = Vec::new();

    for raw in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let tags: Vec<Captures<'_>> = TIME_TAG.captures_iter(raw).collect();
        if tags.is_empty() {
            continue;
        }

        let pure_text = TIME_TAG.replace_all(raw, "").trim().to_string();
        if pure_text.is_empty() {
            continue;
        }

        for caps in &tags {
            lines.push(LyricLine::new(tag_to_ms(caps), pure_text.clone()));
        }
    }

    normalize_lines(&mut lines);
    lines
}

/// Sort ascending by time and drop repeated (time, text) pairs
///
/// The sort is stable, so source order survives among equal timestamps.
pub fn normalize_lines(lines: &mut Vec<LyricLine>) {
    lines.sort_by_key(|line| line.time_ms);

    let mut seen = HashSet::new();
    lines.retain(|line| seen.insert((line.time_ms, line.text.clone())));
}

fn tag_to_ms(caps: &Captures<'_>) -> u64 {
    let field = |i: usize| {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };
    let minutes = field(1);
    let seconds = field(2);

    // Fraction may be tenths, hundredths or milliseconds
    let millis = match caps.get(3).map(|m| m.as_str()) {
        None => 0,
        Some(fraction) => {
            let value = fraction.parse::<u64>().unwrap_or(0);
            match fraction.len() {
                1 => value * 100,
                2 => value * 10,
                _ => value,
            }
        }
    };

    minutes * 60_000 + seconds * 1_000 + millis
}

/// Decode a lyric provider payload into lines
///
/// The payload may be raw LRC text or a JSON envelope `{"lyric": "..."}`.
///
/// # Errors
///
/// Returns [`Error::PayloadParse`] when the payload is absent, blank, an
/// undecodable envelope, or contains no timestamped lines.
pub fn parse_lyric_payload(payload: Option<&str>) -> Result<Vec<LyricLine>> {
    let payload = payload
        .map(str::trim)
        .ok_or_else(|| Error::PayloadParse("lyric payload absent".to_string()))?;
    if payload.is_empty() {
        return Err(Error::PayloadParse("lyric payload empty".to_string()));
    }

    let text = if payload.starts_with('{') {
        let envelope: LyricEnvelope = serde_json::from_str(payload)
            .map_err(|e| Error::PayloadParse(format!("invalid lyric envelope: {}", e)))?;
        envelope.lyric.unwrap_or_default()
    } else {
        payload.to_string()
    };

    if text.trim().is_empty() {
        return Err(Error::PayloadParse("lyric text empty".to_string()));
    }

    let lines = parse_lrc(&text);
    if lines.is_empty() {
        return Err(Error::PayloadParse("no timestamped lines found".to_string()));
    }
    Ok(lines)
}

/// Single-line stand-in so a lyric view never renders fully blank
pub fn placeholder_lines(track: &Track) -> Vec<LyricLine> {
    vec![LyricLine::new(0, track.display_name())]
}

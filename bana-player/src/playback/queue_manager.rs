//! Queue Navigator
//!
//! Deterministic traversal over an ordered track list handed over by the UI
//! layer. Navigation only moves the cursor and returns the selected track;
//! starting playback is the caller's job.
//!
//! The list may contain the same track id more than once. The cursor is an
//! index, so duplicates are distinct positions.

use bana_common::Track;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// What to play after a track completes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    /// Next item, wrapping to the start
    #[default]
    Sequential,
    /// Same item again
    RepeatOne,
    /// Random item other than the current one
    Shuffle,
}

impl std::fmt::Display for PlayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayMode::Sequential => write!(f, "sequential"),
            PlayMode::RepeatOne => write!(f, "repeat_one"),
            PlayMode::Shuffle => write!(f, "shuffle"),
        }
    }
}

impl std::str::FromStr for PlayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" | "order" => Ok(PlayMode::Sequential),
            "repeat_one" | "repeat-one" | "single" => Ok(PlayMode::RepeatOne),
            "shuffle" | "random" => Ok(PlayMode::Shuffle),
            other => Err(format!("unknown play mode '{}'", other)),
        }
    }
}

#[derive(Debug, Default)]
struct QueueInner {
    items: Vec<Track>,
    /// None when the queue is empty or the requested track was absent
    current_index: Option<usize>,
}

/// Ordered track list plus cursor
///
/// All operations take `&self`; each navigation call updates the cursor
/// under one write lock.
#[derive(Debug, Default)]
pub struct QueueNavigator {
    inner: RwLock<QueueInner>,
}

impl QueueNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, QueueInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, QueueInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the list and point the cursor at `track`
    ///
    /// Returns the new cursor. A track absent from `items` leaves the cursor
    /// unset, making navigation a no-op until a valid queue is set.
    pub fn set_queue_and_current(&self, items: Vec<Track>, track: &Track) -> Option<usize> {
        let current_index = items.iter().position(|item| item.id == track.id);
        if current_index.is_none() {
            warn!(track_id = %track.id, queue_len = items.len(), "Current track not in queue");
        }

        let mut inner = self.write();
        inner.items = items;
        inner.current_index = current_index;
        debug!(queue_len = inner.items.len(), ?current_index, "Queue replaced");
        current_index
    }

    /// Advance one position, wrapping last to first
    pub fn next(&self) -> Option<Track> {
        let mut inner = self.write();
        let len = inner.items.len();
        let current = inner.current_index.filter(|_| len > 0)?;

        let index = (current + 1) % len;
        inner.current_index = Some(index);
        Some(inner.items[index].clone())
    }

    /// Step back one position, wrapping first to last
    pub fn previous(&self) -> Option<Track> {
        let mut inner = self.write();
        let len = inner.items.len();
        let current = inner.current_index.filter(|_| len > 0)?;

        let index = (current + len - 1) % len;
        inner.current_index = Some(index);
        Some(inner.items[index].clone())
    }

    /// Jump to a uniformly random position
    pub fn random(&self, exclude_current: bool) -> Option<Track> {
        self.random_with(&mut rand::thread_rng(), exclude_current)
    }

    /// [`random`](Self::random) with a caller-supplied generator
    ///
    /// With `exclude_current` and more than one item, the current position is
    /// never selected.
    pub fn random_with<R: Rng + ?Sized>(&self, rng: &mut R, exclude_current: bool) -> Option<Track> {
        let mut inner = self.write();
        let len = inner.items.len();
        if len == 0 {
            return None;
        }

        let index = match inner.current_index {
            Some(current) if exclude_current && len > 1 => {
                // Draw from the len-1 other slots, skipping over current
                let pick = rng.gen_range(0..len - 1);
                if pick >= current {
                    pick + 1
                } else {
                    pick
                }
            }
            _ => rng.gen_range(0..len),
        };

        inner.current_index = Some(index);
        Some(inner.items[index].clone())
    }

    /// Current track, without moving
    pub fn repeat_current(&self) -> Option<Track> {
        self.current()
    }

    /// Pick the follow-up track for `mode`
    pub fn advance(&self, mode: PlayMode) -> Option<Track> {
        match mode {
            PlayMode::Sequential => self.next(),
            PlayMode::RepeatOne => self.repeat_current(),
            PlayMode::Shuffle => self.random(true),
        }
    }

    pub fn current(&self) -> Option<Track> {
        let inner = self.read();
        inner
            .current_index
            .and_then(|index| inner.items.get(index).cloned())
    }

    pub fn current_index(&self) -> Option<usize> {
        self.read().current_index
    }

    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().items.is_empty()
    }

    /// Snapshot of the list
    pub fn items(&self) -> Vec<Track> {
        self.read().items.clone()
    }
}

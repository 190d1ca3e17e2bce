//! Playback state

use bana_common::events::PlaybackStatus;
use bana_common::Track;
use serde::{Deserialize, Serialize};

/// Playback state, with the track it concerns
///
/// Exactly one exists at a time, owned by the controller task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "track", rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Preparing(Track),
    Playing(Track),
    Paused(Track),
    Stopped,
}

impl PlaybackState {
    pub fn track(&self) -> Option<&Track> {
        match self {
            PlaybackState::Preparing(track)
            | PlaybackState::Playing(track)
            | PlaybackState::Paused(track) => Some(track),
            PlaybackState::Idle | PlaybackState::Stopped => None,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        match self {
            PlaybackState::Idle => PlaybackStatus::Idle,
            PlaybackState::Preparing(_) => PlaybackStatus::Preparing,
            PlaybackState::Playing(_) => PlaybackStatus::Playing,
            PlaybackState::Paused(_) => PlaybackStatus::Paused,
            PlaybackState::Stopped => PlaybackStatus::Stopped,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing(_))
    }

    /// States in which a device binding must be held
    pub fn expects_device(&self) -> bool {
        self.track().is_some()
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.track() {
            Some(track) => write!(f, "{} ({})", self.status(), track.id),
            None => write!(f, "{}", self.status()),
        }
    }
}

//! Event types for the Bana event system
//!
//! Provides the shared [`PlayerEvent`] enum and the [`EventBus`] used by the
//! playback controller to publish state changes to any number of listeners
//! (UI layers, loggers, remote front ends).

use crate::track::TrackId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Coarse playback status, without the associated track
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Idle,
    Preparing,
    Playing,
    Paused,
    Stopped,
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackStatus::Idle => write!(f, "idle"),
            PlaybackStatus::Preparing => write!(f, "preparing"),
            PlaybackStatus::Playing => write!(f, "playing"),
            PlaybackStatus::Paused => write!(f, "paused"),
            PlaybackStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Position/duration pair published on every progress tick
///
/// `duration_ms` is 0 until the device reports it; once known,
/// `position_ms <= duration_ms`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub position_ms: u64,
    pub duration_ms: u64,
}

impl ProgressSnapshot {
    pub fn new(position_ms: u64, duration_ms: u64) -> Self {
        let position_ms = if duration_ms > 0 {
            position_ms.min(duration_ms)
        } else {
            position_ms
        };
        Self {
            position_ms,
            duration_ms,
        }
    }
}

/// Player event types
///
/// Events are broadcast via EventBus and can be serialized for forwarding
/// to remote front ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Playback state changed
    PlaybackStateChanged {
        /// Status before change
        old_state: PlaybackStatus,
        /// Status after change
        new_state: PlaybackStatus,
        /// When state changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Device reported ready and playback began
    TrackStarted {
        track_id: TrackId,
        /// Duration reported by the device (0 if unknown)
        duration_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Periodic progress update while playing
    PlaybackProgress {
        track_id: TrackId,
        position_ms: u64,
        duration_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Track ran to its natural end
    TrackCompleted {
        track_id: TrackId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Device acquisition or runtime failure stopped playback
    PlaybackFailed {
        /// Track being prepared or played, if any
        track_id: Option<TrackId>,
        /// Human-readable diagnostic
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use bana_common::events::{EventBus, PlayerEvent, PlaybackStatus};
///
/// let event_bus = EventBus::new(16);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(PlayerEvent::PlaybackStateChanged {
///     old_state: PlaybackStatus::Paused,
///     new_state: PlaybackStatus::Playing,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// A capacity of 0 is raised to 1 (broadcast channels require at least one slot).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }
}

//! Shared playback state
//!
//! Last-known values published by the controller task for lock-free reads
//! from any thread. Only the controller task writes here; readers may observe
//! a value one transition behind, never a torn one.

use crate::playback::state::PlaybackState;
use bana_common::events::ProgressSnapshot;
use bana_common::Track;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared state accessible by all components
///
/// Uses atomics for the scalar accessors polled on every UI frame, and a
/// std RwLock for the rarely-written structured values.
#[derive(Debug)]
pub struct SharedState {
    /// Full playback state (includes the associated track)
    playback_state: RwLock<PlaybackState>,

    /// Current track; kept after completion or failure, cleared by stop
    current_track: RwLock<Option<Track>>,

    /// True iff state is Playing
    playing: AtomicBool,

    /// Cached playhead in milliseconds
    position_ms: AtomicU64,

    /// Cached duration in milliseconds (0 while unknown)
    duration_ms: AtomicU64,

    /// True iff a device binding is held (pending or bound)
    device_bound: AtomicBool,

    /// True iff the progress broadcaster is running
    broadcasting: AtomicBool,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            playback_state: RwLock::new(PlaybackState::Idle),
            current_track: RwLock::new(None),
            playing: AtomicBool::new(false),
            position_ms: AtomicU64::new(0),
            duration_ms: AtomicU64::new(0),
            device_bound: AtomicBool::new(false),
            broadcasting: AtomicBool::new(false),
        }
    }

    fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
        lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
        lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn playback_state(&self) -> PlaybackState {
        Self::read(&self.playback_state).clone()
    }

    pub(crate) fn set_playback_state(&self, state: PlaybackState) {
        self.playing.store(state.is_playing(), Ordering::SeqCst);
        *Self::write(&self.playback_state) = state;
    }

    pub fn current_track(&self) -> Option<Track> {
        Self::read(&self.current_track).clone()
    }

    pub(crate) fn set_current_track(&self, track: Option<Track>) {
        *Self::write(&self.current_track) = track;
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms.load(Ordering::SeqCst)
    }

    pub(crate) fn set_position_ms(&self, position_ms: u64) {
        self.position_ms.store(position_ms, Ordering::SeqCst);
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms.load(Ordering::SeqCst)
    }

    pub(crate) fn set_duration_ms(&self, duration_ms: u64) {
        self.duration_ms.store(duration_ms, Ordering::SeqCst);
    }

    pub(crate) fn set_progress(&self, snapshot: ProgressSnapshot) {
        self.duration_ms.store(snapshot.duration_ms, Ordering::SeqCst);
        self.position_ms.store(snapshot.position_ms, Ordering::SeqCst);
    }

    pub fn progress(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            position_ms: self.position_ms(),
            duration_ms: self.duration_ms(),
        }
    }

    pub fn has_device(&self) -> bool {
        self.device_bound.load(Ordering::SeqCst)
    }

    pub(crate) fn set_device_bound(&self, bound: bool) {
        self.device_bound.store(bound, Ordering::SeqCst);
    }

    pub fn is_broadcasting(&self) -> bool {
        self.broadcasting.load(Ordering::SeqCst)
    }

    pub(crate) fn set_broadcasting(&self, running: bool) {
        self.broadcasting.store(running, Ordering::SeqCst);
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

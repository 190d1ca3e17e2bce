//! Observer registration on the controller
//!
//! Three notification kinds are exposed: progress ticks, natural track
//! completion and playing-state changes. Each accepts any number of
//! observers, each independently removable by its [`ObserverHandle`].
//!
//! The `set_*_listener` family keeps one replaceable slot per kind on top of
//! the same registries: setting a slot listener removes the previous slot
//! listener and registers the new one.

use super::core::PlaybackController;
use crate::observers::{ObserverHandle, ObserverRegistry};
use bana_common::events::ProgressSnapshot;
use bana_common::Track;
use std::sync::{Mutex, MutexGuard};

/// Registries shared between the controller handle and its task
#[derive(Debug)]
pub(crate) struct Listeners {
    pub(crate) progress: ObserverRegistry<ProgressSnapshot>,
    pub(crate) completion: ObserverRegistry<Track>,
    pub(crate) playing_state: ObserverRegistry<bool>,
}

impl Listeners {
    pub(crate) fn new() -> Self {
        Self {
            progress: ObserverRegistry::new("progress"),
            completion: ObserverRegistry::new("completion"),
            playing_state: ObserverRegistry::new("playing_state"),
        }
    }
}

/// Handles currently occupying the single-slot listeners
#[derive(Debug, Default)]
pub(crate) struct LegacySlots {
    progress: Option<ObserverHandle>,
    completion: Option<ObserverHandle>,
    playing_state: Option<ObserverHandle>,
}

pub(crate) fn lock_slots(slots: &Mutex<LegacySlots>) -> MutexGuard<'_, LegacySlots> {
    slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PlaybackController {
    /// Observe every progress tick while playing
    pub fn on_progress<F>(&self, observer: F) -> ObserverHandle
    where
        F: Fn(ProgressSnapshot) + Send + Sync + 'static,
    {
        self.listeners().progress.register(observer)
    }

    pub fn remove_progress_observer(&self, handle: ObserverHandle) -> bool {
        self.listeners().progress.remove(handle)
    }

    /// Observe natural completion; receives the completed track
    pub fn on_completion<F>(&self, observer: F) -> ObserverHandle
    where
        F: Fn(Track) + Send + Sync + 'static,
    {
        self.listeners().completion.register(observer)
    }

    pub fn remove_completion_observer(&self, handle: ObserverHandle) -> bool {
        self.listeners().completion.remove(handle)
    }

    /// Observe audible/inaudible transitions
    pub fn on_playing_state_changed<F>(&self, observer: F) -> ObserverHandle
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.listeners().playing_state.register(observer)
    }

    pub fn remove_playing_state_observer(&self, handle: ObserverHandle) -> bool {
        self.listeners().playing_state.remove(handle)
    }

    /// Replace the single-slot progress listener
    pub fn set_progress_listener<F>(&self, listener: F)
    where
        F: Fn(ProgressSnapshot) + Send + Sync + 'static,
    {
        let mut slots = lock_slots(self.slots());
        slots.progress = Some(self.listeners().progress.replace(slots.progress, listener));
    }

    pub fn clear_progress_listener(&self) {
        if let Some(handle) = lock_slots(self.slots()).progress.take() {
            self.listeners().progress.remove(handle);
        }
    }

    /// Replace the single-slot completion listener
    pub fn set_completion_listener<F>(&self, listener: F)
    where
        F: Fn(Track) + Send + Sync + 'static,
    {
        let mut slots = lock_slots(self.slots());
        slots.completion = Some(self.listeners().completion.replace(slots.completion, listener));
    }

    pub fn clear_completion_listener(&self) {
        if let Some(handle) = lock_slots(self.slots()).completion.take() {
            self.listeners().completion.remove(handle);
        }
    }

    /// Replace the single-slot playing-state listener
    pub fn set_playing_state_listener<F>(&self, listener: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let mut slots = lock_slots(self.slots());
        slots.playing_state =
            Some(self.listeners().playing_state.replace(slots.playing_state, listener));
    }

    pub fn clear_playing_state_listener(&self) {
        if let Some(handle) = lock_slots(self.slots()).playing_state.take() {
            self.listeners().playing_state.remove(handle);
        }
    }
}

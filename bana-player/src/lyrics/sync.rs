//! Lyric Sync Engine
//!
//! Maps playback position to the active lyric line and decides whether the
//! lyric view should follow it.
//!
//! The active line is the last line whose start time is at or before the
//! position. Observers hear about it only when it changes. Auto-scroll is
//! requested together with a change unless the user is scrolling the view,
//! or stopped scrolling less than the cool-down ago.

use crate::lyrics::provider::lines_or_placeholder;
use crate::observers::{ObserverHandle, ObserverRegistry};
use bana_common::config::PlayerConfig;
use bana_common::lyrics::normalize_lines;
use bana_common::time::{Clock, MonotonicClock};
use bana_common::{LyricLine, Track};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace};

/// Default quiet period after a manual scroll ends
pub const DEFAULT_AUTO_SCROLL_COOLDOWN_MS: u64 = 2_500;

/// Manual-scroll tracking for the lyric view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionWindow {
    pub is_interacting: bool,
    /// Clock reading of the last start, move or end signal
    pub last_interaction_ms: Option<u64>,
}

impl InteractionWindow {
    /// Auto-scroll is allowed when not interacting and the cool-down since
    /// the last interaction has strictly elapsed
    pub fn allows_auto_scroll(&self, now_ms: u64, cooldown_ms: u64) -> bool {
        !self.is_interacting
            && self
                .last_interaction_ms
                .map_or(true, |last| now_ms.saturating_sub(last) > cooldown_ms)
    }
}

/// Result of a progress tick that changed the active line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LyricUpdate {
    /// New active line, `None` before the first line
    pub index: Option<usize>,
    /// Whether the view should scroll to `index`
    pub auto_scroll: bool,
}

#[derive(Debug, Default)]
struct SyncInner {
    lines: Vec<LyricLine>,
    active: Option<usize>,
    window: InteractionWindow,
}

/// Lyric highlight and auto-scroll decisions for the current track
pub struct LyricSync {
    clock: Arc<dyn Clock>,
    cooldown_ms: u64,
    inner: Mutex<SyncInner>,
    active_line: ObserverRegistry<Option<usize>>,
    auto_scroll: ObserverRegistry<usize>,
}

impl LyricSync {
    pub fn new(clock: Arc<dyn Clock>, cooldown_ms: u64) -> Self {
        Self {
            clock,
            cooldown_ms,
            inner: Mutex::new(SyncInner::default()),
            active_line: ObserverRegistry::new("active_line"),
            auto_scroll: ObserverRegistry::new("auto_scroll"),
        }
    }

    pub fn from_config(config: &PlayerConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, config.lyrics.auto_scroll_cooldown_ms)
    }

    fn lock(&self) -> MutexGuard<'_, SyncInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the line sequence for a new track
    ///
    /// Resets the active line without notifying; the next progress tick
    /// computes and publishes it.
    pub fn set_lines(&self, mut lines: Vec<LyricLine>) {
        normalize_lines(&mut lines);
        let mut inner = self.lock();
        debug!(lines = lines.len(), "Lyric lines replaced");
        inner.lines = lines;
        inner.active = None;
    }

    /// Parse `payload` for `track`, falling back to the placeholder line
    pub fn load_track(&self, track: &Track, payload: Option<&str>) {
        self.set_lines(lines_or_placeholder(track, payload));
    }

    pub fn lines(&self) -> Vec<LyricLine> {
        self.lock().lines.clone()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.lock().active
    }

    /// Interaction start or move: suppress auto-scroll
    pub fn interaction_started(&self) {
        let now = self.clock.now_ms();
        let mut inner = self.lock();
        inner.window.is_interacting = true;
        inner.window.last_interaction_ms = Some(now);
    }

    /// Interaction end: the cool-down starts now
    pub fn interaction_ended(&self) {
        let now = self.clock.now_ms();
        let mut inner = self.lock();
        inner.window.is_interacting = false;
        inner.window.last_interaction_ms = Some(now);
    }

    pub fn interaction_window(&self) -> InteractionWindow {
        self.lock().window
    }

    pub fn should_auto_scroll(&self) -> bool {
        let now = self.clock.now_ms();
        self.lock().window.allows_auto_scroll(now, self.cooldown_ms)
    }

    /// Feed a playback position; negative positions precede every line
    ///
    /// Returns the update when the active line changed, after notifying
    /// observers outside the internal lock.
    pub fn on_progress(&self, position_ms: i64) -> Option<LyricUpdate> {
        let now = self.clock.now_ms();
        let update = {
            let mut inner = self.lock();
            let index = active_index_at(&inner.lines, position_ms);
            if index == inner.active {
                return None;
            }
            inner.active = index;

            let auto_scroll =
                index.is_some() && inner.window.allows_auto_scroll(now, self.cooldown_ms);
            LyricUpdate { index, auto_scroll }
        };

        trace!(position_ms, index = ?update.index, auto_scroll = update.auto_scroll, "Active lyric line changed");
        self.active_line.notify(update.index);
        if let (true, Some(index)) = (update.auto_scroll, update.index) {
            self.auto_scroll.notify(index);
        }
        Some(update)
    }

    pub fn on_active_line_changed<F>(&self, observer: F) -> ObserverHandle
    where
        F: Fn(Option<usize>) + Send + Sync + 'static,
    {
        self.active_line.register(observer)
    }

    pub fn remove_active_line_observer(&self, handle: ObserverHandle) -> bool {
        self.active_line.remove(handle)
    }

    /// Observe auto-scroll requests; receives the line to scroll to
    pub fn on_auto_scroll<F>(&self, observer: F) -> ObserverHandle
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.auto_scroll.register(observer)
    }

    pub fn remove_auto_scroll_observer(&self, handle: ObserverHandle) -> bool {
        self.auto_scroll.remove(handle)
    }
}

impl Default for LyricSync {
    fn default() -> Self {
        Self::new(Arc::new(MonotonicClock::new()), DEFAULT_AUTO_SCROLL_COOLDOWN_MS)
    }
}

impl std::fmt::Debug for LyricSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("LyricSync")
            .field("lines", &inner.lines.len())
            .field("active", &inner.active)
            .field("window", &inner.window)
            .field("cooldown_ms", &self.cooldown_ms)
            .finish()
    }
}

/// Largest index whose time is <= position, in a time-sorted slice
fn active_index_at(lines: &[LyricLine], position_ms: i64) -> Option<usize> {
    if position_ms < 0 {
        return None;
    }
    let position = position_ms as u64;
    lines
        .partition_point(|line| line.time_ms <= position)
        .checked_sub(1)
}

//! Player session
//!
//! Wires the controller to the queue navigator and the lyric sync engine:
//! - progress ticks drive lyric highlighting
//! - natural completion picks the follow-up track for the current
//!   [`PlayMode`] and plays it, unless the session was stopped or
//!   redirected while the follow-up's lyrics were loading
//! - navigation helpers move the queue cursor and play the selected track,
//!   loading its lyrics first

use crate::error::Result;
use crate::lyrics::provider::{lines_or_placeholder, load_lyrics, LyricProvider};
use crate::lyrics::LyricSync;
use crate::observers::ObserverHandle;
use crate::playback::{PlayMode, PlaybackController, PlaybackState, QueueNavigator};
use bana_common::{LyricLine, Track};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct SessionCore {
    controller: PlaybackController,
    queue: Arc<QueueNavigator>,
    lyrics: Arc<LyricSync>,
    provider: Option<Arc<dyn LyricProvider>>,
    mode: RwLock<PlayMode>,
    /// Bumped by every caller play, navigation and stop
    epoch: AtomicU64,
}

impl SessionCore {
    fn mode(&self) -> PlayMode {
        *self.mode.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn bump_epoch(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    async fn fetch_lines(&self, track: &Track) -> Vec<LyricLine> {
        match &self.provider {
            Some(provider) => load_lyrics(provider.as_ref(), track).await,
            None => lines_or_placeholder(track, None),
        }
    }

    async fn play_track(&self, track: Track) -> Result<()> {
        let lines = self.fetch_lines(&track).await;
        self.lyrics.set_lines(lines);
        self.controller.play(track).await
    }

    /// A completion may only advance while nothing else has touched the
    /// session and the controller still rests on the completed track
    fn advance_allowed(&self, completed: &Track, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
            && self.controller.state() == PlaybackState::Stopped
            && self.controller.current_track().as_ref() == Some(completed)
    }

    async fn advance_after_completion(&self, completed: Track, epoch: u64) {
        if !self.advance_allowed(&completed, epoch) {
            debug!(track_id = %completed.id, "Session moved on, not advancing");
            return;
        }

        let mode = self.mode();
        let Some(track) = self.queue.advance(mode) else {
            debug!(track_id = %completed.id, "Queue exhausted or unset, not advancing");
            return;
        };

        let lines = self.fetch_lines(&track).await;
        if !self.advance_allowed(&completed, epoch) {
            debug!(from = %completed.id, to = %track.id, "Auto-advance superseded during lyric fetch");
            return;
        }

        info!(from = %completed.id, to = %track.id, %mode, "Auto-advancing");
        self.lyrics.set_lines(lines);
        if let Err(e) = self.controller.play(track).await {
            warn!(error = %e, "Auto-advance failed");
        }
    }
}

/// Controller, queue and lyric sync working together
pub struct PlayerSession {
    core: Arc<SessionCore>,
    progress_handle: ObserverHandle,
    completion_handle: ObserverHandle,
    advance_task: Mutex<Option<JoinHandle<()>>>,
}

impl PlayerSession {
    /// Attach to a started controller; must be called inside a tokio runtime
    pub fn new(
        controller: PlaybackController,
        lyrics: Arc<LyricSync>,
        provider: Option<Arc<dyn LyricProvider>>,
    ) -> Self {
        let core = Arc::new(SessionCore {
            controller,
            queue: Arc::new(QueueNavigator::new()),
            lyrics,
            provider,
            mode: RwLock::new(PlayMode::default()),
            epoch: AtomicU64::new(0),
        });

        let lyrics = Arc::clone(&core.lyrics);
        let progress_handle = core.controller.on_progress(move |snapshot| {
            lyrics.on_progress(snapshot.position_ms as i64);
        });

        // Completion is observed on the controller task; advancing awaits
        // the controller, so it is handed to a separate task
        let (completed_tx, mut completed_rx) = mpsc::unbounded_channel::<(Track, u64)>();
        let epoch_core = Arc::downgrade(&core);
        let completion_handle = core.controller.on_completion(move |track| {
            if let Some(core) = epoch_core.upgrade() {
                let epoch = core.epoch.load(Ordering::SeqCst);
                let _ = completed_tx.send((track, epoch));
            }
        });

        let advance_core = Arc::clone(&core);
        let advance_task = tokio::spawn(async move {
            while let Some((completed, epoch)) = completed_rx.recv().await {
                advance_core.advance_after_completion(completed, epoch).await;
            }
        });

        Self {
            core,
            progress_handle,
            completion_handle,
            advance_task: Mutex::new(Some(advance_task)),
        }
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.core.controller
    }

    pub fn queue(&self) -> &QueueNavigator {
        &self.core.queue
    }

    pub fn lyrics(&self) -> &Arc<LyricSync> {
        &self.core.lyrics
    }

    pub fn play_mode(&self) -> PlayMode {
        self.core.mode()
    }

    pub fn set_play_mode(&self, mode: PlayMode) {
        *self
            .core
            .mode
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = mode;
        debug!(%mode, "Play mode changed");
    }

    /// Replace the queue and point it at `track`; does not start playback
    pub fn set_queue(&self, items: Vec<Track>, track: &Track) -> Option<usize> {
        self.core.queue.set_queue_and_current(items, track)
    }

    /// Load lyrics for `track` and play it
    pub async fn play(&self, track: Track) -> Result<()> {
        self.core.bump_epoch();
        self.core.play_track(track).await
    }

    /// Stop playback; a pending auto-advance is abandoned
    pub async fn stop(&self) -> Result<()> {
        self.core.bump_epoch();
        self.core.controller.stop().await
    }

    /// Move to and play the next queue item
    pub async fn play_next(&self) -> Result<Option<Track>> {
        self.core.bump_epoch();
        let selected = self.core.queue.next();
        self.play_selected(selected).await
    }

    /// Move to and play the previous queue item
    pub async fn play_previous(&self) -> Result<Option<Track>> {
        self.core.bump_epoch();
        let selected = self.core.queue.previous();
        self.play_selected(selected).await
    }

    /// Move to and play a random queue item
    pub async fn play_random(&self, exclude_current: bool) -> Result<Option<Track>> {
        self.core.bump_epoch();
        let selected = self.core.queue.random(exclude_current);
        self.play_selected(selected).await
    }

    async fn play_selected(&self, selected: Option<Track>) -> Result<Option<Track>> {
        match selected {
            Some(track) => {
                self.core.play_track(track.clone()).await?;
                Ok(Some(track))
            }
            None => Ok(None),
        }
    }

    /// Detach from the controller and clean it up
    pub async fn shutdown(&self) -> Result<()> {
        self.core.bump_epoch();
        self.core.controller.remove_progress_observer(self.progress_handle);
        self.core.controller.remove_completion_observer(self.completion_handle);

        let task = self
            .advance_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(task) = task {
            task.abort();
        }

        self.core.controller.cleanup().await
    }
}

impl std::fmt::Debug for PlayerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerSession")
            .field("controller", &self.core.controller)
            .field("queue_len", &self.core.queue.len())
            .field("mode", &self.core.mode())
            .finish()
    }
}

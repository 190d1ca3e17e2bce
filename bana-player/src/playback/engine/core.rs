//! Controller handle - lifecycle and public operations
//!
//! **Responsibilities:**
//! - Spawning the controller task with its injected backend
//! - Forwarding operations to the mailbox and awaiting their acknowledgement
//! - Lock-free read accessors backed by [`SharedState`]
//! - Teardown (`cleanup`)

use super::actor::SessionActor;
use super::commands::{Ack, Command, PlayCallbacks};
use super::listeners::{LegacySlots, Listeners};
use crate::device::AudioBackend;
use crate::error::{Error, Result};
use crate::playback::state::PlaybackState;
use crate::state::SharedState;
use bana_common::config::PlayerConfig;
use bana_common::events::{EventBus, PlayerEvent, ProgressSnapshot};
use bana_common::Track;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Controller construction parameters
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Progress broadcaster period
    pub progress_interval: Duration,
    /// `PlayerEvent` channel capacity
    pub event_capacity: usize,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_millis(200),
            event_capacity: 100,
        }
    }
}

impl ControllerOptions {
    pub fn from_config(config: &PlayerConfig) -> Self {
        Self {
            progress_interval: config.progress_interval(),
            event_capacity: config.events.capacity,
        }
    }
}

/// Handle to the playback session controller
///
/// Cheap to clone; all clones talk to the same controller task. Construct
/// exactly one per process with [`PlaybackController::start`] and dispose of
/// it with [`PlaybackController::cleanup`].
#[derive(Clone)]
pub struct PlaybackController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    mailbox: mpsc::UnboundedSender<Command>,
    shared: Arc<SharedState>,
    listeners: Arc<Listeners>,
    events: EventBus,
    slots: Mutex<LegacySlots>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackController {
    /// Spawn the controller task on the current tokio runtime
    pub fn start(backend: Arc<dyn AudioBackend>, options: ControllerOptions) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(SharedState::new());
        let listeners = Arc::new(Listeners::new());
        let events = EventBus::new(options.event_capacity);

        let actor = SessionActor::new(
            backend,
            options.progress_interval,
            tx.downgrade(),
            Arc::clone(&shared),
            Arc::clone(&listeners),
            events.clone(),
        );
        let task = tokio::spawn(actor.run(rx));

        info!(
            progress_interval_ms = options.progress_interval.as_millis() as u64,
            "Playback controller initialized"
        );

        Self {
            inner: Arc::new(ControllerInner {
                mailbox: tx,
                shared,
                listeners,
                events,
                slots: Mutex::new(LegacySlots::default()),
                task: Mutex::new(Some(task)),
            }),
        }
    }

    async fn request(&self, command: impl FnOnce(Ack) -> Command) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.inner
            .mailbox
            .send(command(ack))
            .map_err(|_| Error::ControllerClosed)?;
        done.await.map_err(|_| Error::ControllerClosed)
    }

    /// Load and start `track`
    ///
    /// Returns once the request has been applied (state is `Preparing`, or
    /// unchanged if `track` is already playing). Readiness and failure are
    /// reported through observers and events.
    pub async fn play(&self, track: Track) -> Result<()> {
        self.play_with(track, PlayCallbacks::default()).await
    }

    /// [`play`](Self::play) with per-request ready/error callbacks
    pub async fn play_with(&self, track: Track, callbacks: PlayCallbacks) -> Result<()> {
        self.request(|ack| Command::Play {
            track,
            callbacks,
            ack,
        })
        .await
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(|ack| Command::Pause { ack }).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.request(|ack| Command::Resume { ack }).await
    }

    pub async fn toggle(&self) -> Result<()> {
        self.request(|ack| Command::Toggle { ack }).await
    }

    pub async fn seek_to(&self, position_ms: u64) -> Result<()> {
        self.request(|ack| Command::Seek { position_ms, ack }).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.request(|ack| Command::Stop { ack }).await
    }

    /// Stop playback and terminate the controller task
    ///
    /// Process-teardown only. Every later operation on any clone of this
    /// handle fails with [`Error::ControllerClosed`]; calling `cleanup` again
    /// is a no-op.
    pub async fn cleanup(&self) -> Result<()> {
        let task = self
            .inner
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(task) = task else {
            return Ok(());
        };

        // Task may already be gone; joining below still settles it
        let _ = self.request(|ack| Command::Shutdown { ack }).await;

        if let Err(e) = task.await {
            error!(error = %e, "Playback controller task did not exit cleanly");
        }
        info!("Playback controller cleaned up");
        Ok(())
    }

    /// Track loaded by the last `play`; kept after completion or failure
    pub fn current_track(&self) -> Option<Track> {
        self.inner.shared.current_track()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.shared.is_playing()
    }

    /// Last cached playhead in milliseconds
    pub fn current_position(&self) -> u64 {
        self.inner.shared.position_ms()
    }

    /// Last cached duration in milliseconds (0 while unknown)
    pub fn duration(&self) -> u64 {
        self.inner.shared.duration_ms()
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.inner.shared.progress()
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.shared.playback_state()
    }

    /// True while a device binding is held or being acquired
    pub fn has_device(&self) -> bool {
        self.inner.shared.has_device()
    }

    pub fn is_broadcasting(&self) -> bool {
        self.inner.shared.is_broadcasting()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.inner.events.subscribe()
    }

    pub(super) fn listeners(&self) -> &Listeners {
        &self.inner.listeners
    }

    pub(super) fn slots(&self) -> &Mutex<LegacySlots> {
        &self.inner.slots
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("state", &self.state())
            .field("position_ms", &self.current_position())
            .field("duration_ms", &self.duration())
            .finish()
    }
}

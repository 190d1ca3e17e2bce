//! Controller task
//!
//! [`SessionActor`] exclusively owns the playback state, the device binding,
//! the progress broadcaster and the in-flight preparation task. It drains
//! the mailbox one command at a time.
//!
//! Invariants, checked on every transition:
//! - a device binding (pending or bound) is held iff the state is
//!   Preparing, Playing or Paused
//! - the progress broadcaster runs iff the state is Playing
//!
//! Each `play` and `stop` bumps the generation. Bind results and device
//! signals carry the generation they were issued under; anything older than
//! the current generation is discarded.

use super::commands::{Command, PlayCallbacks};
use super::listeners::Listeners;
use crate::device::{AudioBackend, AudioDevice, DeviceSignal, DeviceSignalSender};
use crate::error::{Error, Result};
use crate::observers::call_guarded;
use crate::playback::monitor::{poll_progress, ProgressBroadcaster};
use crate::playback::state::PlaybackState;
use crate::state::SharedState;
use bana_common::events::{EventBus, PlayerEvent, ProgressSnapshot};
use bana_common::Track;
use chrono::Utc;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, WeakUnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Device handle slot
pub(super) enum DeviceBinding {
    /// `bind()` is in flight
    Pending,
    Bound(Box<dyn AudioDevice>),
}

pub(super) struct SessionActor {
    backend: Arc<dyn AudioBackend>,
    progress_interval: Duration,
    mailbox: WeakUnboundedSender<Command>,
    shared: Arc<SharedState>,
    listeners: Arc<Listeners>,
    events: EventBus,

    state: PlaybackState,
    device: Option<DeviceBinding>,
    generation: u64,
    callbacks: PlayCallbacks,
    prepare_task: Option<JoinHandle<()>>,
    broadcaster: Option<ProgressBroadcaster>,
    next_epoch: u64,
}

impl SessionActor {
    pub(super) fn new(
        backend: Arc<dyn AudioBackend>,
        progress_interval: Duration,
        mailbox: WeakUnboundedSender<Command>,
        shared: Arc<SharedState>,
        listeners: Arc<Listeners>,
        events: EventBus,
    ) -> Self {
        Self {
            backend,
            progress_interval,
            mailbox,
            shared,
            listeners,
            events,
            state: PlaybackState::Idle,
            device: None,
            generation: 0,
            callbacks: PlayCallbacks::default(),
            prepare_task: None,
            broadcaster: None,
            next_epoch: 0,
        }
    }

    pub(super) async fn run(mut self, mut rx: UnboundedReceiver<Command>) {
        info!("Playback controller task started");

        while let Some(command) = rx.recv().await {
            trace!(command = command.name(), generation = self.generation, "Handling command");
            if self.handle(command).is_break() {
                break;
            }
        }

        self.teardown();
        info!("Playback controller task exited");
    }

    pub(super) fn handle(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Play {
                track,
                callbacks,
                ack,
            } => {
                self.play(track, callbacks);
                let _ = ack.send(());
            }
            Command::Pause { ack } => {
                self.pause();
                let _ = ack.send(());
            }
            Command::Resume { ack } => {
                self.resume();
                let _ = ack.send(());
            }
            Command::Toggle { ack } => {
                if self.state.is_playing() {
                    self.pause();
                } else {
                    self.resume();
                }
                let _ = ack.send(());
            }
            Command::Seek { position_ms, ack } => {
                self.seek(position_ms);
                let _ = ack.send(());
            }
            Command::Stop { ack } => {
                self.stop();
                let _ = ack.send(());
            }
            Command::Shutdown { ack } => {
                self.stop();
                let _ = ack.send(());
                return ControlFlow::Break(());
            }
            Command::Bound { generation, result } => self.on_bound(generation, result),
            Command::Signal { generation, signal } => self.on_signal(generation, signal),
            Command::Tick { epoch } => self.on_tick(epoch),
        }
        ControlFlow::Continue(())
    }

    // ---- caller operations ----

    fn play(&mut self, track: Track, callbacks: PlayCallbacks) {
        if let PlaybackState::Playing(current) = &self.state {
            if *current == track {
                debug!(track_id = %track.id, "Already playing requested track");
                return;
            }
        }

        self.generation += 1;
        self.cancel_preparation();
        self.stop_broadcaster();
        self.release_device();

        self.callbacks = callbacks;
        self.shared.set_current_track(Some(track.clone()));
        self.shared.set_progress(ProgressSnapshot::default());
        self.device = Some(DeviceBinding::Pending);

        info!(track_id = %track.id, generation = self.generation, "Preparing track: {}", track.display_name());
        self.spawn_preparation(&track);
        self.transition(PlaybackState::Preparing(track));
    }

    fn pause(&mut self) {
        let PlaybackState::Playing(track) = &self.state else {
            debug!(state = %self.state, "Pause ignored");
            return;
        };
        let track = track.clone();

        let Some(DeviceBinding::Bound(device)) = self.device.as_mut() else {
            return;
        };
        if let Err(e) = device.pause() {
            self.fail(e);
            return;
        }
        if let Ok(position_ms) = device.position() {
            let snapshot = ProgressSnapshot::new(position_ms, self.shared.duration_ms());
            self.shared.set_position_ms(snapshot.position_ms);
        }

        self.stop_broadcaster();
        self.transition(PlaybackState::Paused(track));
        self.listeners.playing_state.notify(false);
    }

    fn resume(&mut self) {
        let PlaybackState::Paused(track) = &self.state else {
            debug!(state = %self.state, "Resume ignored");
            return;
        };
        let track = track.clone();

        let position_ms = self.shared.position_ms();
        let duration_ms = self.shared.duration_ms();
        if position_ms >= duration_ms {
            debug!(position_ms, duration_ms, "Resume ignored: playhead at end");
            return;
        }

        let Some(DeviceBinding::Bound(device)) = self.device.as_mut() else {
            return;
        };
        if let Err(e) = device.start() {
            self.fail(e);
            return;
        }

        self.transition(PlaybackState::Playing(track));
        self.start_broadcaster();
        self.listeners.playing_state.notify(true);
    }

    fn seek(&mut self, position_ms: u64) {
        let Some(DeviceBinding::Bound(device)) = self.device.as_mut() else {
            debug!(position_ms, "Seek ignored: no device bound");
            return;
        };

        match device.seek(position_ms) {
            Ok(()) => {
                let snapshot = ProgressSnapshot::new(position_ms, self.shared.duration_ms());
                self.shared.set_position_ms(snapshot.position_ms);
                debug!(position_ms = snapshot.position_ms, "Seeked");
            }
            Err(e) => warn!(position_ms, error = %e, "Seek failed"),
        }
    }

    fn stop(&mut self) {
        self.generation += 1;
        self.cancel_preparation();
        self.stop_broadcaster();
        self.release_device();

        self.callbacks = PlayCallbacks::default();
        self.shared.set_current_track(None);
        self.shared.set_progress(ProgressSnapshot::default());

        self.transition(PlaybackState::Stopped);
        self.listeners.playing_state.notify(false);
    }

    /// Final cleanup when the mailbox loop ends
    fn teardown(&mut self) {
        if self.device.is_some() || self.broadcaster.is_some() || self.prepare_task.is_some() {
            self.stop();
        }
    }

    // ---- device-driven events ----

    fn on_bound(&mut self, generation: u64, result: Result<Box<dyn AudioDevice>>) {
        if generation != self.generation {
            let stale = Error::StaleSignal {
                generation,
                current: self.generation,
            };
            debug!(error = %stale, "Discarding bind result");
            if let Ok(device) = result {
                spawn_release(device);
            }
            return;
        }

        match result {
            Ok(device) => {
                if matches!(self.device, Some(DeviceBinding::Pending)) {
                    debug!(generation, "Device bound");
                    self.device = Some(DeviceBinding::Bound(device));
                } else {
                    debug!(generation, "Bind result without pending binding");
                    spawn_release(device);
                }
            }
            Err(e) => self.fail(e),
        }
    }

    fn on_signal(&mut self, generation: u64, signal: DeviceSignal) {
        if generation != self.generation {
            let stale = Error::StaleSignal {
                generation,
                current: self.generation,
            };
            debug!(error = %stale, ?signal, "Discarding device signal");
            return;
        }

        match signal {
            DeviceSignal::Ready => self.on_ready(),
            DeviceSignal::Error(message) => {
                let error = match self.state {
                    PlaybackState::Preparing(_) => Error::DeviceAcquisition(message),
                    _ => Error::DeviceRuntime(message),
                };
                if self.device.is_some() {
                    self.fail(error);
                } else {
                    debug!(error = %error, "Device error after session ended");
                }
            }
            DeviceSignal::Completed => self.on_completed(),
        }
    }

    fn on_ready(&mut self) {
        let PlaybackState::Preparing(track) = &self.state else {
            debug!(state = %self.state, "Ready signal ignored");
            return;
        };
        let track = track.clone();

        let Some(DeviceBinding::Bound(device)) = self.device.as_mut() else {
            debug!("Ready signal before device bound");
            return;
        };
        if let Err(e) = device.start() {
            self.fail(e);
            return;
        }
        let duration_ms = match device.duration() {
            Ok(duration_ms) => duration_ms,
            Err(e) => {
                debug!(error = %e, "Duration unavailable at start, using 0");
                0
            }
        };
        self.shared.set_duration_ms(duration_ms);

        self.transition(PlaybackState::Playing(track.clone()));
        self.start_broadcaster();
        self.listeners.playing_state.notify(true);
        self.events.emit_lossy(PlayerEvent::TrackStarted {
            track_id: track.id.clone(),
            duration_ms,
            timestamp: Utc::now(),
        });

        info!(track_id = %track.id, duration_ms, "Track started");
        if let Some(on_ready) = self.callbacks.on_ready.take() {
            call_guarded("on_ready", on_ready);
        }
    }

    fn on_completed(&mut self) {
        let track = match &self.state {
            PlaybackState::Playing(track) | PlaybackState::Paused(track) => track.clone(),
            _ => {
                debug!(state = %self.state, "Completion signal ignored");
                return;
            }
        };

        self.cancel_preparation();
        self.stop_broadcaster();
        self.release_device();
        self.shared.set_position_ms(0);
        self.callbacks = PlayCallbacks::default();

        self.transition(PlaybackState::Stopped);
        self.listeners.playing_state.notify(false);
        self.events.emit_lossy(PlayerEvent::TrackCompleted {
            track_id: track.id.clone(),
            timestamp: Utc::now(),
        });

        info!(track_id = %track.id, "Track completed");
        self.listeners.completion.notify(track);
    }

    /// Acquisition or runtime failure: stop and report, never retry
    fn fail(&mut self, error: Error) {
        let message = error.to_string();
        let track_id = self.state.track().map(|t| t.id.clone());
        warn!(state = %self.state, error = %message, "Playback failed");

        self.cancel_preparation();
        self.stop_broadcaster();
        self.release_device();

        self.transition(PlaybackState::Stopped);
        self.listeners.playing_state.notify(false);
        self.events.emit_lossy(PlayerEvent::PlaybackFailed {
            track_id,
            message: message.clone(),
            timestamp: Utc::now(),
        });

        let callbacks = std::mem::take(&mut self.callbacks);
        if let Some(on_error) = callbacks.on_error {
            call_guarded("on_error", move || on_error(message));
        }
    }

    fn on_tick(&mut self, epoch: u64) {
        match &self.broadcaster {
            Some(broadcaster) if broadcaster.epoch() == epoch => {}
            _ => {
                trace!(epoch, "Stale progress tick");
                return;
            }
        }

        let PlaybackState::Playing(track) = &self.state else {
            return;
        };
        let Some(DeviceBinding::Bound(device)) = self.device.as_ref() else {
            return;
        };

        match poll_progress(&**device, self.shared.duration_ms()) {
            Ok(snapshot) => {
                let track_id = track.id.clone();
                self.shared.set_progress(snapshot);
                self.listeners.progress.notify(snapshot);
                self.events.emit_lossy(PlayerEvent::PlaybackProgress {
                    track_id,
                    position_ms: snapshot.position_ms,
                    duration_ms: snapshot.duration_ms,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => debug!(epoch, error = %e, "Progress poll failed, skipping tick"),
        }
    }

    // ---- helpers ----

    fn transition(&mut self, next: PlaybackState) {
        let old_state = self.state.status();
        let new_state = next.status();
        self.state = next;

        self.shared.set_device_bound(self.device.is_some());
        self.shared.set_playback_state(self.state.clone());

        debug_assert_eq!(
            self.device.is_some(),
            self.state.expects_device(),
            "device binding out of sync with state {}",
            self.state
        );
        debug_assert!(
            self.broadcaster.is_none(),
            "broadcaster must be stopped before a transition"
        );

        if old_state != new_state {
            debug!(from = %old_state, to = %new_state, "Playback state changed");
            self.events.emit_lossy(PlayerEvent::PlaybackStateChanged {
                old_state,
                new_state,
                timestamp: Utc::now(),
            });
        }
    }

    fn spawn_preparation(&mut self, track: &Track) {
        let generation = self.generation;
        let backend = Arc::clone(&self.backend);
        let mailbox = self.mailbox.clone();
        let source_ref = track.source_ref.clone();

        self.prepare_task = Some(tokio::spawn(async move {
            let (signals, mut signal_rx) = DeviceSignalSender::channel();
            let result = backend.bind(&source_ref, signals).await;
            let bound = result.is_ok();

            if !post(&mailbox, Command::Bound { generation, result }) || !bound {
                return;
            }

            // Forward device signals in order, after the bind result
            while let Some(signal) = signal_rx.recv().await {
                if !post(&mailbox, Command::Signal { generation, signal }) {
                    break;
                }
            }
            trace!(generation, "Device signal forwarding ended");
        }));
    }

    fn cancel_preparation(&mut self) {
        if let Some(task) = self.prepare_task.take() {
            task.abort();
        }
    }

    fn start_broadcaster(&mut self) {
        self.stop_broadcaster();
        self.next_epoch += 1;
        self.broadcaster = Some(ProgressBroadcaster::spawn(
            self.next_epoch,
            self.progress_interval,
            self.mailbox.clone(),
        ));
        self.shared.set_broadcasting(true);
    }

    fn stop_broadcaster(&mut self) {
        if let Some(broadcaster) = self.broadcaster.take() {
            broadcaster.stop();
        }
        self.shared.set_broadcasting(false);
    }

    fn release_device(&mut self) {
        if let Some(DeviceBinding::Bound(device)) = self.device.take() {
            spawn_release(device);
        }
    }
}

/// Post to the controller mailbox; false once the controller is gone
fn post(mailbox: &WeakUnboundedSender<Command>, command: Command) -> bool {
    match mailbox.upgrade() {
        Some(tx) => tx.send(command).is_ok(),
        None => false,
    }
}

/// Release a device off the controller task, swallowing failures
fn spawn_release(device: Box<dyn AudioDevice>) {
    tokio::task::spawn_blocking(move || {
        if let Err(e) = device.release() {
            warn!(error = %e, "Device release failed");
        }
    });
}

//! Audio device capability
//!
//! The playback core never decodes or outputs audio itself. It consumes an
//! [`AudioBackend`] that binds a source reference to an [`AudioDevice`], and
//! listens for the device's lifecycle signals (ready, error, completion).
//!
//! Signals may be raised from any thread. They are delivered through a
//! [`DeviceSignalSender`] so the controller can redispatch them onto its own
//! serialized task before touching state.

pub mod simulated;

use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

pub use simulated::SimulatedBackend;

/// Lifecycle signal raised by a bound device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSignal {
    /// Source is prepared, `start()` may be called
    Ready,
    /// Device failed; playback cannot continue
    Error(String),
    /// Playback reached the natural end of the source
    Completed,
}

/// Cloneable, thread-safe sink for device signals
///
/// Sending never blocks. Signals sent after the receiving side has gone away
/// (superseded preparation, controller shutdown) are dropped silently.
#[derive(Debug, Clone)]
pub struct DeviceSignalSender {
    tx: mpsc::UnboundedSender<DeviceSignal>,
}

impl DeviceSignalSender {
    /// Create a connected sender/receiver pair
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DeviceSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, signal: DeviceSignal) {
        let _ = self.tx.send(signal);
    }

    pub fn ready(&self) {
        self.send(DeviceSignal::Ready);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(DeviceSignal::Error(message.into()));
    }

    pub fn completed(&self) {
        self.send(DeviceSignal::Completed);
    }
}

/// Factory that binds a source reference to a device
///
/// `bind` may perform file or network I/O and is always awaited off the
/// controller's serialized task.
#[async_trait]
pub trait AudioBackend: Send + Sync + 'static {
    /// Bind `source_ref` to a new device
    ///
    /// The device must eventually raise [`DeviceSignal::Ready`] or
    /// [`DeviceSignal::Error`] on `signals`. A returned `Err` is treated as a
    /// device acquisition failure.
    async fn bind(&self, source_ref: &str, signals: DeviceSignalSender)
        -> Result<Box<dyn AudioDevice>>;
}

/// A bound, exclusively-owned playback device
///
/// Only the playback controller holds a device; nothing else may call it.
pub trait AudioDevice: Send + 'static {
    fn start(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn seek(&mut self, position_ms: u64) -> Result<()>;

    /// Current playhead in milliseconds
    fn position(&self) -> Result<u64>;

    /// Source duration in milliseconds (0 while unknown)
    fn duration(&self) -> Result<u64>;

    /// Tear the device down; may block
    fn release(self: Box<Self>) -> Result<()>;
}

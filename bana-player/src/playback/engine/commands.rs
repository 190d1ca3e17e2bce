//! Controller mailbox messages
//!
//! Every state mutation reaches the controller task as one [`Command`].
//! Caller requests carry a oneshot `ack` completed once the command has been
//! applied. Internal messages (bind results, device signals, progress ticks)
//! are tagged with the generation or epoch they belong to.

use crate::device::{AudioDevice, DeviceSignal};
use crate::error::Result;
use bana_common::Track;
use tokio::sync::oneshot;

pub(crate) type Ack = oneshot::Sender<()>;

/// Optional per-play callbacks
///
/// `on_ready` runs once the device reports ready and playback has started.
/// `on_error` runs with a diagnostic if acquisition or playback fails.
/// A superseded play drops its callbacks without calling them.
#[derive(Default)]
pub struct PlayCallbacks {
    pub(crate) on_ready: Option<Box<dyn FnOnce() + Send>>,
    pub(crate) on_error: Option<Box<dyn FnOnce(String) + Send>>,
}

impl PlayCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_ready<F>(mut self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_ready = Some(Box::new(f));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnOnce(String) + Send + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for PlayCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayCallbacks")
            .field("on_ready", &self.on_ready.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

pub(crate) enum Command {
    Play {
        track: Track,
        callbacks: PlayCallbacks,
        ack: Ack,
    },
    Pause {
        ack: Ack,
    },
    Resume {
        ack: Ack,
    },
    Toggle {
        ack: Ack,
    },
    Seek {
        position_ms: u64,
        ack: Ack,
    },
    Stop {
        ack: Ack,
    },
    Shutdown {
        ack: Ack,
    },

    /// Result of an off-task `bind()`
    Bound {
        generation: u64,
        result: Result<Box<dyn AudioDevice>>,
    },

    /// Device lifecycle signal, redispatched from the device's thread
    Signal {
        generation: u64,
        signal: DeviceSignal,
    },

    /// Progress broadcaster tick
    Tick {
        epoch: u64,
    },
}

impl Command {
    /// Short label for trace logs
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Command::Play { .. } => "play",
            Command::Pause { .. } => "pause",
            Command::Resume { .. } => "resume",
            Command::Toggle { .. } => "toggle",
            Command::Seek { .. } => "seek",
            Command::Stop { .. } => "stop",
            Command::Shutdown { .. } => "shutdown",
            Command::Bound { .. } => "bound",
            Command::Signal { .. } => "signal",
            Command::Tick { .. } => "tick",
        }
    }
}

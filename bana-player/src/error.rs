//! Error types for bana-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for the player crate
#[derive(Error, Debug)]
pub enum Error {
    /// Source could not be bound or prepared
    #[error("Device acquisition failed: {0}")]
    DeviceAcquisition(String),

    /// Mid-playback failure reported by the device
    #[error("Device runtime error: {0}")]
    DeviceRuntime(String),

    /// Device signal from a superseded preparation attempt
    ///
    /// Internal consistency guard; logged, never surfaced to callers.
    #[error("Stale signal discarded (generation {generation}, current {current})")]
    StaleSignal { generation: u64, current: u64 },

    /// Controller has been cleaned up (or its task exited)
    #[error("Playback controller is closed")]
    ControllerClosed,

    /// Lyric or catalog provider failure
    #[error("Provider error: {0}")]
    Provider(String),
}

/// Result type alias using the player Error type
pub type Result<T> = std::result::Result<T, Error>;

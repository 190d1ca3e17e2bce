//! Playback controller, progress broadcaster and queue navigation

pub mod engine;
pub mod monitor;
pub mod queue_manager;
pub mod state;

pub use engine::{ControllerOptions, PlayCallbacks, PlaybackController};
pub use queue_manager::{PlayMode, QueueNavigator};
pub use state::PlaybackState;

//! # Bana Player Library (bana-player)
//!
//! Playback-control core: one active playback session driven through a
//! serialized controller task, a periodic progress broadcaster, queue
//! navigation and time-synchronized lyric highlighting.
//!
//! **Architecture:** The controller owns the device and all playback state.
//! Callers, device signals and progress ticks reach it as messages on one
//! mailbox. Read accessors are served from atomics without a round trip.

pub mod device;
pub mod error;
pub mod lyrics;
pub mod observers;
pub mod playback;
pub mod session;
pub mod state;

pub use error::{Error, Result};
pub use playback::{PlayCallbacks, PlaybackController, PlaybackState};
pub use session::PlayerSession;
pub use state::SharedState;

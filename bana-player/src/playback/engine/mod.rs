//! Playback session controller
//!
//! **Module Structure:**
//! - `core.rs`: `PlaybackController` handle, startup, cleanup, read accessors
//! - `actor.rs`: the serialized controller task owning state and device
//! - `commands.rs`: mailbox messages and per-play callbacks
//! - `listeners.rs`: observer registration (multi-listener and single-slot)
//!
//! All mutating operations are messages on one mailbox drained by a single
//! task, so they interleave but never run concurrently. Device signals and
//! bind results are posted to the same mailbox, tagged with the generation
//! of the play request that produced them; signals from a superseded
//! generation are discarded.

mod actor;
mod commands;
mod core;
mod listeners;

pub(crate) use commands::Command;
pub use commands::PlayCallbacks;
pub use self::core::{ControllerOptions, PlaybackController};

//! # Bana Common Library
//!
//! Shared code for the Bana player crates including:
//! - Track value type and playlist loading
//! - LRC lyric parsing
//! - Event types (PlayerEvent enum, EventBus)
//! - Configuration loading
//! - Clock sources and time formatting

pub mod config;
pub mod error;
pub mod events;
pub mod lyrics;
pub mod time;
pub mod track;

pub use error::{Error, Result};
pub use lyrics::LyricLine;
pub use track::{Track, TrackId};

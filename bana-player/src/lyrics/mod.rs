//! Lyric synchronization and lyric sources

pub mod provider;
pub mod sync;

pub use provider::{load_lyrics, FileLyricProvider, LyricProvider};
pub use sync::{InteractionWindow, LyricSync, LyricUpdate};

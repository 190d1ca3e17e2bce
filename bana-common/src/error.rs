//! Common error types for Bana

use thiserror::Error;

/// Common result type for Bana operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the player crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed TOML configuration file
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Malformed JSON document (playlists, lyric envelopes)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Lyric text malformed or absent
    #[error("Lyric payload error: {0}")]
    PayloadParse(String),

    /// Invalid caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

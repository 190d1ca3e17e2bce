//! Configuration loading and config file resolution
//!
//! Configuration is a small TOML file. Every key has a built-in default, so
//! a missing file (or a missing table inside it) is never fatal.
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `BANA_CONFIG`
//! 3. User config directory (`<config_dir>/bana/config.toml`)
//! 4. Compiled defaults (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "BANA_CONFIG";

const MIN_PROGRESS_INTERVAL_MS: u64 = 50;
const MAX_PROGRESS_INTERVAL_MS: u64 = 5_000;

/// Top-level player configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub playback: PlaybackConfig,
    pub lyrics: LyricsConfig,
    pub events: EventsConfig,
    pub logging: LoggingConfig,
}

/// Playback session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Progress poll interval while playing
    ///
    /// Clamped to 50-5000ms.
    pub progress_interval_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: 200,
        }
    }
}

/// Lyric view settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LyricsConfig {
    /// Quiet period after a manual scroll ends before auto-scroll resumes
    pub auto_scroll_cooldown_ms: u64,
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            auto_scroll_cooldown_ms: 2_500,
        }
    }
}

/// Event bus settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Broadcast channel capacity
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl PlayerConfig {
    /// Parse configuration from TOML text, applying range clamps
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: PlayerConfig = toml::from_str(content)?;
        config.normalize()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Progress poll interval as a `Duration`
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.playback.progress_interval_ms)
    }

    fn normalize(&mut self) -> Result<()> {
        let interval = self.playback.progress_interval_ms;
        let clamped = interval.clamp(MIN_PROGRESS_INTERVAL_MS, MAX_PROGRESS_INTERVAL_MS);
        if clamped != interval {
            warn!(
                requested_ms = interval,
                clamped_ms = clamped,
                "progress_interval_ms out of range, clamping"
            );
            self.playback.progress_interval_ms = clamped;
        }

        if self.events.capacity == 0 {
            return Err(Error::Config("events.capacity must be at least 1".to_string()));
        }

        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(Error::Config(format!(
                "Unknown logging.level '{}'",
                self.logging.level
            )));
        }
        Ok(())
    }
}

/// Resolve which config file (if any) should be read
///
/// Returns `None` when no explicit path is given and the user config file
/// does not exist.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: User config directory
    default_config_path().filter(|path| path.exists())
}

/// `<config_dir>/bana/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bana").join("config.toml"))
}

/// Resolve and load configuration
///
/// Missing files degrade to defaults with a warning; malformed files are
/// errors.
pub fn load_config(cli_arg: Option<&Path>) -> Result<PlayerConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) if path.exists() => {
            info!(path = %path.display(), "Loading configuration");
            PlayerConfig::load_from(&path)
        }
        Some(path) => {
            warn!(path = %path.display(), "Config file not found, using defaults");
            Ok(PlayerConfig::default())
        }
        None => Ok(PlayerConfig::default()),
    }
}

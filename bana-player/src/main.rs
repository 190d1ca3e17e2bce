//! Bana Player (bana-player) - Main entry point
//!
//! Plays a JSON playlist through the simulated audio backend, printing
//! playback progress and synchronized lyric lines (or raw events as JSON).

use std::path::PathBuf;
use std::sync::{Arc, Weak};

use anyhow::{Context, Result};
use bana_common::config::{load_config, LoggingConfig};
use bana_common::events::PlayerEvent;
use bana_common::time::{format_time, MonotonicClock};
use bana_common::track::load_playlist;
use bana_player::device::SimulatedBackend;
use bana_player::lyrics::{FileLyricProvider, LyricProvider, LyricSync};
use bana_player::playback::{ControllerOptions, PlayMode, PlaybackController};
use bana_player::PlayerSession;
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for bana-player
#[derive(Parser, Debug)]
#[command(name = "bana-player")]
#[command(about = "Playback session demo with synchronized lyrics")]
#[command(version)]
struct Args {
    /// Playlist JSON file (array of tracks, or {"data": [...]})
    #[arg(short, long)]
    playlist: PathBuf,

    /// Directory holding <track id>.lrc lyric files
    #[arg(short, long)]
    lyrics_dir: Option<PathBuf>,

    /// Config file (overrides BANA_CONFIG and the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// What to play after a track ends: sequential, repeat_one, shuffle
    #[arg(short, long, default_value = "sequential")]
    mode: PlayMode,

    /// Print every player event as a JSON line instead of text
    #[arg(long)]
    json: bool,

    /// Index of the first track to play
    #[arg(long, default_value = "0")]
    start: usize,

    /// Simulated length of every track in milliseconds
    #[arg(long, default_value = "30000", env = "BANA_TRACK_LENGTH_MS")]
    track_length_ms: u64,

    /// Stop after this many completed tracks (default: playlist length)
    #[arg(long)]
    max_tracks: Option<usize>,
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let level = logging.level.to_ascii_lowercase();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bana_player={level},bana_common={level}")));

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(Arc::new(file))
                        .with_ansi(false),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

/// Print the active lyric line whenever it changes
fn attach_lyric_printer(lyrics: &Arc<LyricSync>) {
    let view: Weak<LyricSync> = Arc::downgrade(lyrics);
    lyrics.on_active_line_changed(move |index| {
        let Some(view) = view.upgrade() else {
            return;
        };
        if let Some(line) = index.and_then(|i| view.lines().get(i).cloned()) {
            println!("    [{}] {}", format_time(line.time_ms), line.text);
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging)?;

    let tracks = load_playlist(&args.playlist)
        .with_context(|| format!("Failed to load playlist {}", args.playlist.display()))?;
    let first = tracks.get(args.start).cloned().with_context(|| {
        format!("--start {} is out of range ({} tracks)", args.start, tracks.len())
    })?;
    let max_tracks = args.max_tracks.unwrap_or(tracks.len());

    info!(
        tracks = tracks.len(),
        mode = %args.mode,
        progress_interval_ms = config.playback.progress_interval_ms,
        "Starting Bana player"
    );

    // Initialize playback controller and session
    let backend = Arc::new(SimulatedBackend::new(args.track_length_ms));
    let controller = PlaybackController::start(backend, ControllerOptions::from_config(&config));
    let lyrics = Arc::new(LyricSync::from_config(&config, Arc::new(MonotonicClock::new())));
    let provider = args
        .lyrics_dir
        .map(|dir| Arc::new(FileLyricProvider::new(dir)) as Arc<dyn LyricProvider>);

    let session = PlayerSession::new(controller.clone(), Arc::clone(&lyrics), provider);
    session.set_play_mode(args.mode);
    session.set_queue(tracks, &first);

    if !args.json {
        attach_lyric_printer(&lyrics);
    }

    let mut events = controller.subscribe_events();
    session.play(first).await.context("Failed to start playback")?;

    let mut completed = 0usize;
    let mut last_second = None;
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event stream lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                if args.json {
                    println!("{}", serde_json::to_string(&event)?);
                }

                match &event {
                    PlayerEvent::TrackStarted { duration_ms, .. } if !args.json => {
                        if let Some(track) = controller.current_track() {
                            println!("> {} ({})", track.display_name(), format_time(*duration_ms));
                        }
                        last_second = None;
                    }
                    PlayerEvent::PlaybackProgress { position_ms, duration_ms, .. } if !args.json => {
                        let second = position_ms / 1000;
                        if last_second != Some(second) {
                            last_second = Some(second);
                            println!("  {} / {}", format_time(*position_ms), format_time(*duration_ms));
                        }
                    }
                    PlayerEvent::TrackCompleted { .. } => {
                        completed += 1;
                        if completed >= max_tracks {
                            info!(completed, "Reached track limit");
                            break;
                        }
                    }
                    PlayerEvent::PlaybackFailed { message, .. } => {
                        error!(%message, "Playback failed");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    session.shutdown().await.context("Failed to shut down player")?;
    info!("Bana player stopped");
    Ok(())
}

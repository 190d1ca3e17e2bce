//! Test helper modules for Bana player integration tests
//!
//! Provides reusable test infrastructure components:
//! - MockBackend: scriptable device backend recording every device call
//! - Track and controller builders
//! - Polling and event-draining utilities

#![allow(dead_code)]

pub mod mock_backend;

pub use mock_backend::{DeviceCall, MockBackend};

use bana_common::events::PlayerEvent;
use bana_common::Track;
use bana_player::playback::{ControllerOptions, PlaybackController};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Track whose source reference is `src-<id>`
pub fn track(id: &str) -> Track {
    Track::new(id, format!("Title {}", id), format!("Artist {}", id), format!("src-{}", id))
}

pub fn source(id: &str) -> String {
    format!("src-{}", id)
}

/// Controller over `backend` with a 200ms progress interval
pub fn start_controller(backend: &MockBackend) -> PlaybackController {
    PlaybackController::start(
        Arc::new(backend.clone()),
        ControllerOptions {
            progress_interval: Duration::from_millis(200),
            event_capacity: 64,
        },
    )
}

/// Poll `condition` every millisecond, panicking after two seconds
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..2_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not reached within 2000 polls");
}

/// Let spawned tasks and the controller mailbox settle
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(5)).await;
}

/// Everything currently buffered on an event receiver
pub fn drain_events(rx: &mut broadcast::Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Play `id` and drive it to Playing via the device's ready signal
pub async fn play_to_ready(
    controller: &PlaybackController,
    backend: &MockBackend,
    id: &str,
) -> usize {
    let bind_index = backend.bind_count();
    controller.play(track(id)).await.unwrap();
    wait_until(|| backend.bind_count() > bind_index).await;
    backend.ready(bind_index);
    wait_until(|| controller.is_playing()).await;
    bind_index
}

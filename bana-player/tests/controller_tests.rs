//! Playback controller integration tests
//!
//! Drives the controller through a scripted backend and checks state
//! transitions, observer notifications, device calls and emitted events.

mod helpers;

use bana_common::events::{PlaybackStatus, PlayerEvent};
use bana_player::playback::PlaybackState;
use bana_player::{Error, PlayCallbacks, PlaybackController};
use helpers::{
    drain_events, play_to_ready, settle, source, start_controller, track, wait_until, DeviceCall,
    MockBackend,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records every playing-state notification
fn record_playing_state(controller: &PlaybackController) -> Arc<Mutex<Vec<bool>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    controller.on_playing_state_changed(move |playing| sink.lock().unwrap().push(playing));
    seen
}

fn assert_device_invariant(controller: &PlaybackController) {
    let state = controller.state();
    assert_eq!(
        controller.has_device(),
        state.expects_device(),
        "device binding out of sync in state {}",
        state
    );
    assert_eq!(controller.is_broadcasting(), state.is_playing());
}

// ============================================================================
// play()
// ============================================================================

/// **Given:** track `a` is playing
/// **When:** `play(a)` is requested again
/// **Then:** no second bind and no second playing-state notification
#[tokio::test]
async fn test_play_is_idempotent_while_playing() {
    let backend = MockBackend::new();
    let controller = start_controller(&backend);
    let seen = record_playing_state(&controller);

    play_to_ready(&controller, &backend, "a").await;
    controller.play(track("a")).await.unwrap();
    settle().await;

    assert_eq!(backend.bind_count(), 1);
    assert_eq!(*seen.lock().unwrap(), vec![true]);
    assert_eq!(controller.state(), PlaybackState::Playing(track("a")));
}

/// **Given:** `play(a)` is preparing
/// **When:** `play(b)` supersedes it and `a`'s ready signal arrives late
/// **Then:** state stays with `b` and `a`'s device is released
#[tokio::test]
async fn test_superseded_ready_signal_is_discarded() {
    let backend = MockBackend::new();
    let controller = start_controller(&backend);

    controller.play(track("a")).await.unwrap();
    wait_until(|| backend.bind_count() == 1).await;
    settle().await;

    controller.play(track("b")).await.unwrap();
    wait_until(|| backend.bind_count() == 2).await;

    backend.ready(0);
    settle().await;
    assert_eq!(controller.state(), PlaybackState::Preparing(track("b")));
    assert!(!controller.is_playing());

    backend.ready(1);
    wait_until(|| controller.is_playing()).await;
    assert_eq!(controller.state(), PlaybackState::Playing(track("b")));
    assert_eq!(controller.current_track(), Some(track("b")));

    wait_until(|| backend.calls().contains(&DeviceCall::Release(source("a")))).await;
    assert_eq!(backend.count_calls(|c| *c == DeviceCall::Start(source("a"))), 0);
}

/// Replacing a playing track releases the old device before binding anew
#[tokio::test]
async fn test_play_new_track_releases_previous_device() {
    let backend = MockBackend::new();
    let controller = start_controller(&backend);

    play_to_ready(&controller, &backend, "a").await;
    play_to_ready(&controller, &backend, "b").await;

    wait_until(|| backend.calls().contains(&DeviceCall::Release(source("a")))).await;
    assert_eq!(backend.bound_sources(), vec![source("a"), source("b")]);
    assert_device_invariant(&controller);
}

// ============================================================================
// Invariants
// ============================================================================

#[tokio::test]
async fn test_device_invariant_across_transitions() {
    let backend = MockBackend::new();
    let controller = start_controller(&backend);
    assert_eq!(controller.state(), PlaybackState::Idle);
    assert_device_invariant(&controller);

    controller.play(track("a")).await.unwrap();
    assert!(matches!(controller.state(), PlaybackState::Preparing(_)));
    assert_device_invariant(&controller);

    wait_until(|| backend.bind_count() == 1).await;
    backend.ready(0);
    wait_until(|| controller.is_playing()).await;
    assert_device_invariant(&controller);

    controller.pause().await.unwrap();
    assert!(matches!(controller.state(), PlaybackState::Paused(_)));
    assert_device_invariant(&controller);

    controller.resume().await.unwrap();
    assert!(controller.is_playing());
    assert_device_invariant(&controller);

    backend.complete(0);
    wait_until(|| controller.state() == PlaybackState::Stopped).await;
    assert_device_invariant(&controller);

    controller.play(track("b")).await.unwrap();
    wait_until(|| backend.bind_count() == 2).await;
    backend.error(1, "unsupported codec");
    wait_until(|| controller.state() == PlaybackState::Stopped).await;
    assert_device_invariant(&controller);

    play_to_ready(&controller, &backend, "c").await;
    controller.stop().await.unwrap();
    assert_eq!(controller.state(), PlaybackState::Stopped);
    assert_device_invariant(&controller);
}

// ============================================================================
// pause() / resume() / toggle()
// ============================================================================

#[tokio::test]
async fn test_pause_and_resume() {
    let backend = MockBackend::new();
    let controller = start_controller(&backend);
    let seen = record_playing_state(&controller);

    play_to_ready(&controller, &backend, "a").await;
    assert_eq!(controller.duration(), 180_000);

    backend.set_position(10_000);
    controller.pause().await.unwrap();
    assert_eq!(controller.state(), PlaybackState::Paused(track("a")));
    assert!(!controller.is_playing());
    assert_eq!(controller.current_position(), 10_000);

    controller.resume().await.unwrap();
    assert!(controller.is_playing());

    assert_eq!(*seen.lock().unwrap(), vec![true, false, true]);
    assert_eq!(
        backend.calls(),
        vec![
            DeviceCall::Start(source("a")),
            DeviceCall::Pause(source("a")),
            DeviceCall::Start(source("a")),
        ]
    );
}

#[tokio::test]
async fn test_pause_and_resume_are_noops_in_wrong_state() {
    let backend = MockBackend::new();
    let controller = start_controller(&backend);
    let seen = record_playing_state(&controller);

    controller.pause().await.unwrap();
    controller.resume().await.unwrap();
    assert_eq!(controller.state(), PlaybackState::Idle);

    play_to_ready(&controller, &backend, "a").await;
    controller.resume().await.unwrap();
    assert_eq!(backend.count_calls(|c| matches!(c, DeviceCall::Start(_))), 1);
    assert_eq!(*seen.lock().unwrap(), vec![true]);
}

#[tokio::test]
async fn test_toggle_flips_between_playing_and_paused() {
    let backend = MockBackend::new();
    let controller = start_controller(&backend);

    play_to_ready(&controller, &backend, "a").await;
    controller.toggle().await.unwrap();
    assert!(matches!(controller.state(), PlaybackState::Paused(_)));
    controller.toggle().await.unwrap();
    assert!(controller.is_playing());
}

/// Paused with the playhead at the end (no completion yet): resume does nothing
#[tokio::test]
async fn test_resume_ignored_when_position_reaches_duration() {
    let backend = MockBackend::new();
    let controller = start_controller(&backend);

    play_to_ready(&controller, &backend, "a").await;
    backend.set_position(180_000);
    controller.pause().await.unwrap();

    controller.resume().await.unwrap();
    assert_eq!(controller.state(), PlaybackState::Paused(track("a")));
    assert_eq!(backend.count_calls(|c| matches!(c, DeviceCall::Start(_))), 1);
}

/// **Given:** a track ran to completion
/// **When:** `resume()` is requested
/// **Then:** no state change and no device call
#[tokio::test]
async fn test_resume_after_completion_is_noop() {
    let backend = MockBackend::new();
    let controller = start_controller(&backend);
    let completions = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&completions);
    controller.on_completion(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });

    play_to_ready(&controller, &backend, "a").await;
    backend.set_position(90_000);
    backend.complete(0);
    wait_until(|| controller.state() == PlaybackState::Stopped).await;
    wait_until(|| backend.calls().contains(&DeviceCall::Release(source("a")))).await;

    assert_eq!(controller.current_position(), 0);
    assert_eq!(completions.load(Ordering::SeqCst), 1);
    let calls_before = backend.calls();

    controller.resume().await.unwrap();
    settle().await;

    assert_eq!(controller.state(), PlaybackState::Stopped);
    assert_eq!(backend.calls(), calls_before);
    assert_eq!(controller.current_track(), Some(track("a")));
}

// ============================================================================
// seek_to()
// ============================================================================

#[tokio::test]
async fn test_seek_without_device_is_silent_noop() {
    let backend = MockBackend::new();
    let controller = start_controller(&backend);

    controller.seek_to(5_000).await.unwrap();

    assert_eq!(controller.current_position(), 0);
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_seek_forwards_and_swallows_errors() {
    let backend = MockBackend::new();
    let controller = start_controller(&backend);
    play_to_ready(&controller, &backend, "a").await;

    controller.seek_to(42_000).await.unwrap();
    assert_eq!(controller.current_position(), 42_000);
    assert!(backend.calls().contains(&DeviceCall::Seek(source("a"), 42_000)));

    controller.pause().await.unwrap();
    controller.seek_to(50_000).await.unwrap();
    assert_eq!(controller.current_position(), 50_000);

    backend.set_fail_seeks(true);
    controller.seek_to(1_000).await.unwrap();
    assert_eq!(controller.current_position(), 50_000);
    assert_eq!(controller.state(), PlaybackState::Paused(track("a")));
}

// ============================================================================
// Failures
// ============================================================================

/// **Given:** the source cannot be bound
/// **When:** it is played with an error callback
/// **Then:** state is Stopped, the callback gets a message and a
/// PlaybackFailed event is published
#[tokio::test]
async fn test_acquisition_failure_reports_through_callback() {
    let backend = MockBackend::new();
    backend.fail_source(&source("bad"));
    let controller = start_controller(&backend);
    let seen = record_playing_state(&controller);
    let mut events = controller.subscribe_events();

    let message = Arc::new(Mutex::new(None::<String>));
    let sink = Arc::clone(&message);
    let callbacks = PlayCallbacks::new()
        .on_ready(|| panic!("ready must not fire"))
        .on_error(move |msg| *sink.lock().unwrap() = Some(msg));

    controller.play_with(track("bad"), callbacks).await.unwrap();
    wait_until(|| message.lock().unwrap().is_some()).await;

    let message = message.lock().unwrap().clone().unwrap();
    assert!(message.contains("cannot open src-bad"), "got: {}", message);
    assert_eq!(controller.state(), PlaybackState::Stopped);
    assert!(!controller.has_device());
    assert_eq!(*seen.lock().unwrap(), vec![false]);

    let failed = drain_events(&mut events).into_iter().any(|e| {
        matches!(e, PlayerEvent::PlaybackFailed { track_id: Some(ref id), .. } if id.as_str() == "bad")
    });
    assert!(failed);
}

#[tokio::test]
async fn test_runtime_error_stops_and_releases() {
    let backend = MockBackend::new();
    let controller = start_controller(&backend);
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);

    controller
        .play_with(
            track("a"),
            PlayCallbacks::new().on_error(move |msg| sink.lock().unwrap().push(msg)),
        )
        .await
        .unwrap();
    wait_until(|| backend.bind_count() == 1).await;
    backend.ready(0);
    wait_until(|| controller.is_playing()).await;

    backend.error(0, "output device unplugged");
    wait_until(|| controller.state() == PlaybackState::Stopped).await;
    wait_until(|| backend.calls().contains(&DeviceCall::Release(source("a")))).await;

    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("output device unplugged"));
    assert!(!controller.is_broadcasting());
}

#[tokio::test]
async fn test_ready_callback_fires_once_playing() {
    let backend = MockBackend::new();
    let controller = start_controller(&backend);
    let ready = Arc::new(AtomicUsize::new(0));
    let r = Arc::clone(&ready);

    controller
        .play_with(
            track("a"),
            PlayCallbacks::new().on_ready(move || {
                r.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .await
        .unwrap();
    wait_until(|| backend.bind_count() == 1).await;
    assert_eq!(ready.load(Ordering::SeqCst), 0);

    backend.ready(0);
    wait_until(|| ready.load(Ordering::SeqCst) == 1).await;
    assert!(controller.is_playing());
}

// ============================================================================
// stop() / cleanup()
// ============================================================================

#[tokio::test]
async fn test_stop_clears_session() {
    let backend = MockBackend::new();
    let controller = start_controller(&backend);
    let seen = record_playing_state(&controller);

    play_to_ready(&controller, &backend, "a").await;
    backend.set_position(3_000);
    controller.seek_to(3_000).await.unwrap();

    controller.stop().await.unwrap();

    assert_eq!(controller.state(), PlaybackState::Stopped);
    assert_eq!(controller.current_track(), None);
    assert_eq!(controller.current_position(), 0);
    assert_eq!(controller.duration(), 0);
    assert_eq!(*seen.lock().unwrap(), vec![true, false]);
    wait_until(|| backend.calls().contains(&DeviceCall::Release(source("a")))).await;
}

#[tokio::test]
async fn test_stop_cancels_preparation() {
    let backend = MockBackend::new();
    let controller = start_controller(&backend);

    controller.play(track("a")).await.unwrap();
    controller.stop().await.unwrap();
    settle().await;

    if backend.bind_count() > 0 {
        backend.ready(0);
    }
    settle().await;

    assert_eq!(controller.state(), PlaybackState::Stopped);
    assert!(!controller.has_device());
    assert_eq!(backend.count_calls(|c| matches!(c, DeviceCall::Start(_))), 0);
}

#[tokio::test]
async fn test_cleanup_closes_controller() {
    let backend = MockBackend::new();
    let controller = start_controller(&backend);
    let other_handle = controller.clone();

    play_to_ready(&controller, &backend, "a").await;
    controller.cleanup().await.unwrap();

    wait_until(|| backend.calls().contains(&DeviceCall::Release(source("a")))).await;
    assert!(!controller.is_playing());
    assert!(matches!(
        other_handle.play(track("b")).await,
        Err(Error::ControllerClosed)
    ));
    assert!(matches!(other_handle.pause().await, Err(Error::ControllerClosed)));
    controller.cleanup().await.unwrap();
}

// ============================================================================
// Observers and events
// ============================================================================

#[tokio::test]
async fn test_observers_are_independently_removable() {
    let backend = MockBackend::new();
    let controller = start_controller(&backend);
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    let f = Arc::clone(&first);
    let handle = controller.on_playing_state_changed(move |_| {
        f.fetch_add(1, Ordering::SeqCst);
    });
    let s = Arc::clone(&second);
    controller.on_playing_state_changed(move |_| {
        s.fetch_add(1, Ordering::SeqCst);
    });

    play_to_ready(&controller, &backend, "a").await;
    assert!(controller.remove_playing_state_observer(handle));
    controller.pause().await.unwrap();

    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_single_slot_listener_replaces_previous() {
    let backend = MockBackend::new();
    let controller = start_controller(&backend);
    let replaced = Arc::new(AtomicUsize::new(0));
    let current = Arc::new(AtomicUsize::new(0));

    let r = Arc::clone(&replaced);
    controller.set_playing_state_listener(move |_| {
        r.fetch_add(1, Ordering::SeqCst);
    });
    let c = Arc::clone(&current);
    controller.set_playing_state_listener(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });

    play_to_ready(&controller, &backend, "a").await;
    assert_eq!(replaced.load(Ordering::SeqCst), 0);
    assert_eq!(current.load(Ordering::SeqCst), 1);

    controller.clear_playing_state_listener();
    controller.pause().await.unwrap();
    assert_eq!(current.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_state_change_events_follow_lifecycle() {
    let backend = MockBackend::new();
    let controller = start_controller(&backend);
    let mut events = controller.subscribe_events();

    play_to_ready(&controller, &backend, "a").await;
    backend.complete(0);
    wait_until(|| controller.state() == PlaybackState::Stopped).await;

    let transitions: Vec<(PlaybackStatus, PlaybackStatus)> = drain_events(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            PlayerEvent::PlaybackStateChanged {
                old_state,
                new_state,
                ..
            } => Some((old_state, new_state)),
            _ => None,
        })
        .collect();

    assert_eq!(
        transitions,
        vec![
            (PlaybackStatus::Idle, PlaybackStatus::Preparing),
            (PlaybackStatus::Preparing, PlaybackStatus::Playing),
            (PlaybackStatus::Playing, PlaybackStatus::Stopped),
        ]
    );
}

// ============================================================================
// Progress broadcaster (virtual time)
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_progress_ticks_only_while_playing() {
    let backend = MockBackend::new();
    let controller = start_controller(&backend);
    let ticks = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&ticks);
    controller.on_progress(move |snapshot| sink.lock().unwrap().push(snapshot));

    backend.set_position(1_000);
    play_to_ready(&controller, &backend, "a").await;
    tokio::time::sleep(Duration::from_millis(650)).await;

    let count = ticks.lock().unwrap().len();
    assert!(count >= 3, "expected at least 3 ticks, got {}", count);
    assert_eq!(controller.current_position(), 1_000);
    assert_eq!(ticks.lock().unwrap()[0].duration_ms, 180_000);

    controller.pause().await.unwrap();
    assert!(!controller.is_broadcasting());
    let paused_count = ticks.lock().unwrap().len();
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(ticks.lock().unwrap().len(), paused_count);
}

#[tokio::test(start_paused = true)]
async fn test_poll_errors_skip_ticks_without_stopping() {
    let backend = MockBackend::new();
    let controller = start_controller(&backend);
    let ticks = Arc::new(AtomicUsize::new(0));
    let t = Arc::clone(&ticks);
    controller.on_progress(move |_| {
        t.fetch_add(1, Ordering::SeqCst);
    });

    play_to_ready(&controller, &backend, "a").await;
    backend.set_fail_polls(true);
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 0);
    assert!(controller.is_playing());

    backend.set_fail_polls(false);
    backend.set_position(2_000);
    tokio::time::sleep(Duration::from_millis(450)).await;
    assert!(ticks.load(Ordering::SeqCst) >= 2);
    assert_eq!(controller.current_position(), 2_000);
}

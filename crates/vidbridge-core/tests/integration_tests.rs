//! Integration tests for VidBridge Core

use std::sync::{Arc, Mutex};
use std::time::Duration;
use vidbridge_core::{
    event_channel, Bridge, EngineEvent, EngineEventSender, EventRecord, EventStream, InstanceId,
    LoadConfig, MediaEngine, PlaybackStatus, PlayerConfig, PlayerEvent, SimulatedEngine,
    SimulatedEngineFactory,
};

const CLIP: &str = "https://cdn.example.com/clip.mp4";
const STREAM: &str = "https://cdn.example.com/live/index.m3u8";

fn bridge(duration: Option<f64>) -> (Bridge, EventStream) {
    bridge_with(PlayerConfig::default(), duration)
}

fn bridge_with(config: PlayerConfig, duration: Option<f64>) -> (Bridge, EventStream) {
    let (tx, rx) = event_channel();
    let bridge = Bridge::new(config, Arc::new(SimulatedEngineFactory::new(duration)), tx);
    (bridge, rx)
}

/// Last engine event sender handed out by the factory
type EngineTap = Arc<Mutex<Option<EngineEventSender>>>;

/// Bridge over engines built by `build`, with a tap on their notifications
fn bridge_with_engine<F>(build: F) -> (Bridge, EventStream, EngineTap)
where
    F: Fn(EngineEventSender) -> SimulatedEngine + Send + Sync + 'static,
{
    let tap = EngineTap::default();
    let factory = {
        let tap = tap.clone();
        move |events: EngineEventSender| {
            *tap.lock().unwrap() = Some(events.clone());
            Box::new(build(events)) as Box<dyn MediaEngine>
        }
    };
    let (tx, rx) = event_channel();
    let bridge = Bridge::new(PlayerConfig::default(), Arc::new(factory), tx);
    (bridge, rx, tap)
}

/// Let queued commands, engine events and due ticks apply
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

fn drain(events: &mut EventStream) -> Vec<PlayerEvent> {
    std::iter::from_fn(|| events.try_recv().ok()).collect()
}

fn statuses(events: &[PlayerEvent]) -> Vec<PlaybackStatus> {
    events
        .iter()
        .filter_map(|e| match e {
            PlayerEvent::StatusChanged { status, .. } => Some(*status),
            _ => None,
        })
        .collect()
}

fn progress(events: &[PlayerEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            PlayerEvent::ProgressChanged { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Load Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_autoplay_load_reaches_playing() {
    let (bridge, mut events) = bridge(Some(60.0));
    let handle = bridge.new_instance().await;
    bridge.load(handle, STREAM, true, false, false).await;
    settle().await;

    let events = drain(&mut events);
    assert_eq!(
        statuses(&events),
        vec![PlaybackStatus::New, PlaybackStatus::Playing]
    );
    assert!(events.contains(&PlayerEvent::VideoSizeChanged {
        instance: InstanceId(0),
        width: 1920,
        height: 1080,
    }));
    assert_eq!(bridge.status(handle).await, PlaybackStatus::Playing);
    assert_eq!(bridge.duration(handle).await, 60.0);
}

#[tokio::test(start_paused = true)]
async fn test_load_without_autoplay_pauses_when_ready() {
    let (bridge, mut events) = bridge(Some(60.0));
    let handle = bridge.new_instance().await;
    bridge.set_autoplay(handle, false).await;
    bridge.load(handle, CLIP, false, false, false).await;
    settle().await;

    assert_eq!(
        statuses(&drain(&mut events)),
        vec![PlaybackStatus::New, PlaybackStatus::Paused]
    );
    assert!(progress(&drain(&mut events)).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_load_config_overrides_autoplay() {
    let (bridge, mut events) = bridge(Some(60.0));
    let handle = bridge.new_instance().await;
    bridge
        .load_with(handle, LoadConfig::detect(CLIP).with_autoplay(false))
        .await;
    settle().await;

    assert_eq!(
        statuses(&drain(&mut events)),
        vec![PlaybackStatus::New, PlaybackStatus::Paused]
    );
}

#[tokio::test(start_paused = true)]
async fn test_malformed_url_reports_error() {
    let (bridge, mut events) = bridge(Some(60.0));
    let handle = bridge.new_instance().await;
    bridge.load(handle, "not a url", false, false, false).await;
    settle().await;

    let events = drain(&mut events);
    assert_eq!(statuses(&events), vec![PlaybackStatus::Error]);
    assert_eq!(events[0].to_record().body["status"], 4);

    // Commands do nothing until the next load
    bridge.play(handle).await;
    bridge.seek(handle, 0.5).await;
    settle().await;
    assert_eq!(bridge.status(handle).await, PlaybackStatus::Error);
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_scheme_reports_error() {
    let (bridge, _events) = bridge(Some(60.0));
    let handle = bridge.new_instance().await;
    bridge
        .load(handle, "ftp://cdn.example.com/clip.mp4", false, false, false)
        .await;
    settle().await;
    assert_eq!(bridge.status(handle).await, PlaybackStatus::Error);

    bridge.load(handle, CLIP, false, false, false).await;
    settle().await;
    assert_eq!(bridge.status(handle).await, PlaybackStatus::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_engine_load_failure_reports_error() {
    let (bridge, mut events, _tap) = bridge_with_engine(|events| {
        SimulatedEngine::new(events, Some(60.0)).with_load_failure("unreachable host")
    });
    let handle = bridge.new_instance().await;
    bridge.load(handle, CLIP, false, false, false).await;
    settle().await;

    assert_eq!(statuses(&drain(&mut events)), vec![PlaybackStatus::Error]);
    assert_eq!(bridge.duration(handle).await, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_video_size_comes_from_engine() {
    let (bridge, mut events, _tap) = bridge_with_engine(|events| {
        SimulatedEngine::new(events, Some(60.0)).with_video_size(Some((640, 360)))
    });
    let handle = bridge.new_instance().await;
    bridge.load(handle, CLIP, false, false, false).await;
    settle().await;

    let events = drain(&mut events);
    assert!(events.contains(&PlayerEvent::VideoSizeChanged {
        instance: InstanceId(0),
        width: 640,
        height: 360,
    }));
}

#[tokio::test(start_paused = true)]
async fn test_audio_only_source_reports_no_video_size() {
    let (bridge, mut events, _tap) =
        bridge_with_engine(|events| SimulatedEngine::new(events, Some(60.0)).with_video_size(None));
    let handle = bridge.new_instance().await;
    bridge.load(handle, CLIP, false, false, false).await;
    settle().await;

    let events = drain(&mut events);
    assert_eq!(
        statuses(&events),
        vec![PlaybackStatus::New, PlaybackStatus::Playing]
    );
    assert!(!events
        .iter()
        .any(|e| matches!(e, PlayerEvent::VideoSizeChanged { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_silent_load_starts_muted() {
    let (bridge, _events) = bridge(Some(60.0));
    let handle = bridge.new_instance().await;
    bridge.load(handle, CLIP, false, false, true).await;
    settle().await;

    let snapshot = bridge.snapshot(handle).await.unwrap();
    assert_eq!(snapshot.volume, 0.0);

    bridge.set_muted(handle, false).await;
    assert_eq!(bridge.snapshot(handle).await.unwrap().volume, 1.0);
}

// =============================================================================
// Progress Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_playback_runs_to_finished() {
    let (bridge, mut events) = bridge(Some(3.0));
    let handle = bridge.new_instance().await;
    bridge.load(handle, CLIP, false, false, false).await;

    tokio::time::sleep(Duration::from_secs(10)).await;

    let events = drain(&mut events);
    assert_eq!(
        statuses(&events),
        vec![
            PlaybackStatus::New,
            PlaybackStatus::Playing,
            PlaybackStatus::Finished
        ]
    );

    let samples = progress(&events);
    assert!(samples.windows(2).all(|w| w[0] <= w[1]));
    assert!(*samples.last().unwrap() >= 0.99);
}

#[tokio::test(start_paused = true)]
async fn test_no_progress_after_finished() {
    let (bridge, mut events) = bridge(Some(3.0));
    let handle = bridge.new_instance().await;
    bridge.load(handle, CLIP, false, false, false).await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    drain(&mut events);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(drain(&mut events).is_empty());
    assert_eq!(bridge.status(handle).await, PlaybackStatus::Finished);
}

#[tokio::test(start_paused = true)]
async fn test_looping_restarts_from_zero() {
    let (bridge, mut events) = bridge(Some(3.0));
    let handle = bridge.new_instance().await;
    bridge.load(handle, CLIP, false, true, false).await;

    tokio::time::sleep(Duration::from_millis(7500)).await;

    let events = drain(&mut events);
    let statuses = statuses(&events);
    assert!(!statuses.contains(&PlaybackStatus::Finished));
    assert_eq!(statuses.last(), Some(&PlaybackStatus::Playing));

    let samples = progress(&events);
    assert!(samples.windows(2).any(|w| w[1] < w[0]));
    assert_eq!(bridge.status(handle).await, PlaybackStatus::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_faster_progress_interval() {
    let config = PlayerConfig::from_json_str(r#"{"progress_interval_ms": 250}"#).unwrap();
    let (bridge, mut events) = bridge_with(config, Some(60.0));
    let handle = bridge.new_instance().await;
    bridge.load(handle, CLIP, false, false, false).await;

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(progress(&drain(&mut events)).len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_duration_reports_zero() {
    let (bridge, mut events) = bridge(None);
    let handle = bridge.new_instance().await;
    bridge.load(handle, STREAM, true, false, false).await;
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let events = drain(&mut events);
    assert!(events.iter().any(|e| matches!(
        e,
        PlayerEvent::ProgressChanged { progress, duration, .. } if *progress == 0.0 && *duration == 0.0
    )));
    assert_eq!(bridge.duration(handle).await, 0.0);

    // Seek needs a duration
    bridge.seek(handle, 0.5).await;
    assert!(!bridge.snapshot(handle).await.unwrap().is_seeking);
}

// =============================================================================
// Command Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_pause_twice_notifies_twice() {
    let (bridge, mut events) = bridge(Some(60.0));
    let handle = bridge.new_instance().await;
    bridge.load(handle, CLIP, false, false, false).await;
    settle().await;
    drain(&mut events);

    bridge.pause(handle).await;
    bridge.pause(handle).await;
    settle().await;

    assert_eq!(
        statuses(&drain(&mut events)),
        vec![PlaybackStatus::Paused, PlaybackStatus::Paused]
    );
}

#[tokio::test(start_paused = true)]
async fn test_paused_instance_emits_no_progress() {
    let (bridge, mut events) = bridge(Some(60.0));
    let handle = bridge.new_instance().await;
    bridge.load(handle, CLIP, false, false, false).await;
    settle().await;
    bridge.pause(handle).await;
    settle().await;
    drain(&mut events);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(progress(&drain(&mut events)).is_empty());

    bridge.play(handle).await;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let events = drain(&mut events);
    assert_eq!(statuses(&events), vec![PlaybackStatus::Playing]);
    assert_eq!(progress(&events).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_seek_resumes_playing() {
    let (bridge, mut events) = bridge(Some(60.0));
    let handle = bridge.new_instance().await;
    bridge.load(handle, CLIP, false, false, false).await;
    settle().await;
    drain(&mut events);

    bridge.seek(handle, 0.5).await;
    settle().await;

    assert_eq!(statuses(&drain(&mut events)), vec![PlaybackStatus::Playing]);
    let snapshot = bridge.snapshot(handle).await.unwrap();
    assert!(!snapshot.is_seeking);
    assert!((snapshot.position - 30.0).abs() < 0.1);
}

#[tokio::test(start_paused = true)]
async fn test_seek_while_paused_stays_paused() {
    let (bridge, mut events) = bridge(Some(60.0));
    let handle = bridge.new_instance().await;
    bridge.load(handle, CLIP, false, false, false).await;
    settle().await;
    bridge.pause(handle).await;
    settle().await;
    drain(&mut events);

    bridge.seek(handle, 0.25).await;
    settle().await;

    assert_eq!(statuses(&drain(&mut events)), vec![PlaybackStatus::Paused]);
    assert_eq!(bridge.snapshot(handle).await.unwrap().position, 15.0);
}

#[tokio::test(start_paused = true)]
async fn test_relative_seeks() {
    let (bridge, _events) = bridge(Some(60.0));
    let handle = bridge.new_instance().await;
    bridge.set_autoplay(handle, false).await;
    bridge.load(handle, CLIP, false, false, false).await;
    settle().await;

    bridge.seek_forward(handle, 20.0).await;
    settle().await;
    let position = bridge.snapshot(handle).await.unwrap().position;
    assert!((position - 20.0).abs() < 1e-6);

    bridge.seek_rewind(handle, 5.0).await;
    settle().await;
    let position = bridge.snapshot(handle).await.unwrap().position;
    assert!((position - 15.0).abs() < 1e-6);

    bridge.seek_forward(handle, 600.0).await;
    settle().await;
    assert_eq!(bridge.snapshot(handle).await.unwrap().position, 60.0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_rewinds_and_reports() {
    let (bridge, mut events) = bridge(Some(60.0));
    let handle = bridge.new_instance().await;
    bridge.load(handle, CLIP, false, false, false).await;
    tokio::time::sleep(Duration::from_secs(3)).await;
    drain(&mut events);

    bridge.stop(handle).await;
    settle().await;

    let events = drain(&mut events);
    assert_eq!(statuses(&events), vec![PlaybackStatus::Stopped]);
    assert!(events.contains(&PlayerEvent::ProgressChanged {
        instance: InstanceId(0),
        progress: 0.0,
        duration: 60.0,
    }));
    assert_eq!(bridge.snapshot(handle).await.unwrap().position, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_zero_seek_while_stopped() {
    let (bridge, mut events) = bridge(Some(60.0));
    let handle = bridge.new_instance().await;
    bridge.load(handle, CLIP, false, false, false).await;
    settle().await;
    bridge.stop(handle).await;
    settle().await;
    drain(&mut events);

    bridge.seek(handle, 0.0).await;
    settle().await;

    assert!(statuses(&drain(&mut events)).is_empty());
    assert_eq!(bridge.status(handle).await, PlaybackStatus::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_play_after_finished_restarts() {
    let (bridge, mut events) = bridge(Some(3.0));
    let handle = bridge.new_instance().await;
    bridge.load(handle, CLIP, false, false, false).await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    drain(&mut events);

    bridge.play(handle).await;
    settle().await;

    let events = drain(&mut events);
    assert_eq!(statuses(&events), vec![PlaybackStatus::Playing]);
    assert_eq!(progress(&events), vec![0.0]);
}

#[tokio::test(start_paused = true)]
async fn test_volume_is_clamped() {
    let (bridge, _events) = bridge(Some(60.0));
    let handle = bridge.new_instance().await;

    bridge.set_volume(handle, 3.0).await;
    assert_eq!(bridge.snapshot(handle).await.unwrap().volume, 1.0);

    bridge.set_volume(handle, -1.0).await;
    assert_eq!(bridge.snapshot(handle).await.unwrap().volume, 0.0);
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_engine_events_and_commands_apply_in_receipt_order() {
    let (bridge, mut events, tap) =
        bridge_with_engine(|events| SimulatedEngine::new(events, Some(60.0)));
    let handle = bridge.new_instance().await;
    bridge.load(handle, CLIP, false, false, false).await;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    drain(&mut events);

    let player = bridge.player(handle).await.unwrap();
    let session = player.snapshot().await.unwrap().session.unwrap();
    let engine = tap.lock().unwrap().clone().unwrap();

    // Queued back to back; the player applies them in this order
    engine.send(session, EngineEvent::BufferingStart).unwrap();
    player.pause().unwrap();
    engine.send(session, EngineEvent::BufferingEnd).unwrap();
    player.play().unwrap();
    settle().await;

    let drained = drain(&mut events);
    assert_eq!(
        statuses(&drained),
        vec![
            PlaybackStatus::Loading,
            PlaybackStatus::Paused,
            PlaybackStatus::Paused,
            PlaybackStatus::Playing
        ]
    );

    // Progress only resumes after the final Playing
    let resumed = drained
        .iter()
        .rposition(|e| matches!(e, PlayerEvent::StatusChanged { .. }))
        .unwrap();
    assert!(!drained[..resumed]
        .iter()
        .any(|e| matches!(e, PlayerEvent::ProgressChanged { .. })));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!progress(&drain(&mut events)).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_pause_before_due_tick_blocks_it() {
    let (bridge, mut events, _tap) =
        bridge_with_engine(|events| SimulatedEngine::new(events, Some(60.0)));
    let handle = bridge.new_instance().await;
    bridge.load(handle, CLIP, false, false, false).await;
    tokio::time::sleep(Duration::from_millis(900)).await;
    drain(&mut events);

    // Pause is queued ahead of the tick due at 1s
    let player = bridge.player(handle).await.unwrap();
    player.pause().unwrap();
    tokio::time::sleep(Duration::from_millis(2000)).await;

    let events = drain(&mut events);
    assert_eq!(statuses(&events), vec![PlaybackStatus::Paused]);
    assert!(progress(&events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_late_notification_from_previous_item_is_dropped() {
    let (bridge, mut events, tap) =
        bridge_with_engine(|events| SimulatedEngine::new(events, Some(60.0)));
    let handle = bridge.new_instance().await;
    bridge.load(handle, CLIP, false, false, false).await;
    settle().await;
    let previous = bridge.snapshot(handle).await.unwrap().session.unwrap();

    bridge.load(handle, STREAM, true, false, false).await;
    settle().await;
    drain(&mut events);

    let engine = tap.lock().unwrap().clone().unwrap();
    engine.send(previous, EngineEvent::EndOfStream).unwrap();
    engine
        .send(
            previous,
            EngineEvent::Failed {
                reason: "first item".into(),
            },
        )
        .unwrap();
    settle().await;

    assert!(statuses(&drain(&mut events)).is_empty());
    assert_eq!(bridge.status(handle).await, PlaybackStatus::Playing);
}

// =============================================================================
// Registry Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_instances_are_independent() {
    let (bridge, mut events) = bridge(Some(60.0));
    let first = bridge.new_instance().await;
    let second = bridge.new_instance().await;
    assert_eq!((first, second), (0, 1));

    bridge.load(second, CLIP, false, false, false).await;
    settle().await;

    let events = drain(&mut events);
    assert!(!events.is_empty());
    assert!(events.iter().all(|e| e.instance().0 == second));
    assert_eq!(bridge.status(first).await, PlaybackStatus::None);
    assert_eq!(bridge.status(second).await, PlaybackStatus::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_handle_is_noop() {
    let (bridge, mut events) = bridge(Some(60.0));
    bridge.new_instance().await;

    bridge.load(5, CLIP, false, false, false).await;
    bridge.play(5).await;
    bridge.stop(5).await;
    settle().await;

    assert!(drain(&mut events).is_empty());
    assert_eq!(bridge.status(5).await, PlaybackStatus::None);
    assert_eq!(bridge.duration(5).await, 0.0);
    assert!(bridge.player(5).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_clear_stops_all_instances() {
    let (bridge, mut events) = bridge(Some(60.0));
    let first = bridge.new_instance().await;
    let second = bridge.new_instance().await;
    bridge.load(first, CLIP, false, false, false).await;
    bridge.load(second, STREAM, true, false, false).await;
    settle().await;
    drain(&mut events);

    bridge.clear().await;

    let drained = drain(&mut events);
    assert_eq!(
        statuses(&drained),
        vec![PlaybackStatus::Stopped, PlaybackStatus::Stopped]
    );
    assert!(bridge.is_empty().await);

    // Nothing keeps ticking
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(drain(&mut events).is_empty());
}

// =============================================================================
// Wire Format Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_event_records() {
    let (bridge, mut events) = bridge(Some(60.0));
    let handle = bridge.new_instance().await;
    bridge.load(handle, CLIP, false, false, false).await;
    settle().await;

    let records: Vec<EventRecord> = drain(&mut events).iter().map(|e| e.to_record()).collect();
    let status_codes: Vec<_> = records
        .iter()
        .filter(|r| r.name == EventRecord::STATUS_CHANGED)
        .map(|r| r.body["status"].as_u64().unwrap())
        .collect();
    assert_eq!(status_codes, vec![0, 2]);

    let progress = records
        .iter()
        .find(|r| r.name == EventRecord::PROGRESS_CHANGED)
        .unwrap();
    assert_eq!(progress.body["duration"], 60.0);
    assert_eq!(progress.body["instance"], 0);
}

#[test]
fn test_supported_events() {
    assert_eq!(
        EventRecord::supported_events(),
        [
            "PlayerStatusChanged",
            "PlayerProgressChanged",
            "PlayerVideoSizeChanged"
        ]
    );
}

//! Remote command routing and engine event dispatch.

mod common;

use bridge_traits::EngineEvent;
use common::{track, tracks, Call, Harness};
use core_playback::{EngineEventDispatcher, QueueSource, RemoteCommandRouter};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

async fn playing(n: usize, start: usize) -> Harness {
    let harness = Harness::ready().await;
    harness
        .manager
        .set_queue(tracks(n), start, QueueSource::album("lp"))
        .await
        .unwrap();
    harness.engine.clear_calls();
    harness
}

#[tokio::test]
async fn test_remote_commands_on_empty_queue_are_noops() {
    let harness = Harness::ready().await;
    let router = RemoteCommandRouter::new(harness.manager.clone());

    for event in [
        EngineEvent::RemotePlay,
        EngineEvent::RemotePause,
        EngineEvent::RemoteStop,
        EngineEvent::RemoteNext,
        EngineEvent::RemotePrevious,
        EngineEvent::RemoteSeek { position_ms: 1_000 },
    ] {
        assert!(router.route(&event).await);
    }

    assert!(harness.engine.calls().is_empty());
    assert!(!harness.publisher.get_snapshot().is_loaded);
}

#[tokio::test]
async fn test_non_remote_events_are_not_routed() {
    let harness = playing(2, 0).await;
    let router = RemoteCommandRouter::new(harness.manager.clone());

    assert!(!router.route(&EngineEvent::QueueEnded).await);
    assert_eq!(harness.cursor(), Some(0));
}

#[tokio::test]
async fn test_remote_transport_maps_to_intents() {
    let harness = playing(3, 0).await;
    let router = RemoteCommandRouter::new(harness.manager.clone());

    router.route(&EngineEvent::RemotePause).await;
    router.route(&EngineEvent::RemotePlay).await;
    router.route(&EngineEvent::RemoteNext).await;
    router.route(&EngineEvent::RemotePrevious).await;
    router.route(&EngineEvent::RemoteStop).await;

    assert_eq!(
        harness.engine.calls(),
        vec![
            Call::Pause,
            Call::Play,
            Call::Load("t1".into()),
            Call::Play,
            Call::Load("t0".into()),
            Call::Play,
            Call::Stop,
        ]
    );
    assert!(!harness.publisher.get_snapshot().is_loaded);
}

#[tokio::test]
async fn test_remote_seek_clamps_to_track() {
    let harness = Harness::ready().await;
    harness
        .manager
        .set_queue(vec![track("a", 10)], 0, "album:a")
        .await
        .unwrap();
    harness.engine.clear_calls();
    let router = RemoteCommandRouter::new(harness.manager.clone());

    router
        .route(&EngineEvent::RemoteSeek {
            position_ms: 60_000,
        })
        .await;
    router
        .route(&EngineEvent::RemoteSeek { position_ms: 2_500 })
        .await;

    assert_eq!(
        harness.engine.calls(),
        vec![
            Call::Seek(Duration::from_secs(10)),
            Call::Seek(Duration::from_millis(2_500)),
        ]
    );
}

#[tokio::test]
async fn test_remote_failure_is_swallowed() {
    // Queue present but engine never initialized: every command fails.
    let harness = Harness::new();
    harness.manager.add_track(track("a", 10));
    let router = RemoteCommandRouter::new(harness.manager.clone());

    assert!(router.route(&EngineEvent::RemotePlay).await);
    assert!(router.route(&EngineEvent::RemoteNext).await);
    assert!(harness.engine.calls().is_empty());
}

#[tokio::test]
async fn test_progress_tick_updates_snapshot() {
    let harness = playing(1, 0).await;
    let dispatcher = EngineEventDispatcher::new(harness.manager.clone(), harness.publisher.clone());
    let before = harness.publisher.get_snapshot();

    dispatcher
        .handle(EngineEvent::ProgressTick {
            position_ms: 5_000,
            duration_ms: 180_000,
            is_playing: true,
        })
        .await;

    let after = harness.publisher.get_snapshot();
    assert_eq!(after.position_ms, 5_000);
    assert!(!std::sync::Arc::ptr_eq(&before, &after));
}

#[tokio::test(start_paused = true)]
async fn test_end_of_track_during_load_is_ignored() {
    let harness = playing(4, 0).await;
    harness.engine.set_load_delay(Duration::from_millis(200));
    let dispatcher = EngineEventDispatcher::new(harness.manager.clone(), harness.publisher.clone());

    let (moved, ()) = tokio::join!(harness.manager.next(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        dispatcher.handle(EngineEvent::QueueEnded).await;
    });

    moved.unwrap();
    assert_eq!(harness.engine.loads(), vec!["t1"]);
    assert_eq!(harness.cursor(), Some(1));
}

#[tokio::test]
async fn test_dispatcher_processes_in_arrival_order() {
    let harness = playing(4, 0).await;
    let dispatcher = EngineEventDispatcher::new(harness.manager.clone(), harness.publisher.clone());
    let (tx, rx) = mpsc::unbounded_channel();

    tx.send(EngineEvent::RemoteNext).unwrap();
    tx.send(EngineEvent::QueueEnded).unwrap();
    tx.send(EngineEvent::RemotePrevious).unwrap();
    tx.send(EngineEvent::ProgressTick {
        position_ms: 1_234,
        duration_ms: 180_000,
        is_playing: true,
    })
    .unwrap();
    drop(tx);

    dispatcher.run(rx, CancellationToken::new()).await;

    assert_eq!(harness.engine.loads(), vec!["t1", "t2", "t1"]);
    assert_eq!(harness.cursor(), Some(1));
    assert_eq!(harness.publisher.get_snapshot().position_ms, 1_234);
}

#[tokio::test]
async fn test_dispatcher_stops_on_cancellation() {
    let harness = playing(2, 0).await;
    let dispatcher = EngineEventDispatcher::new(harness.manager.clone(), harness.publisher.clone());
    let (tx, rx) = mpsc::unbounded_channel();
    let token = CancellationToken::new();

    let handle = dispatcher.spawn(rx, token.clone());
    token.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();

    // Events after shutdown are not consumed.
    assert!(tx.send(EngineEvent::RemoteNext).is_err());
    assert_eq!(harness.cursor(), Some(0));
}

#[tokio::test]
async fn test_engine_events_reach_core_through_sink() {
    let mut harness = playing(2, 0).await;

    assert!(harness.engine.emit(EngineEvent::QueueEnded));
    let event = harness.engine_events.recv().await.unwrap();
    assert_eq!(event, EngineEvent::QueueEnded);
}

//! Playback engine bridge and the inbound engine event vocabulary.
//!
//! The native playback resource (AVPlayer, ExoPlayer, a desktop audio stack)
//! is owned by the host. The core drives it exclusively through
//! [`PlaybackEngine`] and learns about everything that happens on the native
//! side (progress, end of track, lock-screen buttons) through the closed set
//! of [`EngineEvent`]s the host forwards into the core.

use crate::error::Result;
use crate::now_playing::NowPlayingMetadata;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

/// Repeat vocabulary understood by native engines.
///
/// Engines know nothing about the core's queue, so their modes are expressed
/// relative to the currently loaded item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineRepeatMode {
    #[default]
    Off,
    /// Loop the loaded track.
    Track,
    /// Loop the engine-side queue.
    Queue,
}

/// Everything a host needs to load one track into the native engine.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    /// Opaque track identifier (catalog hash). The host resolves the audio
    /// source from it.
    pub track_id: String,
    /// Expected duration as reported by the catalog.
    pub duration: Duration,
    /// Display metadata, usable for the engine's own media session.
    pub metadata: NowPlayingMetadata,
}

impl LoadRequest {
    pub fn new(track_id: impl Into<String>, duration: Duration) -> Self {
        Self {
            track_id: track_id.into(),
            duration,
            metadata: NowPlayingMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: NowPlayingMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Out-of-band events emitted by the native side.
///
/// `Remote*` variants originate from the OS (lock screen, notification shade,
/// headset buttons) and may arrive while no UI is mounted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    RemotePlay,
    RemotePause,
    RemoteStop,
    RemoteNext,
    RemotePrevious,
    RemoteSeek {
        position_ms: u64,
    },
    /// The loaded track played to its end.
    QueueEnded,
    ProgressTick {
        position_ms: u64,
        duration_ms: u64,
        is_playing: bool,
    },
}

impl EngineEvent {
    /// Returns `true` for events that originate from OS remote controls.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            EngineEvent::RemotePlay
                | EngineEvent::RemotePause
                | EngineEvent::RemoteStop
                | EngineEvent::RemoteNext
                | EngineEvent::RemotePrevious
                | EngineEvent::RemoteSeek { .. }
        )
    }
}

/// Handle through which the native side delivers [`EngineEvent`]s to the core.
///
/// Cheap to clone; every clone feeds the same ordered channel. Events are
/// processed strictly in the order they are sent.
#[derive(Debug, Clone)]
pub struct EngineEventSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineEventSink {
    /// Create a sink together with the receiving end the core consumes.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Forward an event to the core.
    ///
    /// Returns `false` once the core has shut down and the event was dropped.
    pub fn send(&self, event: EngineEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Returns `true` once the receiving side is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Trait for host playback engines.
///
/// Implementations own the hardware channel. All methods may suspend while
/// the native engine completes the request; the core never calls them
/// concurrently for the same logical transition, but a newer `load` may be
/// issued before an older one resolves.
#[async_trait::async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// One-time native setup (audio session, player instance, remote command
    /// registration). `events` is where the engine must deliver progress,
    /// end-of-track and remote-control events from now on.
    ///
    /// The core guarantees this is not invoked concurrently. After a failure
    /// it may be invoked again.
    async fn initialize(&self, events: EngineEventSink) -> Result<()>;

    /// Replace the loaded item. Resolves once the engine is able to play it.
    async fn load(&self, request: LoadRequest) -> Result<()>;

    /// Begin or resume playback of the loaded item.
    async fn play(&self) -> Result<()>;

    /// Pause without unloading.
    async fn pause(&self) -> Result<()>;

    /// Stop playback and release the loaded item.
    async fn stop(&self) -> Result<()>;

    /// Seek to an absolute position within the loaded item.
    async fn seek(&self, position: Duration) -> Result<()>;

    /// Apply the engine-level repeat mode.
    async fn set_repeat_mode(&self, mode: EngineRepeatMode) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_events_are_classified() {
        assert!(EngineEvent::RemotePlay.is_remote());
        assert!(EngineEvent::RemoteSeek { position_ms: 10 }.is_remote());
        assert!(!EngineEvent::QueueEnded.is_remote());
        assert!(!EngineEvent::ProgressTick {
            position_ms: 0,
            duration_ms: 0,
            is_playing: false
        }
        .is_remote());
    }

    #[test]
    fn engine_event_serializes_with_tag() {
        let event = EngineEvent::RemoteSeek { position_ms: 4200 };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"RemoteSeek","position_ms":4200}"#);

        let back: EngineEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn load_request_builder() {
        let request = LoadRequest::new("abc", Duration::from_secs(180)).with_metadata(
            NowPlayingMetadata {
                title: "Song".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(request.track_id, "abc");
        assert_eq!(request.metadata.title, "Song");
    }

    #[tokio::test]
    async fn event_sink_preserves_order() {
        let (sink, mut rx) = EngineEventSink::channel();
        assert!(sink.send(EngineEvent::RemotePlay));
        assert!(sink.clone().send(EngineEvent::QueueEnded));

        assert_eq!(rx.recv().await, Some(EngineEvent::RemotePlay));
        assert_eq!(rx.recv().await, Some(EngineEvent::QueueEnded));

        drop(rx);
        assert!(sink.is_closed());
        assert!(!sink.send(EngineEvent::RemotePause));
    }

    #[test]
    fn default_engine_repeat_is_off() {
        assert_eq!(EngineRepeatMode::default(), EngineRepeatMode::Off);
    }
}

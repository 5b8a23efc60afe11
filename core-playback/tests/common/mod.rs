//! Shared fakes and fixtures for the core-playback integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{
    EngineEvent, EngineEventSink, EngineRepeatMode, LoadRequest, NowPlayingCenter, PlaybackEngine,
};
use core_playback::{EngineAdapter, QueueManager, SnapshotPublisher, Track};
use core_runtime::config::PlaybackSettings;
use core_runtime::events::EventBus;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Notify;

// ============================================================================
// Recording engine
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Initialize,
    Load(String),
    Play,
    Pause,
    Stop,
    Seek(Duration),
    Repeat(EngineRepeatMode),
}

/// `PlaybackEngine` fake that records every call.
#[derive(Default)]
pub struct RecordingEngine {
    calls: Mutex<Vec<Call>>,
    init_count: AtomicUsize,
    init_delay: Mutex<Option<Duration>>,
    fail_init: AtomicBool,
    load_delay: Mutex<Option<Duration>>,
    fail_load: AtomicBool,
    load_gates: Mutex<HashMap<String, Arc<Notify>>>,
    sink: Mutex<Option<EngineEventSink>>,
}

impl RecordingEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn loads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Load(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.calls().iter().filter(|call| *call == wanted).count()
    }

    pub fn init_count(&self) -> usize {
        self.init_count.load(Ordering::SeqCst)
    }

    pub fn set_init_delay(&self, delay: Duration) {
        *self.init_delay.lock() = Some(delay);
    }

    pub fn set_fail_init(&self, fail: bool) {
        self.fail_init.store(fail, Ordering::SeqCst);
    }

    pub fn set_load_delay(&self, delay: Duration) {
        *self.load_delay.lock() = Some(delay);
    }

    pub fn set_fail_load(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }

    /// Block loads of `track_id` until the returned gate is notified.
    pub fn gate_load(&self, track_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.load_gates
            .lock()
            .insert(track_id.to_string(), gate.clone());
        gate
    }

    /// Send an event through the sink received at initialization.
    pub fn emit(&self, event: EngineEvent) -> bool {
        self.sink
            .lock()
            .as_ref()
            .map(|sink| sink.send(event))
            .unwrap_or(false)
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl PlaybackEngine for RecordingEngine {
    async fn initialize(&self, events: EngineEventSink) -> BridgeResult<()> {
        self.init_count.fetch_add(1, Ordering::SeqCst);
        self.record(Call::Initialize);

        let delay = *self.init_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_init.load(Ordering::SeqCst) {
            return Err(BridgeError::InitializationFailed(
                "audio session unavailable".to_string(),
            ));
        }

        *self.sink.lock() = Some(events);
        Ok(())
    }

    async fn load(&self, request: LoadRequest) -> BridgeResult<()> {
        self.record(Call::Load(request.track_id.clone()));

        let gate = self.load_gates.lock().remove(&request.track_id);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let delay = *self.load_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_load.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed(format!(
                "cannot open {}",
                request.track_id
            )));
        }
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        self.record(Call::Play);
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.record(Call::Pause);
        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        self.record(Call::Stop);
        Ok(())
    }

    async fn seek(&self, position: Duration) -> BridgeResult<()> {
        self.record(Call::Seek(position));
        Ok(())
    }

    async fn set_repeat_mode(&self, mode: EngineRepeatMode) -> BridgeResult<()> {
        self.record(Call::Repeat(mode));
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub engine: Arc<RecordingEngine>,
    pub publisher: SnapshotPublisher,
    pub adapter: Arc<EngineAdapter>,
    pub manager: Arc<QueueManager>,
    pub bus: EventBus,
    pub engine_events: UnboundedReceiver<EngineEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(None, seeded_settings())
    }

    pub fn with_now_playing(center: Arc<dyn NowPlayingCenter>) -> Self {
        Self::build(Some(center), seeded_settings())
    }

    pub fn with_settings(settings: PlaybackSettings) -> Self {
        Self::build(None, settings)
    }

    fn build(now_playing: Option<Arc<dyn NowPlayingCenter>>, settings: PlaybackSettings) -> Self {
        let engine = RecordingEngine::new();
        let publisher = SnapshotPublisher::new();
        let (sink, engine_events) = EngineEventSink::channel();
        let adapter = Arc::new(EngineAdapter::new(
            engine.clone(),
            now_playing,
            publisher.clone(),
            sink,
        ));
        let bus = EventBus::new(64);
        let manager = Arc::new(QueueManager::new(adapter.clone(), bus.clone(), settings));

        Self {
            engine,
            publisher,
            adapter,
            manager,
            bus,
            engine_events,
        }
    }

    /// Harness whose adapter already completed `ensure_ready`.
    pub async fn ready() -> Self {
        let harness = Self::new();
        harness.adapter.ensure_ready().await.unwrap();
        harness.engine.clear_calls();
        harness
    }

    pub fn cursor(&self) -> Option<usize> {
        self.manager.queue_view().cursor
    }
}

pub fn seeded_settings() -> PlaybackSettings {
    PlaybackSettings {
        shuffle_seed: Some(0x5eed),
        ..PlaybackSettings::default()
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn track(id: &str, seconds: u64) -> Track {
    Track::new(id, format!("Title {id}"), Duration::from_secs(seconds)).with_artist("Artist")
}

pub fn tracks(n: usize) -> Vec<Track> {
    (0..n).map(|i| track(&format!("t{i}"), 180)).collect()
}

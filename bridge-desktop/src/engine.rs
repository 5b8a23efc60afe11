//! Simulated Playback Engine Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    playback::{EngineEvent, EngineEventSink, EngineRepeatMode, LoadRequest, PlaybackEngine},
    time::{Clock, SystemClock},
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Default cadence of `ProgressTick` events.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Playback engine that plays nothing but keeps time like a real one.
///
/// Position is derived from the injected [`Clock`], so tests can drive it with
/// a manual clock and call [`tick`](Self::tick) directly. When constructed
/// with a tick interval (the default), `initialize` also spawns a tokio task
/// that ticks on that cadence until the core drops its event receiver.
///
/// The engine holds a single item, so `EngineRepeatMode::Queue` behaves like
/// `Off`: the end of the item is reported as `QueueEnded` and the core picks
/// what comes next.
pub struct SimulatedPlaybackEngine {
    shared: Arc<Shared>,
    tick_interval: Option<Duration>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    clock: Arc<dyn Clock>,
    state: Mutex<EngineState>,
}

#[derive(Default)]
struct EngineState {
    events: Option<EngineEventSink>,
    item: Option<LoadedItem>,
    repeat: EngineRepeatMode,
}

struct LoadedItem {
    track_id: String,
    duration_ms: u64,
    /// Position at the last pause, seek or resume.
    offset_ms: u64,
    /// Clock reading when playback last resumed; `None` while paused.
    resumed_at: Option<i64>,
}

impl LoadedItem {
    fn position_ms(&self, now: i64) -> u64 {
        let elapsed = self
            .resumed_at
            .map(|since| now.saturating_sub(since).max(0) as u64)
            .unwrap_or(0);
        self.offset_ms.saturating_add(elapsed).min(self.duration_ms)
    }

    fn is_playing(&self) -> bool {
        self.resumed_at.is_some()
    }

    fn progress(&self, now: i64) -> EngineEvent {
        EngineEvent::ProgressTick {
            position_ms: self.position_ms(now),
            duration_ms: self.duration_ms,
            is_playing: self.is_playing(),
        }
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}

impl Shared {
    fn now_millis(&self) -> i64 {
        self.clock.unix_timestamp_millis()
    }

    fn deliver(&self, sink: Option<EngineEventSink>, events: Vec<EngineEvent>) {
        let Some(sink) = sink else {
            return;
        };
        for event in events {
            if !sink.send(event) {
                debug!("Core event receiver closed, dropping simulated engine event");
                break;
            }
        }
    }

    fn emit_progress(&self) {
        let now = self.now_millis();
        let (sink, event) = {
            let state = self.state.lock();
            match state.item.as_ref() {
                Some(item) => (state.events.clone(), item.progress(now)),
                None => return,
            }
        };
        self.deliver(sink, vec![event]);
    }

    fn tick(&self) {
        let now = self.now_millis();
        let mut emitted = Vec::with_capacity(2);

        let sink = {
            let mut state = self.state.lock();
            let repeat = state.repeat;
            let Some(item) = state.item.as_mut() else {
                return;
            };

            let position_ms = item.position_ms(now);
            if item.is_playing() && position_ms >= item.duration_ms {
                if repeat == EngineRepeatMode::Track {
                    debug!(track_id = %item.track_id, "Simulated engine looping track");
                    item.offset_ms = 0;
                    item.resumed_at = Some(now);
                    emitted.push(item.progress(now));
                } else {
                    debug!(track_id = %item.track_id, "Simulated engine reached end of track");
                    item.offset_ms = item.duration_ms;
                    item.resumed_at = None;
                    emitted.push(item.progress(now));
                    emitted.push(EngineEvent::QueueEnded);
                }
            } else {
                emitted.push(item.progress(now));
            }

            state.events.clone()
        };

        self.deliver(sink, emitted);
    }

    fn receiver_closed(&self) -> bool {
        self.state
            .lock()
            .events
            .as_ref()
            .map(EngineEventSink::is_closed)
            .unwrap_or(false)
    }
}

impl SimulatedPlaybackEngine {
    /// Create an engine on the system clock ticking every
    /// [`DEFAULT_TICK_INTERVAL`].
    pub fn new() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::with_clock(clock)
    }

    /// Create an engine on a custom clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Shared {
                clock,
                state: Mutex::new(EngineState::default()),
            }),
            tick_interval: Some(DEFAULT_TICK_INTERVAL),
            ticker: Mutex::new(None),
        }
    }

    /// Change the cadence of the background ticker.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = Some(interval);
        self
    }

    /// Disable the background ticker; progress only advances through
    /// [`tick`](Self::tick).
    pub fn manual(mut self) -> Self {
        self.tick_interval = None;
        self
    }

    /// Advance the simulation once: report progress and detect the end of
    /// the loaded item.
    pub fn tick(&self) {
        self.shared.tick();
    }

    pub fn loaded_track_id(&self) -> Option<String> {
        self.shared
            .state
            .lock()
            .item
            .as_ref()
            .map(|item| item.track_id.clone())
    }

    pub fn position(&self) -> Duration {
        let now = self.shared.now_millis();
        let position_ms = self
            .shared
            .state
            .lock()
            .item
            .as_ref()
            .map(|item| item.position_ms(now))
            .unwrap_or(0);
        Duration::from_millis(position_ms)
    }

    pub fn is_playing(&self) -> bool {
        self.shared
            .state
            .lock()
            .item
            .as_ref()
            .map(LoadedItem::is_playing)
            .unwrap_or(false)
    }

    pub fn repeat_mode(&self) -> EngineRepeatMode {
        self.shared.state.lock().repeat
    }

    fn spawn_ticker(&self, period: Duration) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No tokio runtime available, simulated engine will only advance on manual ticks");
                return;
            }
        };

        let weak = Arc::downgrade(&self.shared);
        let task = handle.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                if shared.receiver_closed() {
                    debug!("Simulated engine ticker stopping");
                    break;
                }
                shared.tick();
            }
        });

        if let Some(previous) = self.ticker.lock().replace(task) {
            previous.abort();
        }
    }

    fn with_item<T>(&self, op: &str, f: impl FnOnce(&mut LoadedItem, i64) -> T) -> Result<T> {
        let now = self.shared.now_millis();
        let mut state = self.shared.state.lock();
        match state.item.as_mut() {
            Some(item) => Ok(f(item, now)),
            None => Err(BridgeError::OperationFailed(format!(
                "cannot {op}: no track loaded"
            ))),
        }
    }
}

impl Default for SimulatedPlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SimulatedPlaybackEngine {
    fn drop(&mut self) {
        if let Some(task) = self.ticker.get_mut().take() {
            task.abort();
        }
    }
}

#[async_trait]
impl PlaybackEngine for SimulatedPlaybackEngine {
    async fn initialize(&self, events: EngineEventSink) -> Result<()> {
        self.shared.state.lock().events = Some(events);

        if let Some(period) = self.tick_interval {
            self.spawn_ticker(period);
        }

        info!(
            tick_interval_ms = self.tick_interval.map(duration_to_millis),
            "Simulated playback engine initialized"
        );
        Ok(())
    }

    async fn load(&self, request: LoadRequest) -> Result<()> {
        {
            let mut state = self.shared.state.lock();
            if state.events.is_none() {
                return Err(BridgeError::NotAvailable(
                    "simulated engine is not initialized".to_string(),
                ));
            }
            state.item = Some(LoadedItem {
                track_id: request.track_id.clone(),
                duration_ms: duration_to_millis(request.duration),
                offset_ms: 0,
                resumed_at: None,
            });
        }

        debug!(
            track_id = %request.track_id,
            duration_ms = duration_to_millis(request.duration),
            "Simulated engine loaded track"
        );
        self.shared.emit_progress();
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        self.with_item("play", |item, now| {
            if item.resumed_at.is_none() {
                item.resumed_at = Some(now);
            }
        })?;
        self.shared.emit_progress();
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.with_item("pause", |item, now| {
            item.offset_ms = item.position_ms(now);
            item.resumed_at = None;
        })?;
        self.shared.emit_progress();
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let previous = self.shared.state.lock().item.take();
        if let Some(item) = previous {
            debug!(track_id = %item.track_id, "Simulated engine stopped");
        }
        Ok(())
    }

    async fn seek(&self, position: Duration) -> Result<()> {
        let target_ms = duration_to_millis(position);
        self.with_item("seek", |item, now| {
            item.offset_ms = target_ms.min(item.duration_ms);
            if item.resumed_at.is_some() {
                item.resumed_at = Some(now);
            }
        })?;
        self.shared.emit_progress();
        Ok(())
    }

    async fn set_repeat_mode(&self, mode: EngineRepeatMode) -> Result<()> {
        self.shared.state.lock().repeat = mode;
        debug!(?mode, "Simulated engine repeat mode set");
        Ok(())
    }
}

//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host-provided playback bridges into the playback
//! core and exposes the surface UI layers and OS integrations talk to.
//! Desktop builds typically enable the `desktop-shims` feature (which depends
//! on `bridge-desktop`) and use [`bootstrap_desktop`]; mobile hosts build a
//! [`CoreConfig`] with their native engine and call [`PlaybackService::new`].
//!
//! ## Lifecycle
//!
//! The service is an explicitly constructed value, never a global:
//!
//! 1. [`PlaybackService::new`] wires the components.
//! 2. [`PlaybackService::start`] attaches the engine event dispatcher and
//!    runs `ensure_ready`. It can be called again after a failed
//!    initialization.
//! 3. [`PlaybackService::shutdown`] detaches the dispatcher, stops the
//!    engine and unloads the status.
//!
//! ```ignore
//! let service = PlaybackService::new(config)?;
//! service.start().await?;
//!
//! let _subscription = service.subscribe(|| ui.request_render());
//! service.set_queue(tracks, 0, QueueSource::album(&hash)).await?;
//! let status = service.get_snapshot();
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use bridge_traits::{EngineEvent, EngineEventSink, NowPlayingCenter, PlaybackEngine};
pub use core_playback::{
    PlaybackError, PlaybackMode, PlaybackStatus, PlayerState, QueueSource, QueueView, RepeatMode,
    Subscription, Track, Transition,
};
pub use core_runtime::config::{CoreConfig, PlaybackSettings};
pub use core_runtime::events::{CoreEvent, EventStream, PlaybackEvent, QueueEvent};

use core_playback::{EngineAdapter, EngineEventDispatcher, QueueManager, SnapshotPublisher};
use core_runtime::events::{EventBus, Receiver};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct Lifecycle {
    pending_events: Option<UnboundedReceiver<EngineEvent>>,
    dispatcher: Option<JoinHandle<()>>,
    shut_down: bool,
}

/// Primary façade exposed to host applications.
pub struct PlaybackService {
    manager: Arc<QueueManager>,
    adapter: Arc<EngineAdapter>,
    publisher: SnapshotPublisher,
    events: EventBus,
    engine_events: EngineEventSink,
    shutdown: CancellationToken,
    lifecycle: Mutex<Lifecycle>,
}

impl PlaybackService {
    /// Wire the playback core from `config`. Nothing touches the engine
    /// until [`start`](Self::start).
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let CoreConfig {
            playback_engine,
            now_playing,
            settings,
        } = config;

        let publisher = SnapshotPublisher::new();
        let (engine_events, pending_events) = EngineEventSink::channel();
        let adapter = Arc::new(EngineAdapter::new(
            playback_engine,
            now_playing,
            publisher.clone(),
            engine_events.clone(),
        ));
        let events = EventBus::new(settings.event_channel_capacity);
        let manager = Arc::new(QueueManager::new(adapter.clone(), events.clone(), settings));

        Ok(Self {
            manager,
            adapter,
            publisher,
            events,
            engine_events,
            shutdown: CancellationToken::new(),
            lifecycle: Mutex::new(Lifecycle {
                pending_events: Some(pending_events),
                dispatcher: None,
                shut_down: false,
            }),
        })
    }

    /// Attach the engine event dispatcher and initialize the engine.
    ///
    /// Idempotent once successful. Must be called from within a tokio
    /// runtime.
    pub async fn start(&self) -> Result<()> {
        {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.shut_down {
                return Err(CoreError::InitializationFailed(
                    "playback service has been shut down".to_string(),
                ));
            }
            if let Some(pending) = lifecycle.pending_events.take() {
                let dispatcher =
                    EngineEventDispatcher::new(self.manager.clone(), self.publisher.clone());
                lifecycle.dispatcher = Some(dispatcher.spawn(pending, self.shutdown.child_token()));
                debug!("Engine event dispatcher attached");
            }
        }

        self.adapter.ensure_ready().await?;
        info!("Playback service started");
        Ok(())
    }

    /// Detach the dispatcher, stop the engine and unload the status.
    pub async fn shutdown(&self) -> Result<()> {
        let dispatcher = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.shut_down {
                return Ok(());
            }
            lifecycle.shut_down = true;
            lifecycle.pending_events = None;
            lifecycle.dispatcher.take()
        };

        self.shutdown.cancel();
        if let Some(handle) = dispatcher {
            if let Err(e) = handle.await {
                warn!(error = %e, "Engine event dispatcher ended abnormally");
            }
        }

        if self.adapter.is_ready() {
            self.adapter.stop().await?;
        } else {
            self.adapter.unload();
        }

        info!("Playback service shut down");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.adapter.is_ready()
    }

    /// Sender hosts use to forward native engine events into the core.
    pub fn event_sender(&self) -> EngineEventSink {
        self.engine_events.clone()
    }

    // ========================================================================
    // Intents
    // ========================================================================

    pub async fn set_queue(
        &self,
        tracks: Vec<Track>,
        start_index: usize,
        source: impl Into<QueueSource>,
    ) -> Result<Option<usize>> {
        Ok(self.manager.set_queue(tracks, start_index, source).await?)
    }

    pub fn add_track(&self, track: Track) -> usize {
        self.manager.add_track(track)
    }

    pub async fn remove_track_at(&self, index: usize) -> Result<Arc<Track>> {
        Ok(self.manager.remove_track_at(index).await?)
    }

    pub async fn next(&self) -> Result<Transition> {
        Ok(self.manager.next().await?)
    }

    pub async fn previous(&self) -> Result<Transition> {
        Ok(self.manager.previous().await?)
    }

    pub async fn skip_to(&self, index: usize) -> Result<()> {
        Ok(self.manager.skip_to(index).await?)
    }

    pub async fn set_repeat_mode(&self, mode: RepeatMode) -> Result<()> {
        Ok(self.manager.set_repeat_mode(mode).await?)
    }

    pub fn set_shuffle(&self, enabled: bool) {
        self.manager.set_shuffle(enabled)
    }

    pub async fn clear_queue(&self) -> Result<()> {
        Ok(self.manager.clear_queue().await?)
    }

    pub async fn play(&self) -> Result<()> {
        Ok(self.manager.play().await?)
    }

    pub async fn pause(&self) -> Result<()> {
        Ok(self.manager.pause().await?)
    }

    pub async fn stop(&self) -> Result<()> {
        Ok(self.manager.stop().await?)
    }

    pub async fn seek_to(&self, position: Duration) -> Result<()> {
        Ok(self.manager.seek_to(position).await?)
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Register a change callback. Callbacks receive no arguments; pull the
    /// new state with [`get_snapshot`](Self::get_snapshot).
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.publisher.subscribe(callback)
    }

    pub fn get_snapshot(&self) -> Arc<PlaybackStatus> {
        self.publisher.get_snapshot()
    }

    pub fn watch(&self) -> watch::Receiver<Arc<PlaybackStatus>> {
        self.publisher.watch()
    }

    /// Discrete queue and playback facts, for telemetry observers.
    pub fn subscribe_events(&self) -> Receiver<CoreEvent> {
        self.events.subscribe()
    }

    pub fn queue_view(&self) -> QueueView {
        self.manager.queue_view()
    }

    pub fn is_current_source(&self, source: &str) -> bool {
        self.manager.is_current_source(source)
    }

    pub fn player_state(&self) -> PlayerState {
        self.manager.player_state()
    }
}

impl Drop for PlaybackService {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for PlaybackService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackService")
            .field("manager", &self.manager)
            .field("adapter", &self.adapter)
            .finish_non_exhaustive()
    }
}

/// Convenience bootstrapper for desktop hosts: simulated engine, logging
/// now-playing center, started service.
///
/// ```no_run
/// # #[cfg(feature = "desktop-shims")]
/// # async fn example() -> core_service::Result<()> {
/// use core_service::{bootstrap_desktop, PlaybackSettings};
///
/// let service = bootstrap_desktop(PlaybackSettings::default()).await?;
/// let status = service.get_snapshot();
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(settings: PlaybackSettings) -> Result<PlaybackService> {
    use bridge_desktop::{LoggingNowPlayingCenter, SimulatedPlaybackEngine};

    let config = CoreConfig::builder()
        .playback_engine(Arc::new(SimulatedPlaybackEngine::new()))
        .now_playing(Arc::new(LoggingNowPlayingCenter::new()))
        .settings(settings)
        .build()?;

    let service = PlaybackService::new(config)?;
    service.start().await?;
    Ok(service)
}

//! # Playback Engine Adapter
//!
//! Sole owner of the host [`PlaybackEngine`]. Everything the core does to the
//! native player goes through [`EngineAdapter`].
//!
//! ## Readiness
//!
//! [`ensure_ready`](EngineAdapter::ensure_ready) runs the native
//! initialization at most once at a time. Concurrent callers share one
//! initialization future and all observe its outcome. A failure returns the
//! adapter to `NotReady`, so the next call retries. Commands issued while not
//! ready fail fast with [`PlaybackError::EngineNotReady`], including while an
//! initialization is still in flight.
//!
//! ## Superseded loads
//!
//! There is no cancellation of in-flight loads. Each load takes a new
//! generation number; when a load resolves after a newer one was issued (or
//! after a stop), its completion is ignored and it does not start playback.

use bridge_traits::{
    EngineEventSink, EngineRepeatMode, NowPlayingCenter, NowPlayingMetadata, PlaybackEngine,
};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{PlaybackError, Result};
use crate::model::{RepeatMode, Track};
use crate::publisher::SnapshotPublisher;

type InitFuture = Shared<BoxFuture<'static, std::result::Result<(), String>>>;

enum InitState {
    NotReady,
    Initializing { attempt: u64, future: InitFuture },
    Ready,
}

/// How a load request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The engine holds the requested track.
    Loaded,
    /// A newer load or a stop was issued while this one was in flight.
    Superseded,
}

/// Isolation layer between queue logic and the native engine.
pub struct EngineAdapter {
    engine: Arc<dyn PlaybackEngine>,
    now_playing: Option<Arc<dyn NowPlayingCenter>>,
    publisher: SnapshotPublisher,
    events: EngineEventSink,
    init: Mutex<InitState>,
    init_attempts: AtomicU64,
    desired_repeat: Arc<Mutex<EngineRepeatMode>>,
    load_generation: AtomicU64,
    /// Generation of the last load that completed, failed or was unloaded.
    settled_generation: AtomicU64,
    current_track: Mutex<Option<String>>,
}

impl EngineAdapter {
    /// `events` is handed to the engine on initialization; it must feed the
    /// core's engine event dispatcher.
    pub fn new(
        engine: Arc<dyn PlaybackEngine>,
        now_playing: Option<Arc<dyn NowPlayingCenter>>,
        publisher: SnapshotPublisher,
        events: EngineEventSink,
    ) -> Self {
        Self {
            engine,
            now_playing,
            publisher,
            events,
            init: Mutex::new(InitState::NotReady),
            init_attempts: AtomicU64::new(0),
            desired_repeat: Arc::new(Mutex::new(EngineRepeatMode::Off)),
            load_generation: AtomicU64::new(0),
            settled_generation: AtomicU64::new(0),
            current_track: Mutex::new(None),
        }
    }

    pub fn publisher(&self) -> &SnapshotPublisher {
        &self.publisher
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.init.lock(), InitState::Ready)
    }

    /// Fail fast unless initialization completed.
    pub fn require_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            warn!("Playback command rejected: engine not ready");
            Err(PlaybackError::EngineNotReady)
        }
    }

    /// Run native initialization once; concurrent callers share the outcome.
    pub async fn ensure_ready(&self) -> Result<()> {
        let (attempt, future) = {
            let mut state = self.init.lock();
            match &*state {
                InitState::Ready => return Ok(()),
                InitState::Initializing { attempt, future } => (*attempt, future.clone()),
                InitState::NotReady => {
                    let attempt = self.init_attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    let future = self.init_future();
                    *state = InitState::Initializing {
                        attempt,
                        future: future.clone(),
                    };
                    debug!(attempt, "Initializing playback engine");
                    (attempt, future)
                }
            }
        };

        let outcome = future.await;

        {
            let mut state = self.init.lock();
            let settles = matches!(
                &*state,
                InitState::Initializing { attempt: current, .. } if *current == attempt
            );
            if settles {
                match &outcome {
                    Ok(()) => {
                        info!(attempt, "Playback engine ready");
                        *state = InitState::Ready;
                    }
                    Err(message) => {
                        error!(attempt, error = %message, "Playback engine initialization failed");
                        *state = InitState::NotReady;
                    }
                }
            }
        }

        outcome.map_err(PlaybackError::EngineInitFailed)
    }

    fn init_future(&self) -> InitFuture {
        let engine = self.engine.clone();
        let events = self.events.clone();
        let desired_repeat = self.desired_repeat.clone();

        async move {
            engine
                .initialize(events)
                .await
                .map_err(|e| e.to_string())?;

            // Repeat changes made before the engine existed.
            let mode = *desired_repeat.lock();
            if mode != EngineRepeatMode::Off {
                if let Err(e) = engine.set_repeat_mode(mode).await {
                    warn!(error = %e, ?mode, "Failed to apply repeat mode after initialization");
                }
            }
            Ok::<(), String>(())
        }
        .boxed()
        .shared()
    }

    /// Track id of the most recent load that has not been stopped.
    pub fn current_track_id(&self) -> Option<String> {
        self.current_track.lock().clone()
    }

    /// True while the most recent load has not completed.
    pub fn is_loading(&self) -> bool {
        self.load_generation.load(Ordering::SeqCst) != self.settled_generation.load(Ordering::SeqCst)
    }

    /// Load `track` into the engine.
    ///
    /// A rejected load leaves nothing held, so the next `play` reloads.
    pub async fn load(&self, track: &Track) -> Result<LoadOutcome> {
        self.require_ready()?;

        let generation = self.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.current_track.lock() = Some(track.id.clone());
        self.update_now_playing(track.now_playing_metadata());

        debug!(track_id = %track.id, generation, "Loading track");
        if let Err(e) = self.engine.load(track.load_request()).await {
            if self.is_current_load(generation, &track.id) {
                warn!(track_id = %track.id, error = %e, "Engine rejected load");
                self.current_track.lock().take();
                self.settled_generation.store(generation, Ordering::SeqCst);
                self.publisher.mark_unloaded();
                self.clear_now_playing();
            }
            return Err(e.into());
        }

        if !self.is_current_load(generation, &track.id) {
            debug!(track_id = %track.id, generation, "Ignoring superseded load");
            return Ok(LoadOutcome::Superseded);
        }

        self.settled_generation.store(generation, Ordering::SeqCst);
        self.publisher.mark_loaded(track.duration_ms());
        Ok(LoadOutcome::Loaded)
    }

    /// Load `track` and start it unless the load was superseded.
    pub async fn load_and_play(&self, track: &Track) -> Result<LoadOutcome> {
        let outcome = self.load(track).await?;
        if outcome == LoadOutcome::Loaded {
            self.play().await?;
        }
        Ok(outcome)
    }

    fn is_current_load(&self, generation: u64, track_id: &str) -> bool {
        self.load_generation.load(Ordering::SeqCst) == generation
            && self.current_track.lock().as_deref() == Some(track_id)
    }

    pub async fn play(&self) -> Result<()> {
        self.require_ready()?;
        self.engine.play().await?;
        self.publisher.set_playing(true);
        Ok(())
    }

    pub async fn pause(&self) -> Result<()> {
        self.require_ready()?;
        self.engine.pause().await?;
        self.publisher.set_playing(false);
        Ok(())
    }

    /// Stop the engine and reset the published status to unloaded.
    pub async fn stop(&self) -> Result<()> {
        self.require_ready()?;
        self.unload();
        self.engine.stop().await?;
        Ok(())
    }

    /// Forget the loaded track without touching the engine. In-flight loads
    /// become superseded.
    pub fn unload(&self) {
        let generation = self.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.settled_generation.store(generation, Ordering::SeqCst);
        let previous = self.current_track.lock().take();
        self.publisher.mark_unloaded();
        if previous.is_some() {
            self.clear_now_playing();
        }
    }

    pub async fn seek_to(&self, position: Duration) -> Result<()> {
        self.require_ready()?;
        self.engine.seek(position).await?;
        self.publisher
            .set_position(position.as_millis().min(u64::MAX as u128) as u64);
        Ok(())
    }

    /// Translate and apply the repeat mode. Before initialization the mode is
    /// remembered and applied once the engine is ready.
    pub async fn set_repeat_mode(&self, mode: RepeatMode) -> Result<()> {
        let engine_mode = mode.to_engine();
        *self.desired_repeat.lock() = engine_mode;

        if !self.is_ready() {
            debug!(?engine_mode, "Engine not ready, deferring repeat mode");
            return Ok(());
        }

        self.engine.set_repeat_mode(engine_mode).await?;
        Ok(())
    }

    fn update_now_playing(&self, metadata: NowPlayingMetadata) {
        let Some(center) = self.now_playing.clone() else {
            return;
        };
        spawn_detached(async move {
            let track_id = metadata.track_id.clone();
            if let Err(e) = center.update(metadata).await {
                warn!(error = %e, %track_id, "Now playing update failed");
            }
        });
    }

    fn clear_now_playing(&self) {
        let Some(center) = self.now_playing.clone() else {
            return;
        };
        spawn_detached(async move {
            if let Err(e) = center.clear().await {
                warn!(error = %e, "Now playing clear failed");
            }
        });
    }
}

fn spawn_detached<F>(future: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(future);
        }
        Err(_) => debug!("No tokio runtime, skipping now playing update"),
    }
}

impl std::fmt::Debug for EngineAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineAdapter")
            .field("ready", &self.is_ready())
            .field("current_track", &self.current_track_id())
            .finish()
    }
}

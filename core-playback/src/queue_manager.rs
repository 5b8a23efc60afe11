//! # Queue Manager
//!
//! The authoritative state machine of the playback core. It owns the queue,
//! the cursor and the mode flags, and it is the only component that drives
//! the [`EngineAdapter`].
//!
//! ## Concurrency
//!
//! Every intent mutates the queue synchronously under a lock and releases
//! it before awaiting the adapter. The logical cursor therefore moves
//! immediately: rapid `next()` calls advance one track each even when the
//! engine is slower, and the adapter drops completions of loads that were
//! overtaken.
//!
//! ## Readiness
//!
//! Intents that need the engine (`set_queue`, `skip_to`, `next`, `previous`,
//! `play`, `pause`, `stop`, `seek_to`) fail with
//! [`PlaybackError::EngineNotReady`] before touching any state. Pure queue
//! edits (`add_track`, `remove_track_at`, `clear_queue`, mode flags) always
//! apply and skip engine side effects when the engine is not ready.

use core_runtime::config::PlaybackSettings;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, QueueEvent};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::adapter::{EngineAdapter, LoadOutcome};
use crate::error::{PlaybackError, Result};
use crate::model::{
    PlaybackMode, PlayerState, Queue, QueueSource, QueueView, RepeatMode, Track,
};
use crate::policy::{self, Decision, Direction, ShuffleHistory};

/// What an advance (`next`, `previous`, end of track) did to the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A different track became current.
    Moved { index: usize },
    /// The current track started over.
    Restarted { index: usize },
    /// Nothing left to play; the engine was stopped and the status unloaded.
    Stopped,
    /// The queue is empty.
    Unchanged,
}

struct QueueState {
    queue: Queue,
    mode: PlaybackMode,
    history: ShuffleHistory,
    rng: StdRng,
    player: PlayerState,
}

/// Engine work decided under the lock and carried out after it is released.
enum Step {
    Load { track: Arc<Track>, index: usize },
    Restart { track: Arc<Track>, index: usize },
    Stop,
}

enum RemovalFollowUp {
    None,
    Reload {
        track: Arc<Track>,
        index: usize,
        play: bool,
    },
    Stop,
}

pub struct QueueManager {
    state: Mutex<QueueState>,
    adapter: Arc<EngineAdapter>,
    events: EventBus,
    settings: PlaybackSettings,
}

impl QueueManager {
    pub fn new(adapter: Arc<EngineAdapter>, events: EventBus, settings: PlaybackSettings) -> Self {
        let rng = match settings.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            state: Mutex::new(QueueState {
                queue: Queue::default(),
                mode: PlaybackMode::default(),
                history: ShuffleHistory::default(),
                rng,
                player: PlayerState::Empty,
            }),
            adapter,
            events,
            settings,
        }
    }

    pub fn adapter(&self) -> &Arc<EngineAdapter> {
        &self.adapter
    }

    // ========================================================================
    // Queue edits
    // ========================================================================

    /// Replace the queue and start playing at `start_index` (clamped into
    /// range). An empty `tracks` leaves everything untouched.
    ///
    /// Returns the index that became current.
    #[instrument(skip_all, fields(len = tracks.len(), start_index = start_index))]
    pub async fn set_queue(
        &self,
        tracks: Vec<Track>,
        start_index: usize,
        source: impl Into<QueueSource>,
    ) -> Result<Option<usize>> {
        if tracks.is_empty() {
            debug!("Ignoring empty queue");
            return Ok(None);
        }
        self.adapter.require_ready()?;

        let source = source.into();
        let len = tracks.len();
        let (track, index) = {
            let mut state = self.state.lock();
            state.queue = Queue::new(tracks, start_index, source.clone());
            let Some((track, index)) = current_of(&state.queue) else {
                return Err(PlaybackError::Internal(
                    "non-empty queue without a cursor".to_string(),
                ));
            };
            state.history.reset(Some(index));
            state.player = PlayerState::Playing;
            (track, index)
        };

        info!(source = %source, len, index, "Queue replaced");
        self.emit(QueueEvent::Replaced {
            source: source.to_string(),
            len,
            start_index: Some(index),
        });

        self.run(Step::Load { track, index }).await?;
        Ok(Some(index))
    }

    /// Append a track. The first track added to an empty queue becomes
    /// current without starting playback.
    pub fn add_track(&self, track: Track) -> usize {
        let track_id = track.id.clone();
        let index = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let was_empty = state.queue.is_empty();
            let index = state.queue.push(track);
            if was_empty {
                state.history.reset(state.queue.cursor());
                state.player = PlayerState::Loaded;
            }
            index
        };

        debug!(%track_id, index, "Track added");
        self.emit(QueueEvent::TrackAdded { track_id, index });
        index
    }

    /// Remove the track at `index`.
    ///
    /// Removing the current track re-clamps the cursor to `min(index, len-1)`.
    /// If it was playing the new current track is loaded and played; if it
    /// was paused the new one is loaded paused; if the queue became empty
    /// the engine is stopped.
    #[instrument(skip(self))]
    pub async fn remove_track_at(&self, index: usize) -> Result<Arc<Track>> {
        let (removed, follow_up) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let removal = state.queue.remove(index)?;
            state.history.on_removed(index);

            let follow_up = if !removal.was_current {
                RemovalFollowUp::None
            } else if let Some((track, cursor)) = current_of(&state.queue) {
                if state.mode.shuffle {
                    state.history.record_jump(cursor);
                }
                match state.player {
                    PlayerState::Playing => RemovalFollowUp::Reload {
                        track,
                        index: cursor,
                        play: true,
                    },
                    PlayerState::Paused => RemovalFollowUp::Reload {
                        track,
                        index: cursor,
                        play: false,
                    },
                    _ => RemovalFollowUp::None,
                }
            } else {
                state.history.reset(None);
                state.player = PlayerState::Empty;
                RemovalFollowUp::Stop
            };

            (removal.track, follow_up)
        };

        debug!(track_id = %removed.id, index, "Track removed");
        self.emit(QueueEvent::TrackRemoved {
            track_id: removed.id.clone(),
            index,
        });

        match follow_up {
            RemovalFollowUp::None => {}
            RemovalFollowUp::Reload { track, index, play } => {
                if !self.adapter.is_ready() {
                    debug!("Engine not ready, skipping reload after removal");
                } else if play {
                    self.run(Step::Load { track, index }).await?;
                } else {
                    self.emit(PlaybackEvent::TrackChanged {
                        track_id: track.id.clone(),
                        index,
                    });
                    self.adapter
                        .load(&track)
                        .await
                        .map_err(|e| self.report(e))?;
                }
            }
            RemovalFollowUp::Stop => self.halt().await?,
        }

        Ok(removed)
    }

    /// Empty the queue, stop the engine and reset the status to unloaded.
    #[instrument(skip(self))]
    pub async fn clear_queue(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.queue.clear();
            state.history.reset(None);
            state.player = PlayerState::Empty;
        }

        info!("Queue cleared");
        self.emit(QueueEvent::Cleared);
        self.halt().await
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    #[instrument(skip(self))]
    pub async fn next(&self) -> Result<Transition> {
        self.advance(Direction::Forward).await
    }

    /// Step back. Past the configured restart threshold the current track
    /// restarts instead; at the first track with `repeat = off` it restarts
    /// as well.
    #[instrument(skip(self))]
    pub async fn previous(&self) -> Result<Transition> {
        self.advance(Direction::Backward).await
    }

    /// Make `index` current and play it. Out-of-range indices fail with
    /// [`PlaybackError::InvalidIndex`] and change nothing.
    #[instrument(skip(self))]
    pub async fn skip_to(&self, index: usize) -> Result<()> {
        let len = self.state.lock().queue.len();
        if index >= len {
            warn!(index, len, "Skip target out of range");
            return Err(PlaybackError::InvalidIndex { index, len });
        }
        self.adapter.require_ready()?;

        let track = {
            let mut state = self.state.lock();
            state.queue.set_cursor(index)?;
            let Some((track, _)) = current_of(&state.queue) else {
                return Err(PlaybackError::Internal("cursor moved off the queue".to_string()));
            };
            if state.mode.shuffle {
                state.history.record_jump(index);
            }
            state.player = PlayerState::Playing;
            track
        };

        self.run(Step::Load { track, index }).await?;
        Ok(())
    }

    /// Engine reported the end of the current track.
    pub async fn on_queue_ended(&self) -> Result<Transition> {
        let finished = self.state.lock().queue.current().map(|track| track.id.clone());
        if let Some(track_id) = finished {
            debug!(%track_id, "Track completed");
            self.emit(PlaybackEvent::Completed { track_id });
        }
        self.advance(Direction::Forward).await
    }

    async fn advance(&self, direction: Direction) -> Result<Transition> {
        self.adapter.require_ready()?;

        let restart_current = direction == Direction::Backward && self.past_restart_threshold();

        let step = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let Some(cursor) = state.queue.cursor() else {
                debug!(?direction, "Queue empty, nothing to advance");
                return Ok(Transition::Unchanged);
            };

            let decision = if restart_current {
                Decision::Move(cursor)
            } else {
                policy::decide(
                    state.queue.len(),
                    cursor,
                    state.mode,
                    direction,
                    &state.history,
                    &mut state.rng,
                )
            };

            match decision {
                Decision::Move(index) => {
                    if index != cursor {
                        state.queue.set_cursor(index)?;
                        if state.mode.shuffle {
                            match direction {
                                Direction::Forward => state.history.record_forward(cursor, index),
                                Direction::Backward => state.history.record_backward(),
                            }
                        }
                    }
                    let Some((track, _)) = current_of(&state.queue) else {
                        return Err(PlaybackError::Internal(
                            "cursor moved off the queue".to_string(),
                        ));
                    };
                    state.player = PlayerState::Playing;
                    if index == cursor {
                        Step::Restart { track, index }
                    } else {
                        Step::Load { track, index }
                    }
                }
                Decision::Stop => {
                    state.player = PlayerState::Loaded;
                    Step::Stop
                }
            }
        };

        self.run(step).await
    }

    fn past_restart_threshold(&self) -> bool {
        let Some(threshold) = self.settings.previous_restart_threshold else {
            return false;
        };
        let status = self.adapter.publisher().get_snapshot();
        status.is_loaded && u128::from(status.position_ms) > threshold.as_millis()
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Play the current track, reloading it if the engine no longer holds it
    /// (after a stop or the end of the queue).
    #[instrument(skip(self))]
    pub async fn play(&self) -> Result<()> {
        self.adapter.require_ready()?;

        let current = {
            let mut state = self.state.lock();
            let current = current_of(&state.queue);
            if current.is_some() {
                state.player = PlayerState::Playing;
            }
            current
        };
        let Some((track, _)) = current else {
            debug!("Nothing to play");
            return Ok(());
        };

        if self.holds(&track) && self.adapter.is_loading() {
            debug!(track_id = %track.id, "Load in flight, playback starts when it completes");
        } else if self.holds(&track) {
            self.adapter.play().await.map_err(|e| self.report(e))?;
            self.emit(PlaybackEvent::Started {
                track_id: track.id.clone(),
            });
        } else {
            self.start(&track).await?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn pause(&self) -> Result<()> {
        self.adapter.require_ready()?;

        let current = {
            let mut state = self.state.lock();
            let current = current_of(&state.queue).filter(|(track, _)| self.holds(track));
            if current.is_some() {
                state.player = PlayerState::Paused;
            }
            current
        };
        let Some((track, _)) = current else {
            debug!("Nothing loaded to pause");
            return Ok(());
        };

        self.adapter.pause().await.map_err(|e| self.report(e))?;
        self.emit(PlaybackEvent::Paused {
            track_id: track.id.clone(),
            position_ms: self.adapter.publisher().get_snapshot().position_ms,
        });
        Ok(())
    }

    /// Stop the engine and unload the status, keeping the queue.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<()> {
        self.adapter.require_ready()?;
        {
            let mut state = self.state.lock();
            if !state.queue.is_empty() {
                state.player = PlayerState::Loaded;
            }
        }
        self.adapter.stop().await.map_err(|e| self.report(e))?;
        self.emit(PlaybackEvent::Stopped);
        Ok(())
    }

    /// Seek within the current track. The position is clamped to the track's
    /// duration.
    #[instrument(skip(self))]
    pub async fn seek_to(&self, position: Duration) -> Result<()> {
        self.adapter.require_ready()?;

        let current = current_of(&self.state.lock().queue);
        let Some((track, _)) = current.filter(|(track, _)| self.holds(track)) else {
            debug!("Nothing loaded to seek");
            return Ok(());
        };

        let target = position.min(track.duration);
        self.adapter
            .seek_to(target)
            .await
            .map_err(|e| self.report(e))
    }

    // ========================================================================
    // Mode
    // ========================================================================

    pub async fn set_repeat_mode(&self, repeat: RepeatMode) -> Result<()> {
        let mode = {
            let mut state = self.state.lock();
            state.mode.repeat = repeat;
            state.mode
        };

        debug!(repeat = repeat.as_str(), "Repeat mode set");
        self.emit_mode(mode);
        self.adapter.set_repeat_mode(repeat).await
    }

    /// Toggle shuffle. The cursor stays where it is; a new shuffle cycle
    /// starts from it.
    pub fn set_shuffle(&self, enabled: bool) {
        let mode = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            state.mode.shuffle = enabled;
            let start = if enabled { state.queue.cursor() } else { None };
            state.history.reset(start);
            state.mode
        };

        debug!(shuffle = enabled, "Shuffle set");
        self.emit_mode(mode);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn queue_view(&self) -> QueueView {
        let state = self.state.lock();
        QueueView {
            tracks: state.queue.tracks().to_vec(),
            cursor: state.queue.cursor(),
            source: state.queue.source().cloned(),
            mode: state.mode,
        }
    }

    /// Whether the non-empty queue was produced by `source`.
    pub fn is_current_source(&self, source: &str) -> bool {
        let state = self.state.lock();
        !state.queue.is_empty()
            && state.queue.source().map(QueueSource::as_str) == Some(source)
    }

    pub fn current_track(&self) -> Option<Arc<Track>> {
        self.state.lock().queue.current().cloned()
    }

    pub fn mode(&self) -> PlaybackMode {
        self.state.lock().mode
    }

    pub fn player_state(&self) -> PlayerState {
        self.state.lock().player
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().queue.is_empty()
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn run(&self, step: Step) -> Result<Transition> {
        match step {
            Step::Load { track, index } => {
                self.emit(PlaybackEvent::TrackChanged {
                    track_id: track.id.clone(),
                    index,
                });
                self.start(&track).await?;
                Ok(Transition::Moved { index })
            }
            Step::Restart { track, index } => {
                if self.holds(&track) {
                    debug!(track_id = %track.id, "Restarting current track");
                    self.adapter
                        .seek_to(Duration::ZERO)
                        .await
                        .map_err(|e| self.report(e))?;
                    self.adapter.play().await.map_err(|e| self.report(e))?;
                    self.emit(PlaybackEvent::Started {
                        track_id: track.id.clone(),
                    });
                } else {
                    self.start(&track).await?;
                }
                Ok(Transition::Restarted { index })
            }
            Step::Stop => {
                info!("End of queue reached");
                self.adapter.stop().await.map_err(|e| self.report(e))?;
                self.emit(PlaybackEvent::Stopped);
                Ok(Transition::Stopped)
            }
        }
    }

    /// Load `track`, then play it if that is still what the queue wants.
    /// A pause or stop issued while the load was in flight wins.
    async fn start(&self, track: &Track) -> Result<()> {
        let outcome = self.adapter.load(track).await.map_err(|e| self.report(e))?;
        if outcome == LoadOutcome::Superseded {
            return Ok(());
        }

        let wants_play = {
            let state = self.state.lock();
            state.player == PlayerState::Playing
                && state.queue.current().is_some_and(|current| current.id == track.id)
        };
        if !wants_play {
            debug!(track_id = %track.id, "Playback intent changed during load, not starting");
            return Ok(());
        }

        self.adapter.play().await.map_err(|e| self.report(e))?;
        self.emit(PlaybackEvent::Started {
            track_id: track.id.clone(),
        });
        Ok(())
    }

    /// Stop the engine when possible, otherwise just unload locally.
    async fn halt(&self) -> Result<()> {
        if self.adapter.is_ready() {
            self.adapter.stop().await.map_err(|e| self.report(e))?;
            self.emit(PlaybackEvent::Stopped);
        } else {
            debug!("Engine not ready, unloading without engine stop");
            self.adapter.unload();
        }
        Ok(())
    }

    fn holds(&self, track: &Track) -> bool {
        self.adapter.current_track_id().as_deref() == Some(track.id.as_str())
    }

    fn report(&self, error: PlaybackError) -> PlaybackError {
        warn!(error = %error, "Playback command failed");
        self.emit(PlaybackEvent::Error {
            message: error.to_string(),
            recoverable: error.is_retryable(),
        });
        error
    }

    fn emit_mode(&self, mode: PlaybackMode) {
        self.emit(QueueEvent::ModeChanged {
            repeat: mode.repeat.as_str().to_string(),
            shuffle: mode.shuffle,
        });
    }

    fn emit(&self, event: impl Into<CoreEvent>) {
        // No subscribers is fine.
        self.events.emit(event.into()).ok();
    }
}

fn current_of(queue: &Queue) -> Option<(Arc<Track>, usize)> {
    let index = queue.cursor()?;
    queue.get(index).map(|track| (track.clone(), index))
}

impl std::fmt::Debug for QueueManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("QueueManager")
            .field("len", &state.queue.len())
            .field("cursor", &state.queue.cursor())
            .field("mode", &state.mode)
            .field("player", &state.player)
            .finish()
    }
}

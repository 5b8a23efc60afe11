//! # Core Configuration Module
//!
//! Provides configuration management for the playback core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! holding the host bridges and tunables the playback service needs. It
//! enforces fail-fast validation so a host that forgot to inject its native
//! engine finds out at startup rather than on the first tap.
//!
//! ## Required Dependencies
//!
//! - `PlaybackEngine` - The native, hardware-backed player
//!
//! ## Optional Dependencies
//!
//! - `NowPlayingCenter` - Lock-screen / notification metadata
//!
//! When the `desktop-shims` feature is enabled, the simulated engine from
//! `bridge-desktop` is injected automatically if no engine is provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, PlaybackSettings};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .playback_engine(Arc::new(MyNativeEngine::new()))
//!     .now_playing(Arc::new(MyNowPlayingCenter::new()))
//!     .previous_restart_threshold(Some(Duration::from_secs(3)))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{NowPlayingCenter, PlaybackEngine};
use std::sync::Arc;
use std::time::Duration;

/// Default position past which `previous()` restarts the current track.
pub const DEFAULT_PREVIOUS_RESTART_THRESHOLD: Duration = Duration::from_secs(3);

/// Default buffer for the domain event bus.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 100;

/// Core configuration for the playback service.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Native playback engine (required)
    pub playback_engine: Arc<dyn PlaybackEngine>,

    /// Lock-screen metadata sink (optional)
    pub now_playing: Option<Arc<dyn NowPlayingCenter>>,

    /// Behavioural tunables
    pub settings: PlaybackSettings,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("playback_engine", &"PlaybackEngine { ... }")
            .field(
                "now_playing",
                &self.now_playing.as_ref().map(|_| "NowPlayingCenter { ... }"),
            )
            .field("settings", &self.settings)
            .finish()
    }
}

/// Behavioural tunables of the playback core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSettings {
    /// When the published position is past this threshold, `previous()`
    /// restarts the current track instead of moving back. `None` disables
    /// the rule.
    pub previous_restart_threshold: Option<Duration>,

    /// Seed for the shuffle generator. `None` seeds from OS entropy.
    pub shuffle_seed: Option<u64>,

    /// Buffer size of the domain event bus.
    pub event_channel_capacity: usize,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            previous_restart_threshold: Some(DEFAULT_PREVIOUS_RESTART_THRESHOLD),
            shuffle_seed: None,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl PlaybackSettings {
    /// Validates the tunables.
    pub fn validate(&self) -> Result<()> {
        if self.event_channel_capacity == 0 {
            return Err(Error::Config(
                "Event channel capacity must be greater than 0".to_string(),
            ));
        }

        if self.previous_restart_threshold == Some(Duration::ZERO) {
            return Err(Error::Config(
                "Previous restart threshold must be positive. \
                 Use None to disable restart-on-previous."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        self.settings.validate()
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn playback_engine_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "PlaybackEngine".to_string(),
        message: "PlaybackEngine implementation is required to drive native playback. \
                 Desktop: enable the 'desktop-shims' feature to use the SimulatedPlaybackEngine. \
                 Mobile: inject the platform player adapter (AVPlayer/ExoPlayer)."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_playback_engine() -> Result<Arc<dyn PlaybackEngine>> {
    use bridge_desktop::SimulatedPlaybackEngine;

    let engine: Arc<dyn PlaybackEngine> = Arc::new(SimulatedPlaybackEngine::default());
    Ok(engine)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_playback_engine() -> Result<Arc<dyn PlaybackEngine>> {
    Err(playback_engine_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    playback_engine: Option<Arc<dyn PlaybackEngine>>,
    now_playing: Option<Arc<dyn NowPlayingCenter>>,
    settings: PlaybackSettings,
}

impl CoreConfigBuilder {
    /// Sets the native playback engine.
    pub fn playback_engine(mut self, engine: Arc<dyn PlaybackEngine>) -> Self {
        self.playback_engine = Some(engine);
        self
    }

    /// Sets the lock-screen metadata sink.
    pub fn now_playing(mut self, center: Arc<dyn NowPlayingCenter>) -> Self {
        self.now_playing = Some(center);
        self
    }

    pub fn previous_restart_threshold(mut self, threshold: Option<Duration>) -> Self {
        self.settings.previous_restart_threshold = threshold;
        self
    }

    pub fn shuffle_seed(mut self, seed: u64) -> Self {
        self.settings.shuffle_seed = Some(seed);
        self
    }

    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.settings.event_channel_capacity = capacity;
        self
    }

    /// Replaces all tunables at once.
    pub fn settings(mut self, settings: PlaybackSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when no `PlaybackEngine` was provided
    ///   and no desktop default is available
    /// - [`Error::Config`] when a tunable is invalid
    pub fn build(self) -> Result<CoreConfig> {
        let playback_engine = match self.playback_engine {
            Some(engine) => engine,
            None => provide_default_playback_engine()?,
        };

        let config = CoreConfig {
            playback_engine,
            now_playing: self.now_playing,
            settings: self.settings,
        };

        config.validate()?;

        Ok(config)
    }
}

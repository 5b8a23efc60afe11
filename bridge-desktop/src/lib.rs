//! # Desktop Bridge Implementations
//!
//! Default implementations of the playback bridge traits for desktop
//! development hosts (macOS, Windows, Linux) and integration tests.
//!
//! ## Overview
//!
//! Desktop builds have no AVPlayer or ExoPlayer to drive, so this crate
//! provides stand-ins that behave like a native engine from the core's point
//! of view:
//! - `PlaybackEngine` using a tokio-driven [`SimulatedPlaybackEngine`] that
//!   advances a virtual position and emits progress and end-of-track events
//! - `NowPlayingCenter` using [`LoggingNowPlayingCenter`], which records the
//!   published metadata and logs it through `tracing`
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{LoggingNowPlayingCenter, SimulatedPlaybackEngine};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let engine = SimulatedPlaybackEngine::new().with_tick_interval(Duration::from_millis(250));
//! let now_playing = LoggingNowPlayingCenter::new();
//!
//! // Use in core configuration
//! let config = CoreConfig::builder()
//!     .playback_engine(Arc::new(engine))
//!     .now_playing(Arc::new(now_playing))
//!     .build()?;
//! ```

mod engine;
mod now_playing;

pub use engine::{SimulatedPlaybackEngine, DEFAULT_TICK_INTERVAL};
pub use now_playing::LoggingNowPlayingCenter;

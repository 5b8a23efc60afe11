//! # Host Bridge Traits
//!
//! Platform abstraction traits that each host platform implements for the
//! playback core.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback core and
//! platform-specific code. Each trait represents a capability that the core
//! requires but that must be implemented differently per platform (iOS,
//! Android, desktop).
//!
//! ## Traits
//!
//! ### Playback
//! - [`PlaybackEngine`](playback::PlaybackEngine) - The native, hardware-backed player
//! - [`NowPlayingCenter`](now_playing::NowPlayingCenter) - Lock-screen / notification metadata
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Inbound events
//!
//! The native side reports progress, end of track and OS remote commands as
//! [`EngineEvent`](playback::EngineEvent)s. Hosts forward them into the core
//! through the channel exposed by the playback service; the vocabulary is
//! closed so the core can reason about every case.
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop` (simulated engine) | ✅ Available |
//! | iOS      | Host app (AVPlayer) | 📋 Planned |
//! | Android  | Host app (ExoPlayer) | 📋 Planned |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it with actionable messages.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so the core can share them across
//! async tasks behind `Arc`.

pub mod error;
pub mod now_playing;
pub mod playback;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use now_playing::{NowPlayingCenter, NowPlayingMetadata};
pub use playback::{EngineEvent, EngineEventSink, EngineRepeatMode, LoadRequest, PlaybackEngine};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, SystemClock};

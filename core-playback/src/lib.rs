//! # Playback Synchronization Core
//!
//! Owns the play queue, drives the host playback engine and republishes a
//! single consistent playback snapshot to any number of observers.
//!
//! ## Overview
//!
//! Components, leaf-first:
//! - [`model`]: tracks, the queue with its cursor, playback mode and status
//! - [`adapter`]: the [`EngineAdapter`], sole owner of the native engine
//! - [`policy`]: pure repeat/shuffle decisions
//! - [`queue_manager`]: the [`QueueManager`] state machine, only writer of
//!   queue state
//! - [`publisher`]: the [`SnapshotPublisher`] with identity-stable snapshots
//! - [`remote`]: the [`RemoteCommandRouter`] for OS remote controls
//! - [`dispatcher`]: the single task consuming engine events in order
//!
//! ```text
//!  UI intents ──> QueueManager ──> EngineAdapter ──> PlaybackEngine (host)
//!                      ^                                  │
//!                      │ QueueEnded / Remote*             │ EngineEvent
//!                      └──────── EngineEventDispatcher <──┘
//!                                       │ ProgressTick
//!                                       v
//!                               SnapshotPublisher ──> subscribers
//! ```

pub mod adapter;
pub mod dispatcher;
pub mod error;
pub mod model;
pub mod policy;
pub mod publisher;
pub mod queue_manager;
pub mod remote;

pub use adapter::{EngineAdapter, LoadOutcome};
pub use dispatcher::EngineEventDispatcher;
pub use error::{PlaybackError, Result};
pub use model::{
    PlaybackMode, PlaybackStatus, PlayerState, Queue, QueueSource, QueueView, RepeatMode, Track,
};
pub use policy::{Decision, Direction, ShuffleHistory};
pub use publisher::{SnapshotPublisher, Subscription};
pub use queue_manager::{QueueManager, Transition};
pub use remote::RemoteCommandRouter;

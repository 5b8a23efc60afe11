//! Lock-screen / notification metadata bridge.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Display metadata pushed to the OS media session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlayingMetadata {
    pub track_id: String,
    pub title: String,
    /// Artist names joined for display.
    pub artist: String,
    pub album: Option<String>,
    /// Artwork reference understood by the host (URL or cache key).
    pub artwork: Option<String>,
    pub duration: Duration,
}

/// Host media-session integration.
///
/// Calls are fire-and-forget from the core's point of view: failures are
/// logged and never affect playback.
///
/// - **iOS**: `MPNowPlayingInfoCenter`
/// - **Android**: `MediaSession` metadata
/// - **Desktop**: MPRIS / SMTC
#[async_trait::async_trait]
pub trait NowPlayingCenter: Send + Sync {
    /// Publish metadata for the track that just became current.
    async fn update(&self, metadata: NowPlayingMetadata) -> Result<()>;

    /// Remove any published metadata (queue cleared or playback stopped).
    async fn clear(&self) -> Result<()>;
}

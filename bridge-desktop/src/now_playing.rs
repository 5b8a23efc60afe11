//! Now-playing center that logs instead of talking to an OS media session.

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    now_playing::{NowPlayingCenter, NowPlayingMetadata},
};
use parking_lot::Mutex;
use tracing::info;

/// Desktop `NowPlayingCenter` that records the last published metadata.
#[derive(Debug, Default)]
pub struct LoggingNowPlayingCenter {
    current: Mutex<Option<NowPlayingMetadata>>,
}

impl LoggingNowPlayingCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata currently on display, if any.
    pub fn current(&self) -> Option<NowPlayingMetadata> {
        self.current.lock().clone()
    }
}

#[async_trait]
impl NowPlayingCenter for LoggingNowPlayingCenter {
    async fn update(&self, metadata: NowPlayingMetadata) -> Result<()> {
        info!(
            track_id = %metadata.track_id,
            title = %metadata.title,
            artist = %metadata.artist,
            album = metadata.album.as_deref().unwrap_or(""),
            duration_ms = metadata.duration.as_millis() as u64,
            "Now playing"
        );
        *self.current.lock() = Some(metadata);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if self.current.lock().take().is_some() {
            info!("Now playing cleared");
        }
        Ok(())
    }
}

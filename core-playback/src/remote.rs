//! # Remote Command Router
//!
//! Translates OS remote-control events (lock screen, notification shade,
//! headset buttons) into queue manager calls.
//!
//! The router is stateless and may receive commands while no UI is mounted
//! and while the queue is empty. The OS has no way to receive an error, so
//! failures are logged and swallowed, and seek targets are clamped into the
//! current track instead of rejected.

use bridge_traits::EngineEvent;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::Result;
use crate::queue_manager::QueueManager;

#[derive(Clone)]
pub struct RemoteCommandRouter {
    manager: Arc<QueueManager>,
}

impl RemoteCommandRouter {
    pub fn new(manager: Arc<QueueManager>) -> Self {
        Self { manager }
    }

    /// Route one event. Returns `false` for events that are not remote
    /// commands.
    pub async fn route(&self, event: &EngineEvent) -> bool {
        if !event.is_remote() {
            return false;
        }

        if self.manager.is_empty() {
            debug!(?event, "Remote command with empty queue ignored");
            return true;
        }

        debug!(?event, "Remote command");
        if let Err(e) = self.dispatch(event).await {
            warn!(?event, error = %e, "Remote command failed");
        }
        true
    }

    async fn dispatch(&self, event: &EngineEvent) -> Result<()> {
        match event {
            EngineEvent::RemotePlay => self.manager.play().await,
            EngineEvent::RemotePause => self.manager.pause().await,
            EngineEvent::RemoteStop => self.manager.stop().await,
            EngineEvent::RemoteNext => self.manager.next().await.map(|_| ()),
            EngineEvent::RemotePrevious => self.manager.previous().await.map(|_| ()),
            EngineEvent::RemoteSeek { position_ms } => {
                let target = self.clamp_seek(*position_ms);
                self.manager.seek_to(target).await
            }
            EngineEvent::QueueEnded | EngineEvent::ProgressTick { .. } => Ok(()),
        }
    }

    fn clamp_seek(&self, position_ms: u64) -> Duration {
        let duration = self
            .manager
            .current_track()
            .map(|track| track.duration)
            .unwrap_or(Duration::ZERO);
        Duration::from_millis(position_ms).min(duration)
    }
}

impl std::fmt::Debug for RemoteCommandRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCommandRouter").finish_non_exhaustive()
    }
}

//! Engine event dispatcher.
//!
//! One task drains the engine event channel and handles each event to
//! completion before taking the next, so events are processed strictly in
//! arrival order. Remote commands go to the [`RemoteCommandRouter`], end of
//! track to the [`QueueManager`], progress straight to the
//! [`SnapshotPublisher`].

use bridge_traits::EngineEvent;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::publisher::SnapshotPublisher;
use crate::queue_manager::QueueManager;
use crate::remote::RemoteCommandRouter;

pub struct EngineEventDispatcher {
    manager: Arc<QueueManager>,
    router: RemoteCommandRouter,
    publisher: SnapshotPublisher,
}

impl EngineEventDispatcher {
    pub fn new(manager: Arc<QueueManager>, publisher: SnapshotPublisher) -> Self {
        Self {
            router: RemoteCommandRouter::new(manager.clone()),
            manager,
            publisher,
        }
    }

    /// Handle a single engine event.
    pub async fn handle(&self, event: EngineEvent) {
        match event {
            EngineEvent::ProgressTick {
                position_ms,
                duration_ms,
                is_playing,
            } => {
                trace!(position_ms, duration_ms, is_playing, "Progress tick");
                self.publisher
                    .apply_progress(position_ms, duration_ms, is_playing);
            }
            EngineEvent::QueueEnded => {
                // End of the previous item, reported after a newer load began.
                if self.manager.adapter().is_loading() {
                    debug!("Ignoring end of track while a load is in flight");
                    return;
                }
                if let Err(e) = self.manager.on_queue_ended().await {
                    warn!(error = %e, "Failed to advance after end of track");
                }
            }
            remote => {
                self.router.route(&remote).await;
            }
        }
    }

    /// Consume `events` until the channel closes or `shutdown` fires.
    pub async fn run(self, mut events: UnboundedReceiver<EngineEvent>, shutdown: CancellationToken) {
        info!("Engine event dispatcher started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("Engine event dispatcher cancelled");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => {
                        debug!("Engine event channel closed");
                        break;
                    }
                },
            }
        }
        info!("Engine event dispatcher stopped");
    }

    pub fn spawn(
        self,
        events: UnboundedReceiver<EngineEvent>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(events, shutdown))
    }
}

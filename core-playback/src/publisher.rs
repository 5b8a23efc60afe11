//! # Snapshot Publisher
//!
//! Holds the single canonical [`PlaybackStatus`] and notifies observers when
//! it changes.
//!
//! ## Contract
//!
//! - [`get_snapshot`](SnapshotPublisher::get_snapshot) is synchronous and
//!   returns the same `Arc` between changes, so observers can detect change
//!   with `Arc::ptr_eq`.
//! - A candidate equal to the current status is discarded: no allocation, no
//!   notification.
//! - Callbacks receive no arguments. They re-pull the snapshot, which rules
//!   out lost updates between the notification and the read.
//!
//! ```ignore
//! let publisher = SnapshotPublisher::new();
//! let subscription = publisher.subscribe(|| println!("status changed"));
//! let status = publisher.get_snapshot();
//! drop(subscription); // unsubscribes
//! ```

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::trace;

use crate::model::PlaybackStatus;

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Publish/subscribe holder of the canonical playback status.
///
/// Cloning shares the same canonical status and subscriber list.
#[derive(Clone)]
pub struct SnapshotPublisher {
    inner: Arc<PublisherInner>,
}

struct PublisherInner {
    current: Mutex<Arc<PlaybackStatus>>,
    subscribers: Mutex<Vec<(u64, Callback)>>,
    next_id: AtomicU64,
    watch_tx: watch::Sender<Arc<PlaybackStatus>>,
}

impl SnapshotPublisher {
    pub fn new() -> Self {
        let initial = Arc::new(PlaybackStatus::default());
        let (watch_tx, _) = watch::channel(initial.clone());
        Self {
            inner: Arc::new(PublisherInner {
                current: Mutex::new(initial),
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                watch_tx,
            }),
        }
    }

    /// The current canonical status.
    pub fn get_snapshot(&self) -> Arc<PlaybackStatus> {
        self.inner.current.lock().clone()
    }

    /// Register `callback`; it runs after every change until the returned
    /// handle is dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.lock().push((id, Arc::new(callback)));
        Subscription {
            id,
            publisher: Arc::downgrade(&self.inner),
        }
    }

    /// Async alternative to [`subscribe`](Self::subscribe). The receiver
    /// observes the same canonical instances.
    pub fn watch(&self) -> watch::Receiver<Arc<PlaybackStatus>> {
        self.inner.watch_tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// Replace the status with `candidate` if any field differs.
    ///
    /// Returns `true` when subscribers were notified.
    pub fn publish(&self, candidate: PlaybackStatus) -> bool {
        self.update(|status| *status = candidate)
    }

    /// Apply a `ProgressTick`. Ticks that arrive while nothing is loaded
    /// (late ticks after a stop) are ignored.
    pub fn apply_progress(&self, position_ms: u64, duration_ms: u64, is_playing: bool) -> bool {
        self.update(|status| {
            if status.is_loaded {
                status.position_ms = position_ms;
                status.duration_ms = duration_ms;
                status.is_playing = is_playing;
            }
        })
    }

    /// A new item finished loading.
    pub fn mark_loaded(&self, duration_ms: u64) -> bool {
        self.publish(PlaybackStatus {
            position_ms: 0,
            duration_ms,
            is_playing: false,
            is_loaded: true,
        })
    }

    pub fn set_playing(&self, is_playing: bool) -> bool {
        self.update(|status| {
            if status.is_loaded {
                status.is_playing = is_playing;
            }
        })
    }

    pub fn set_position(&self, position_ms: u64) -> bool {
        self.update(|status| {
            if status.is_loaded {
                status.position_ms = position_ms.min(status.duration_ms);
            }
        })
    }

    /// Back to the initial all-zero, unloaded status.
    pub fn mark_unloaded(&self) -> bool {
        self.publish(PlaybackStatus::default())
    }

    fn update(&self, f: impl FnOnce(&mut PlaybackStatus)) -> bool {
        {
            let mut current = self.inner.current.lock();
            let mut candidate = **current;
            f(&mut candidate);
            if candidate == **current {
                return false;
            }

            let next = Arc::new(candidate);
            *current = next.clone();
            // Under the lock so the watch channel sees changes in order.
            self.inner.watch_tx.send_replace(next);
        }

        trace!("Playback status changed");
        self.notify();
        true
    }

    fn notify(&self) {
        let callbacks: Vec<Callback> = self
            .inner
            .subscribers
            .lock()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();

        for callback in callbacks {
            callback();
        }
    }
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SnapshotPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotPublisher")
            .field("status", &*self.get_snapshot())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle returned by [`SnapshotPublisher::subscribe`]. Dropping it
/// unsubscribes.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    publisher: Weak<PublisherInner>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.publisher.upgrade() {
            inner.subscribers.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

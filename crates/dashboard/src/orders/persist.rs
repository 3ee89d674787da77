//! Background persistence of order snapshots.
//!
//! Every mutation of the order book hands a full snapshot to the queue. A
//! single worker task writes snapshots to the record store in the order they
//! were enqueued. When several snapshots are waiting, only the newest is
//! written: each write replaces the whole table, so older ones are already
//! superseded.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use order_desk_core::Order;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

use crate::notices::Notices;
use crate::store::CachedStore;

/// A snapshot waiting to be written.
#[derive(Debug, Clone)]
pub struct SaveJob {
    /// Monotonic version; higher is newer.
    pub version: u64,
    /// Full order list at the time of the mutation.
    pub snapshot: Vec<Order>,
}

/// Counters describing the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStatus {
    /// Snapshots handed to the queue.
    pub enqueued: u64,
    /// Snapshots written to the store.
    pub written: u64,
    /// Snapshots skipped because a newer one superseded them.
    pub superseded: u64,
    /// Snapshots whose write failed.
    pub failed: u64,
    /// Version of the last snapshot written, 0 if none.
    pub last_written: u64,
}

impl QueueStatus {
    /// Snapshots that are no longer pending.
    #[must_use]
    pub const fn settled(&self) -> u64 {
        self.written + self.superseded + self.failed
    }

    /// Snapshots still waiting or in flight.
    #[must_use]
    pub const fn pending(&self) -> u64 {
        self.enqueued.saturating_sub(self.settled())
    }
}

/// Handle to the persistence worker.
#[derive(Clone)]
pub struct PersistQueue {
    inner: Arc<PersistQueueInner>,
}

struct PersistQueueInner {
    sender: mpsc::UnboundedSender<SaveJob>,
    next_version: AtomicU64,
    status: watch::Sender<QueueStatus>,
    notices: Notices,
}

impl std::fmt::Debug for PersistQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistQueue")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl PersistQueue {
    /// Spawn the worker on the current tokio runtime.
    #[must_use]
    pub fn spawn(store: CachedStore, notices: Notices) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(QueueStatus::default());

        tokio::spawn(run_worker(receiver, store, status.clone(), notices.clone()));

        Self {
            inner: Arc::new(PersistQueueInner {
                sender,
                next_version: AtomicU64::new(1),
                status,
                notices,
            }),
        }
    }

    /// Queue a snapshot for writing and return its version.
    ///
    /// Empty snapshots are never written and return `None`: clearing the
    /// table is not something a single delete should be able to do. A
    /// notice says the change was kept in memory only.
    pub fn enqueue(&self, snapshot: Vec<Order>) -> Option<u64> {
        if snapshot.is_empty() {
            debug!("Skipping save of empty order list");
            self.inner.notices.warn(
                "The order list is now empty; this change was not saved and the \
                 stored orders will return after a refresh",
            );
            return None;
        }

        let version = self.inner.next_version.fetch_add(1, Ordering::SeqCst);
        self.inner.status.send_modify(|s| s.enqueued += 1);

        if self
            .inner
            .sender
            .send(SaveJob { version, snapshot })
            .is_err()
        {
            warn!(version, "Persistence worker has stopped; snapshot not saved");
            self.inner.status.send_modify(|s| s.failed += 1);
        }
        Some(version)
    }

    /// Current counters.
    #[must_use]
    pub fn status(&self) -> QueueStatus {
        *self.inner.status.borrow()
    }

    /// Wait until everything enqueued so far has been written, superseded
    /// or has failed.
    pub async fn flush(&self) {
        let target = self.status().enqueued;
        let mut rx = self.inner.status.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|s| s.settled() >= target).await;
    }
}

#[instrument(skip_all)]
async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<SaveJob>,
    store: CachedStore,
    status: watch::Sender<QueueStatus>,
    notices: Notices,
) {
    info!(store = %store.describe(), "Persistence worker started");

    while let Some(mut job) = receiver.recv().await {
        let mut skipped = 0;
        while let Ok(newer) = receiver.try_recv() {
            if newer.version > job.version {
                job = newer;
            }
            skipped += 1;
        }

        let last_written = status.borrow().last_written;
        if job.version <= last_written {
            skipped += 1;
            status.send_modify(|s| s.superseded += skipped);
            continue;
        }
        if skipped > 0 {
            debug!(skipped, version = job.version, "Coalesced superseded snapshots");
            status.send_modify(|s| s.superseded += skipped);
        }

        match store.save(&job.snapshot).await {
            Ok(()) => {
                debug!(version = job.version, count = job.snapshot.len(), "Saved orders");
                status.send_modify(|s| {
                    s.written += 1;
                    s.last_written = job.version;
                });
            }
            Err(e) => {
                warn!(version = job.version, error = %e, "Failed to save orders");
                notices.warn(format!("Saving orders failed, latest changes are not stored: {e}"));
                status.send_modify(|s| s.failed += 1);
            }
        }
    }

    info!("Persistence worker stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::store::MemoryStore;
    use crate::test_support::order;

    fn queue(store: &Arc<MemoryStore>, notices: &Notices) -> PersistQueue {
        let cached = CachedStore::new(store.clone(), Duration::from_secs(600), notices.clone());
        PersistQueue::spawn(cached, notices.clone())
    }

    #[tokio::test]
    async fn test_latest_snapshot_wins() {
        let store = Arc::new(MemoryStore::new());
        let notices = Notices::new();
        let queue = queue(&store, &notices);

        let a = order("A", "1");
        let b = order("B", "2");
        let c = order("C", "3");
        queue.enqueue(vec![a.clone()]);
        queue.enqueue(vec![b.clone(), a.clone()]);
        let last = queue.enqueue(vec![c.clone(), b.clone(), a.clone()]).unwrap();
        queue.flush().await;

        assert_eq!(store.orders().await, vec![c, b, a]);
        let status = queue.status();
        assert_eq!(status.enqueued, 3);
        assert_eq!(status.settled(), 3);
        assert_eq!(status.last_written, last);
        assert!(store.write_count() <= 3);
        assert_eq!(status.written, store.write_count() as u64);
    }

    #[tokio::test]
    async fn test_versions_are_monotonic() {
        let store = Arc::new(MemoryStore::new());
        let notices = Notices::new();
        let queue = queue(&store, &notices);

        let first = queue.enqueue(vec![order("A", "1")]).unwrap();
        let second = queue.enqueue(vec![order("B", "2")]).unwrap();
        assert!(second > first);
        queue.flush().await;
    }

    #[tokio::test]
    async fn test_empty_snapshot_is_not_enqueued() {
        let store = Arc::new(MemoryStore::with_orders(vec![order("A", "1")]));
        let notices = Notices::new();
        let queue = queue(&store, &notices);

        assert_eq!(queue.enqueue(Vec::new()), None);
        queue.flush().await;

        assert_eq!(queue.status().enqueued, 0);
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.orders().await.len(), 1);
        assert!(notices.drain()[0].message.contains("not saved"));
    }

    #[tokio::test]
    async fn test_failure_is_recorded_and_not_retried() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let notices = Notices::new();
        let queue = queue(&store, &notices);

        queue.enqueue(vec![order("A", "1")]);
        queue.flush().await;

        assert_eq!(queue.status().failed, 1);
        assert_eq!(notices.len(), 1);

        store.set_failing(false);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.write_count(), 0, "failed saves are not retried");

        queue.enqueue(vec![order("B", "2")]);
        queue.flush().await;
        assert_eq!(store.write_count(), 1);
        assert_eq!(queue.status().written, 1);
    }

    #[test]
    fn test_status_pending() {
        let status = QueueStatus {
            enqueued: 5,
            written: 2,
            superseded: 1,
            failed: 1,
            last_written: 4,
        };
        assert_eq!(status.settled(), 4);
        assert_eq!(status.pending(), 1);
    }
}

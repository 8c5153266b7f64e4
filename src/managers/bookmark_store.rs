//! Bookmark Store.
//!
//! The in-memory ordered collection the dashboard renders from. Every write
//! swaps the whole `Arc<[Bookmark]>` under the watch channel's lock, so a reader
//! only ever sees a fully applied state. Writes come from the reconciler only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::types::bookmark::Bookmark;

/// Immutable view of the store at one point in time.
pub type Snapshot = Arc<[Bookmark]>;

pub struct BookmarkStore {
    tx: watch::Sender<Snapshot>,
    closed: AtomicBool,
}

impl BookmarkStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Snapshot::from(Vec::new()));
        Self {
            tx,
            closed: AtomicBool::new(false),
        }
    }

    /// Runs `op` under the channel lock unless the store is closed.
    ///
    /// Observers are notified only when `op` reports a change.
    fn write(&self, op: &'static str, f: impl FnOnce(&mut Snapshot) -> bool) -> bool {
        let mut changed = false;
        self.tx.send_if_modified(|items| {
            if self.closed.load(Ordering::Acquire) {
                debug!(op, "store closed, write ignored");
                return false;
            }
            changed = f(items);
            changed
        });
        if changed {
            debug!(op, len = self.tx.borrow().len(), "store updated");
        }
        changed
    }

    /// Atomically replaces the visible collection.
    ///
    /// An identical snapshot leaves the store untouched and wakes nobody.
    pub fn replace_all(&self, snapshot: Vec<Bookmark>) -> bool {
        self.write("replace_all", |items| {
            if items[..] == snapshot[..] {
                return false;
            }
            *items = Snapshot::from(snapshot);
            true
        })
    }

    /// Puts `item` first regardless of its `created_at`. An older copy with the
    /// same id is dropped.
    pub fn prepend(&self, item: Bookmark) -> bool {
        self.write("prepend", |items| {
            let mut next = Vec::with_capacity(items.len() + 1);
            next.extend(items.iter().filter(|b| b.id != item.id).cloned());
            next.insert(0, item);
            *items = Snapshot::from(next);
            true
        })
    }

    pub fn remove_by_id(&self, id: &str) -> bool {
        self.write("remove_by_id", |items| {
            if !items.iter().any(|b| b.id == id) {
                return false;
            }
            let next: Vec<Bookmark> = items.iter().filter(|b| b.id != id).cloned().collect();
            *items = Snapshot::from(next);
            true
        })
    }

    pub fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    /// Receiver that yields every fully applied state from now on.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tx.borrow().iter().any(|b| b.id == id)
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Detaches the store from its view. Later writes are no-ops.
    pub fn close(&self) {
        // Taken under the channel lock so no write straddles the close.
        self.tx.send_if_modified(|_| {
            self.closed.store(true, Ordering::Release);
            false
        });
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Default for BookmarkStore {
    fn default() -> Self {
        Self::new()
    }
}

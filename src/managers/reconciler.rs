//! Reconciler: the merge policy between the system of record and the store.
//!
//! Refreshes (initial mount and every feed signal) replace the whole
//! collection with the canonical snapshot. Confirmed mutations apply their
//! single-row effect. Whichever call completes last wins; there is no
//! versioning.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::managers::bookmark_store::BookmarkStore;
use crate::services::storage::BookmarkRepository;
use crate::types::bookmark::Bookmark;
use crate::types::errors::BookmarkError;
use crate::types::session::Session;

pub struct Reconciler {
    store: Arc<BookmarkStore>,
    repository: Arc<dyn BookmarkRepository>,
}

impl Reconciler {
    pub fn new(store: Arc<BookmarkStore>, repository: Arc<dyn BookmarkRepository>) -> Self {
        Self { store, repository }
    }

    pub fn store(&self) -> &Arc<BookmarkStore> {
        &self.store
    }

    /// Fetches the owner's collection and replaces the store with it.
    ///
    /// Returns whether the visible state changed. On error the store keeps its
    /// last good state.
    pub async fn refresh(&self, session: &Session) -> Result<bool, BookmarkError> {
        let fetched = self
            .repository
            .select(session)
            .await
            .map_err(|e| BookmarkError::Fetch(e.to_string()))?;

        let snapshot = normalize(fetched);
        let count = snapshot.len();
        let changed = self.store.replace_all(snapshot);
        debug!(count, changed, "refresh reconciled");
        Ok(changed)
    }

    /// Applies a create confirmed by the system of record.
    pub fn apply_created(&self, record: Bookmark) -> bool {
        self.store.prepend(record)
    }

    /// Applies a delete confirmed by the system of record.
    pub fn apply_deleted(&self, id: &str) -> bool {
        self.store.remove_by_id(id)
    }
}

/// Orders newest first and keeps the first copy of each id.
///
/// The sort is stable, so ties on `created_at` keep the backend's order.
pub fn normalize(mut items: Vec<Bookmark>) -> Vec<Bookmark> {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let mut seen = HashSet::with_capacity(items.len());
    items.retain(|b| seen.insert(b.id.clone()));
    items
}

//! Mutation Gateway.
//!
//! Create and delete intents go to the system of record first; the store is
//! only touched once the backend has confirmed. A failed mutation therefore
//! leaves no residue, and the error is handed back for the caller to present.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::managers::reconciler::Reconciler;
use crate::services::storage::BookmarkRepository;
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::errors::{AuthError, BookmarkError, ValidationError};
use crate::types::session::Session;

#[derive(Clone)]
pub struct MutationGateway {
    repository: Arc<dyn BookmarkRepository>,
    reconciler: Arc<Reconciler>,
}

/// Checks the creation form. Returns the trimmed title and URL.
pub fn validate(title: &str, url: &str) -> Result<(String, String), ValidationError> {
    let title = title.trim();
    let url = url.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if url.is_empty() {
        return Err(ValidationError::EmptyUrl);
    }
    Ok((title.to_string(), url.to_string()))
}

/// An expired session may not mutate, whatever view it was captured in.
fn ensure_live(session: &Session) -> Result<(), BookmarkError> {
    if session.is_expired_at(Utc::now()) {
        warn!(user = %session.user.id, "mutation refused, session expired");
        return Err(AuthError::NotAuthenticated.into());
    }
    Ok(())
}

impl MutationGateway {
    pub fn new(repository: Arc<dyn BookmarkRepository>, reconciler: Arc<Reconciler>) -> Self {
        Self {
            repository,
            reconciler,
        }
    }

    /// Creates a bookmark owned by the session's user.
    ///
    /// The record the backend returns, not a client-built one, is prepended, so
    /// the rendered id always matches the durable id.
    pub async fn create(&self, session: &Session, title: &str, url: &str) -> Result<Bookmark, BookmarkError> {
        ensure_live(session)?;
        let (title, url) = validate(title, url)?;
        let record = NewBookmark {
            title,
            url,
            owner: session.owner_id().to_string(),
        };

        let created = self.repository.insert(session, record).await.map_err(|e| {
            warn!(error = %e, "bookmark create rejected");
            BookmarkError::RemoteWrite(e.to_string())
        })?;

        let applied = self.reconciler.apply_created(created.clone());
        info!(id = %created.id, applied, "bookmark created");
        Ok(created)
    }

    /// Deletes a bookmark currently shown in the store.
    ///
    /// The entry stays visible until the backend confirms, so a failure can be
    /// retried from the same row.
    pub async fn delete(&self, session: &Session, id: &str) -> Result<(), BookmarkError> {
        ensure_live(session)?;
        if !self.reconciler.store().contains(id) {
            return Err(BookmarkError::NotInStore(id.to_string()));
        }

        self.repository.delete(session, id).await.map_err(|e| {
            warn!(id, error = %e, "bookmark delete rejected");
            BookmarkError::RemoteDelete(e.to_string())
        })?;

        let applied = self.reconciler.apply_deleted(id);
        info!(id, applied, "bookmark deleted");
        Ok(())
    }
}

//! Storage collaborator: the system of record for bookmarks.
//!
//! [`BookmarkRepository`] is what the reconciler and the mutation gateway talk
//! to. [`SqliteBookmarkRepository`] keeps the records in the local database and
//! announces every committed write on a [`LocalChangeFeed`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::debug;
use uuid::Uuid;

use crate::database::connection::{self, SharedDatabase};
use crate::services::change_feed::LocalChangeFeed;
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::errors::StorageError;
use crate::types::feed::{ChangeEvent, ChangeKind};
use crate::types::session::Session;

/// Owner-scoped access to the durable bookmark collection.
#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// All bookmarks owned by the session's user, newest first.
    async fn select(&self, session: &Session) -> Result<Vec<Bookmark>, StorageError>;
    /// Inserts a record and returns it as stored, with server-assigned `id` and `created_at`.
    async fn insert(&self, session: &Session, record: NewBookmark) -> Result<Bookmark, StorageError>;
    /// Deletes one of the session user's bookmarks.
    async fn delete(&self, session: &Session, id: &str) -> Result<(), StorageError>;
}

/// Bookmark repository backed by the local SQLite database.
pub struct SqliteBookmarkRepository {
    db: SharedDatabase,
    feed: Option<Arc<LocalChangeFeed>>,
    collection: String,
}

impl SqliteBookmarkRepository {
    pub fn new(db: SharedDatabase) -> Self {
        Self {
            db,
            feed: None,
            collection: "bookmarks".to_string(),
        }
    }

    /// Publishes a change event on `feed` after every committed write.
    pub fn with_feed(mut self, feed: Arc<LocalChangeFeed>, collection: &str) -> Self {
        self.feed = Some(feed);
        self.collection = collection.to_string();
        self
    }

    fn announce(&self, kind: ChangeKind, id: &str) {
        if let Some(feed) = &self.feed {
            feed.publish(ChangeEvent {
                collection: self.collection.clone(),
                kind,
                record_id: Some(id.to_string()),
            });
        }
    }

    /// Current time truncated to the millisecond precision the table stores.
    fn now() -> DateTime<Utc> {
        let now = Utc::now();
        DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
    }

    fn row_to_bookmark(row: &rusqlite::Row) -> rusqlite::Result<Bookmark> {
        let millis: i64 = row.get(4)?;
        let created_at = DateTime::from_timestamp_millis(millis)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(4, millis))?;
        Ok(Bookmark {
            id: row.get(0)?,
            title: row.get(1)?,
            url: row.get(2)?,
            owner: row.get(3)?,
            created_at,
        })
    }
}

fn db_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::DatabaseError(e.to_string())
}

#[async_trait]
impl BookmarkRepository for SqliteBookmarkRepository {
    async fn select(&self, session: &Session) -> Result<Vec<Bookmark>, StorageError> {
        let db = connection::lock(&self.db).map_err(db_err)?;
        let mut stmt = db
            .connection()
            .prepare(
                "SELECT id, title, url, user_id, created_at FROM bookmarks \
                 WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![session.owner_id()], Self::row_to_bookmark)
            .map_err(db_err)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(db_err)?);
        }
        Ok(results)
    }

    async fn insert(&self, session: &Session, record: NewBookmark) -> Result<Bookmark, StorageError> {
        let bookmark = Bookmark {
            id: Uuid::new_v4().to_string(),
            title: record.title,
            url: record.url,
            owner: session.owner_id().to_string(),
            created_at: Self::now(),
        };

        {
            let db = connection::lock(&self.db).map_err(db_err)?;
            db.connection()
                .execute(
                    "INSERT INTO bookmarks (id, title, url, user_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        bookmark.id,
                        bookmark.title,
                        bookmark.url,
                        bookmark.owner,
                        bookmark.created_at.timestamp_millis()
                    ],
                )
                .map_err(db_err)?;
        }

        debug!(id = %bookmark.id, owner = %bookmark.owner, "bookmark inserted");
        self.announce(ChangeKind::Insert, &bookmark.id);
        Ok(bookmark)
    }

    async fn delete(&self, session: &Session, id: &str) -> Result<(), StorageError> {
        let affected = {
            let db = connection::lock(&self.db).map_err(db_err)?;
            db.connection()
                .execute(
                    "DELETE FROM bookmarks WHERE id = ?1 AND user_id = ?2",
                    params![id, session.owner_id()],
                )
                .map_err(db_err)?
        };

        if affected == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }

        debug!(id, "bookmark deleted");
        self.announce(ChangeKind::Delete, id);
        Ok(())
    }
}

//! Cross-process change detection for the SQLite backend.
//!
//! `PRAGMA data_version` moves whenever another connection commits to the
//! same database file; commits on our own connection leave it alone. The
//! poller turns each move into a dirty-signal on the local hub, so processes
//! sharing one file hear each other's writes.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::database::connection::{self, SharedDatabase};
use crate::services::change_feed::LocalChangeFeed;
use crate::types::errors::StorageError;
use crate::types::feed::{ChangeEvent, ChangeKind};

pub fn read_data_version(db: &SharedDatabase) -> Result<i64, StorageError> {
    let db = connection::lock(db).map_err(StorageError::DatabaseError)?;
    db.connection()
        .query_row("PRAGMA data_version", [], |row| row.get(0))
        .map_err(|e| StorageError::DatabaseError(e.to_string()))
}

/// Polls every `every` and publishes an `Update` with no record id on change.
///
/// Must be called from within a tokio runtime. Runs until aborted.
pub fn spawn_poller(
    db: SharedDatabase,
    feed: Arc<LocalChangeFeed>,
    collection: String,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last = None;

        loop {
            ticker.tick().await;
            let version = match read_data_version(&db) {
                Ok(version) => version,
                Err(e) => {
                    warn!(error = %e, "data_version poll failed");
                    continue;
                }
            };

            if last.is_some_and(|prev| prev != version) {
                let delivered = feed.publish(ChangeEvent {
                    collection: collection.clone(),
                    kind: ChangeKind::Update,
                    record_id: None,
                });
                debug!(version, delivered, "external commit detected");
            }
            last = Some(version);
        }
    })
}

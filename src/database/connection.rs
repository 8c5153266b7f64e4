//! SQLite connection management for the local system of record.
//!
//! [`Database`] wraps a `rusqlite::Connection` and migrates the schema on open.
//! Services share it as a [`SharedDatabase`]: the connection is `Send` but not
//! `Sync`, so every query runs under the mutex and no lock is held across an
//! `.await`.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use super::migrations;

/// Database handle shared between the auth provider and the bookmark repository.
pub type SharedDatabase = Arc<Mutex<Database>>;

/// Owns a migrated `rusqlite::Connection`.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) the database file at `path` and runs migrations.
    ///
    /// # Errors
    /// Returns `rusqlite::Error` if the file cannot be opened or a migration fails.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        Self::migrated(Connection::open(path)?)
    }

    /// Opens a private in-memory database and runs migrations.
    ///
    /// # Errors
    /// Returns `rusqlite::Error` if a migration fails.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Self::migrated(Connection::open_in_memory()?)
    }

    fn migrated(conn: Connection) -> Result<Self, rusqlite::Error> {
        migrations::run_all(&conn)?;
        Ok(Self { conn })
    }

    /// Wraps the database for sharing across tasks.
    pub fn into_shared(self) -> SharedDatabase {
        Arc::new(Mutex::new(self))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Returns the applied schema version.
    pub fn schema_version(&self) -> i32 {
        migrations::get_schema_version(&self.conn)
    }
}

/// Locks a shared database, turning mutex poisoning into a displayable error.
pub fn lock(db: &SharedDatabase) -> Result<MutexGuard<'_, Database>, String> {
    db.lock().map_err(|e| format!("database lock poisoned: {}", e))
}

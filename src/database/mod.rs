//! syncmarks database layer.
//!
//! The local system of record: SQLite connection management and versioned
//! schema migrations.
//!
//! # Usage
//!
//! ```no_run
//! use syncmarks::database::Database;
//!
//! let shared = Database::open("syncmarks.db")
//!     .expect("failed to open database")
//!     .into_shared();
//! ```

pub mod connection;
pub mod migrations;

pub use connection::{Database, SharedDatabase};

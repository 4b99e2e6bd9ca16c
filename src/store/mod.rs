//! Durable local key-value storage
//!
//! The cache keeps exactly two records here: the bookmark set and the
//! session. [`Database`](crate::db::Database) is the on-disk implementation;
//! [`MemoryStore`] backs tests and ephemeral runs.

mod memory;

pub use memory::MemoryStore;

use thiserror::Error;

/// Key holding the serialized bookmark set
pub const BOOKMARKS_KEY: &str = "bookmarks";

/// Key holding the serialized session
pub const SESSION_KEY: &str = "session";

/// Errors raised by a [`KeyValueStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` failure
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The store refused the operation
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Byte-oriented durable storage.
///
/// `set` must only return `Ok` once the value is durable; the cache relies
/// on that to keep memory and storage consistent.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Delete a value. Deleting a missing key succeeds.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

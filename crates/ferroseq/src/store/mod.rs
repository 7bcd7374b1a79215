//! Persistent backing for sequence rows.
//!
//! The allocator needs exactly three statements from a store, each committed
//! on its own:
//!
//! - `SELECT value FROM <table> WHERE name = ?`
//! - `INSERT INTO <table>(name, value) VALUES(?, ?)`
//! - `UPDATE <table> SET value = ? WHERE name = ? AND value = ?`
//!
//! The last one is the compare-and-swap primitive: the number of affected rows
//! tells the caller whether it won the segment. Any store that can express a
//! conditional single-row write (a relational database, a transactional
//! key-value store) can back the allocator.

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::*;
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
#[cfg(feature = "sqlite")]
pub use sqlite::*;

/// A result type for store operations.
pub type StoreResult<T> = core::result::Result<T, StoreError>;

/// Failures raised by a store or one of its connections.
///
/// The allocator treats every variant as transient: the attempt is abandoned,
/// its connection is released, and the next attempt starts from a fresh read.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The sequence table has not been created.
    #[error("table '{table}' does not exist")]
    NoSuchTable {
        /// The missing table.
        table: String,
    },

    /// An insert collided with an existing row, usually because another
    /// process created the sequence first.
    #[error("sequence '{name}' already exists in table '{table}'")]
    DuplicateKey {
        /// The table written to.
        table: String,
        /// The sequence name.
        name: String,
    },

    /// The store could not be reached.
    #[error("store unavailable: {reason}")]
    Unavailable {
        /// What went wrong.
        reason: String,
    },

    /// SQLite reported an error.
    #[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// A source of store connections.
///
/// Connections are acquired per attempt and released when dropped, so an
/// attempt that fails halfway never leaks one.
pub trait SequenceStore: Send + Sync {
    /// Connection type handed out by [`Self::connect`].
    type Connection<'a>: StoreConnection
    where
        Self: 'a;

    /// Acquires a connection.
    ///
    /// # Errors
    /// Returns a [`StoreError`] if the store cannot be reached.
    fn connect(&self) -> StoreResult<Self::Connection<'_>>;

    /// Creates the sequence table unless it already exists.
    ///
    /// Returns `true` if the table was created by this call.
    ///
    /// # Errors
    /// Returns a [`StoreError`] if the schema cannot be inspected or created.
    fn ensure_table(&self, table: &str) -> StoreResult<bool>;
}

/// A single store connection running auto-committed statements.
pub trait StoreConnection {
    /// Reads the high-water mark of `name`, or `None` if the row is absent.
    ///
    /// # Errors
    /// Returns a [`StoreError`] on any statement failure.
    fn select_value(&mut self, table: &str, name: &str) -> StoreResult<Option<i64>>;

    /// Creates the row for `name`. Returns the number of rows inserted.
    ///
    /// # Errors
    /// Returns [`StoreError::DuplicateKey`] (or the backend's equivalent) if
    /// the row already exists.
    fn insert_value(&mut self, table: &str, name: &str, value: i64) -> StoreResult<u64>;

    /// Sets the row for `name` to `new` only if it still holds `expected`.
    ///
    /// Returns the number of rows updated: `1` if this caller won, `0` if
    /// another writer moved the value first.
    ///
    /// # Errors
    /// Returns a [`StoreError`] on any statement failure.
    fn compare_and_swap(
        &mut self,
        table: &str,
        name: &str,
        expected: i64,
        new: i64,
    ) -> StoreResult<u64>;
}

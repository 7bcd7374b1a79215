use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, ErrorCode, OpenFlags, OptionalExtension, params};

use crate::store::{SequenceStore, StoreConnection, StoreError, StoreResult};

/// How long a statement waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A SQLite-backed store.
///
/// Every [`connect`](SequenceStore::connect) opens a fresh connection to the
/// database file and every statement commits on its own. Several processes
/// can point at the same file: the conditional `UPDATE` is what arbitrates
/// between them, not a held lock.
///
/// Schema:
/// - `<table>`: `(name VARCHAR(64) PRIMARY KEY, value BIGINT NOT NULL)`
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteStore {
    /// Creates a store over the database file at `path`.
    ///
    /// Nothing is opened until the first [`connect`](SequenceStore::connect);
    /// the file is created on demand.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Overrides [`DEFAULT_BUSY_TIMEOUT`].
    #[must_use]
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    /// Path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> StoreResult<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        let conn = Connection::open_with_flags(&self.path, flags)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }
}

impl SequenceStore for SqliteStore {
    type Connection<'a> = SqliteConnection;

    fn connect(&self) -> StoreResult<SqliteConnection> {
        Ok(SqliteConnection { conn: self.open()? })
    }

    fn ensure_table(&self, table: &str) -> StoreResult<bool> {
        let conn = self.open()?;
        // WAL lets readers proceed while another process holds the write lock.
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            params![table],
            |row| row.get(0),
        )?;
        if exists {
            return Ok(false);
        }

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                name VARCHAR(64) NOT NULL PRIMARY KEY,
                value BIGINT NOT NULL
            );",
            quote_ident(table)
        ))?;

        tracing::info!(table, path = %self.path.display(), "created sequence table");
        Ok(true)
    }
}

/// A single connection to a [`SqliteStore`], closed on drop.
#[derive(Debug)]
pub struct SqliteConnection {
    conn: Connection,
}

impl StoreConnection for SqliteConnection {
    fn select_value(&mut self, table: &str, name: &str) -> StoreResult<Option<i64>> {
        let sql = format!("SELECT value FROM {} WHERE name = ?1", quote_ident(table));
        let value = self
            .conn
            .query_row(&sql, params![name], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn insert_value(&mut self, table: &str, name: &str, value: i64) -> StoreResult<u64> {
        let sql = format!(
            "INSERT INTO {}(name, value) VALUES(?1, ?2)",
            quote_ident(table)
        );
        match self.conn.execute(&sql, params![name, value]) {
            Ok(count) => Ok(count as u64),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateKey {
                    table: table.to_owned(),
                    name: name.to_owned(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn compare_and_swap(
        &mut self,
        table: &str,
        name: &str,
        expected: i64,
        new: i64,
    ) -> StoreResult<u64> {
        let sql = format!(
            "UPDATE {} SET value = ?1 WHERE name = ?2 AND value = ?3",
            quote_ident(table)
        );
        let count = self.conn.execute(&sql, params![new, name, expected])?;
        Ok(count as u64)
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

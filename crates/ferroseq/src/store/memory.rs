use std::collections::HashMap;

use portable_atomic::{AtomicU32, Ordering};

use crate::mutex::{Mutex, MutexGuard};
use crate::store::{SequenceStore, StoreConnection, StoreError, StoreResult};

type Tables = HashMap<String, HashMap<String, i64>>;

/// An in-process store.
///
/// Each statement takes the store lock on its own, which mirrors the
/// auto-commit behavior of a SQL connection: nothing spans a read and the
/// conditional write that follows it. Several allocators sharing one
/// `MemoryStore` therefore race for segments the same way separate processes
/// race on a shared database.
///
/// The store can also inject connection failures with
/// [`Self::fail_next_connects`], which is how the retry path is exercised.
///
/// # Example
/// ```
/// use ferroseq::{MemoryStore, SequenceStore};
///
/// let store = MemoryStore::new();
/// assert!(store.ensure_table("sequence").unwrap());
/// assert!(!store.ensure_table("sequence").unwrap());
/// assert_eq!(store.value("sequence", "ORDER"), None);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failures: AtomicU32,
}

impl MemoryStore {
    /// Creates an empty store with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` calls to [`SequenceStore::connect`] fail with
    /// [`StoreError::Unavailable`].
    pub fn fail_next_connects(&self, count: u32) {
        self.failures.store(count, Ordering::Release);
    }

    /// Reads a row without going through a connection.
    pub fn value(&self, table: &str, name: &str) -> Option<i64> {
        let tables = self.lock_tables().ok()?;
        tables.get(table)?.get(name).copied()
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| {
                left.checked_sub(1)
            })
            .is_ok()
    }

    fn lock_tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        #[cfg(feature = "parking-lot")]
        {
            Ok(self.tables.lock())
        }
        #[cfg(not(feature = "parking-lot"))]
        {
            self.tables.lock().map_err(|_| StoreError::Unavailable {
                reason: "memory store lock poisoned".to_owned(),
            })
        }
    }
}

impl SequenceStore for MemoryStore {
    type Connection<'a> = MemoryConnection<'a>;

    fn connect(&self) -> StoreResult<MemoryConnection<'_>> {
        if self.take_failure() {
            return Err(StoreError::Unavailable {
                reason: "injected connection failure".to_owned(),
            });
        }
        Ok(MemoryConnection { store: self })
    }

    fn ensure_table(&self, table: &str) -> StoreResult<bool> {
        let mut tables = self.lock_tables()?;
        if tables.contains_key(table) {
            return Ok(false);
        }
        tables.insert(table.to_owned(), HashMap::new());
        Ok(true)
    }
}

/// A connection to a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryConnection<'a> {
    store: &'a MemoryStore,
}

impl MemoryConnection<'_> {
    fn with_table<R>(
        &self,
        table: &str,
        f: impl FnOnce(&mut HashMap<String, i64>) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let mut tables = self.store.lock_tables()?;
        let rows = tables.get_mut(table).ok_or_else(|| StoreError::NoSuchTable {
            table: table.to_owned(),
        })?;
        f(rows)
    }
}

impl StoreConnection for MemoryConnection<'_> {
    fn select_value(&mut self, table: &str, name: &str) -> StoreResult<Option<i64>> {
        self.with_table(table, |rows| Ok(rows.get(name).copied()))
    }

    fn insert_value(&mut self, table: &str, name: &str, value: i64) -> StoreResult<u64> {
        self.with_table(table, |rows| {
            if rows.contains_key(name) {
                return Err(StoreError::DuplicateKey {
                    table: table.to_owned(),
                    name: name.to_owned(),
                });
            }
            rows.insert(name.to_owned(), value);
            Ok(1)
        })
    }

    fn compare_and_swap(
        &mut self,
        table: &str,
        name: &str,
        expected: i64,
        new: i64,
    ) -> StoreResult<u64> {
        self.with_table(table, |rows| match rows.get_mut(name) {
            Some(value) if *value == expected => {
                *value = new;
                Ok(1)
            }
            _ => Ok(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "sequence";

    #[test]
    fn statements_fail_without_table() {
        let store = MemoryStore::new();
        let mut conn = store.connect().unwrap();
        assert!(matches!(
            conn.select_value(TABLE, "A"),
            Err(StoreError::NoSuchTable { .. })
        ));
    }

    #[test]
    fn insert_then_select() {
        let store = MemoryStore::new();
        store.ensure_table(TABLE).unwrap();
        let mut conn = store.connect().unwrap();

        assert_eq!(conn.select_value(TABLE, "A").unwrap(), None);
        assert_eq!(conn.insert_value(TABLE, "A", 5).unwrap(), 1);
        assert_eq!(conn.select_value(TABLE, "A").unwrap(), Some(5));
        assert!(matches!(
            conn.insert_value(TABLE, "A", 9),
            Err(StoreError::DuplicateKey { .. })
        ));
        assert_eq!(store.value(TABLE, "A"), Some(5));
    }

    #[test]
    fn compare_and_swap_requires_expected_value() {
        let store = MemoryStore::new();
        store.ensure_table(TABLE).unwrap();
        let mut conn = store.connect().unwrap();
        conn.insert_value(TABLE, "A", 5).unwrap();

        assert_eq!(conn.compare_and_swap(TABLE, "A", 4, 10).unwrap(), 0);
        assert_eq!(conn.compare_and_swap(TABLE, "A", 5, 10).unwrap(), 1);
        assert_eq!(conn.compare_and_swap(TABLE, "A", 5, 15).unwrap(), 0);
        assert_eq!(conn.compare_and_swap(TABLE, "missing", 0, 1).unwrap(), 0);
        assert_eq!(store.value(TABLE, "A"), Some(10));
    }

    #[test]
    fn injected_failures_are_consumed() {
        let store = MemoryStore::new();
        store.fail_next_connects(2);
        assert!(matches!(
            store.connect(),
            Err(StoreError::Unavailable { .. })
        ));
        assert!(store.connect().is_err());
        assert!(store.connect().is_ok());
    }
}

use std::{collections::HashSet, thread};

use anyhow::anyhow;
use ferroseq::Sequence;

/// Draws `count` values from `name` on each of `threads` threads, all sharing
/// `sequence`.
///
/// Returns one vector per thread, each in the order its values were issued.
pub fn issue_values<Q>(
    sequence: &Q,
    name: &str,
    count: usize,
    threads: usize,
) -> anyhow::Result<Vec<Vec<i64>>>
where
    Q: Sequence + Sync,
{
    thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(move || {
                    (0..count)
                        .map(|_| sequence.next_for(name))
                        .collect::<ferroseq::Result<Vec<_>>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| -> anyhow::Result<Vec<i64>> {
                let values = handle
                    .join()
                    .map_err(|_| anyhow!("issuing thread panicked"))??;
                Ok(values)
            })
            .collect()
    })
}

/// Values that appear more than once across `batches`, sorted.
pub fn find_duplicates(batches: &[Vec<i64>]) -> Vec<i64> {
    let mut seen = HashSet::new();
    let mut duplicates: Vec<i64> = batches
        .iter()
        .flatten()
        .filter(|value| !seen.insert(**value))
        .copied()
        .collect();
    duplicates.sort_unstable();
    duplicates.dedup();
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferroseq::{MemoryStore, SequenceAllocator, SequenceConfig, SequenceStore, SqliteStore};
    use std::sync::Arc;

    #[test]
    fn single_thread_values_are_consecutive() {
        let store = Arc::new(MemoryStore::new());
        let config = SequenceConfig::default().with_step(4).unwrap();
        store.ensure_table(config.table_name()).unwrap();
        let allocator = SequenceAllocator::new(store, config).unwrap();

        let batches = issue_values(&allocator, "ORDER", 10, 1).unwrap();
        assert_eq!(batches, vec![(1..=10).collect::<Vec<_>>()]);
    }

    #[test]
    fn threads_share_one_allocator_without_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(dir.path().join("seq.db")));
        let config = SequenceConfig::default().with_step(5).unwrap();
        store.ensure_table(config.table_name()).unwrap();
        let allocator = SequenceAllocator::new(store, config).unwrap();

        let batches = issue_values(&allocator, "ORDER", 107, 3).unwrap();
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|batch| batch.len() == 107));
        assert!(find_duplicates(&batches).is_empty());

        let mut all: Vec<i64> = batches.into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, (1..=321).collect::<Vec<_>>());
    }

    #[test]
    fn store_failure_is_reported() {
        // No table: every attempt fails.
        let store = Arc::new(MemoryStore::new());
        let config = SequenceConfig::default().with_retry_times(2).unwrap();
        let allocator = SequenceAllocator::new(store, config).unwrap();

        let err = issue_values(&allocator, "ORDER", 1, 2).unwrap_err();
        assert!(err.to_string().contains("ORDER"));
    }

    #[test]
    fn duplicates_are_reported_once_each() {
        let batches = vec![vec![1, 2, 3], vec![3, 4, 2], vec![3]];
        assert_eq!(find_duplicates(&batches), vec![2, 3]);
        assert!(find_duplicates(&[vec![1, 2], vec![3]]).is_empty());
    }
}

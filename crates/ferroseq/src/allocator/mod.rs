mod segment;

use std::collections::HashMap;
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::instrument;
use tracing::{debug, error, info, warn};

use crate::{
    Error, Result, Sequence, SequenceConfig, ValueRange,
    mutex::{Mutex, MutexGuard},
    store::{SequenceStore, StoreConnection, StoreResult},
    validate_sequence_name,
};
use segment::{SegmentKind, SegmentPlan, plan_segment};

type Ranges = HashMap<String, ValueRange>;

/// A segment-caching sequence allocator over a shared [`SequenceStore`].
///
/// For each sequence name the allocator keeps at most one [`ValueRange`] in
/// memory. Values are served from that range until it runs dry; then a new
/// segment of `step` values is reserved from the store with an optimistic
/// read-then-compare-and-swap round-trip and cached in its place.
///
/// Many allocators (in one process or many) can share a store. Each
/// round-trip reads the row, computes the next segment, and writes it back
/// only if the row still holds the value that was read. A writer that loses
/// the race simply re-reads and tries again, within the same retry budget as
/// a failed connection.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Values unique across every allocator sharing a store
/// - ✅ Wraps back to `min_value` once `max_value` is spent
/// - ❌ Gap-free: a cached remainder is lost when the process exits
///
/// ## Locking
/// A single mutex covers the cache lookup *and* any store round-trip it
/// triggers, for every name. A slow store therefore stalls `next` for all
/// sequences until the round-trip completes or the retry budget runs out.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use ferroseq::{MemoryStore, Sequence, SequenceAllocator, SequenceConfig, SequenceStore};
///
/// let store = Arc::new(MemoryStore::new());
/// let config = SequenceConfig::default().with_step(5)?;
/// store.ensure_table(config.table_name())?;
///
/// let allocator = SequenceAllocator::new(store, config)?;
/// assert_eq!(allocator.init()?, 1);
/// assert_eq!(allocator.next_for("ORDER")?, 1);
/// assert_eq!(allocator.next_for("ORDER")?, 2);
/// assert_eq!(allocator.next()?, 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct SequenceAllocator<S: SequenceStore> {
    store: Arc<S>,
    config: SequenceConfig,
    ranges: Mutex<Ranges>,
}

impl<S: SequenceStore> SequenceAllocator<S> {
    /// Creates an allocator with an empty segment cache.
    ///
    /// # Errors
    /// - [`Error::InvalidArgument`] if `config` fails
    ///   [`SequenceConfig::validate`].
    pub fn new(store: Arc<S>, config: SequenceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            ranges: Mutex::new(HashMap::new()),
        })
    }

    /// Validates the configuration and performs one real allocation on
    /// [`DEFAULT_SEQUENCE_NAME`] to prove the store is reachable.
    ///
    /// Returns the value that was issued by the probe.
    ///
    /// # Errors
    /// - [`Error::InvalidArgument`] if the configuration is invalid.
    /// - [`Error::AllocationExhausted`] if the store cannot be reached.
    ///
    /// [`DEFAULT_SEQUENCE_NAME`]: crate::DEFAULT_SEQUENCE_NAME
    pub fn init(&self) -> Result<i64> {
        self.config.validate()?;
        let value = self.next()?;
        info!(
            table = self.config.table_name(),
            step = self.config.step(),
            min_value = self.config.min_value(),
            max_value = self.config.max_value(),
            value,
            "sequence allocator ready"
        );
        Ok(value)
    }

    /// The allocator's configuration.
    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Names that currently hold a non-exhausted cached range, sorted.
    ///
    /// # Errors
    /// - [`Error::LockPoisoned`] if the cache lock is poisoned (std mutex
    ///   only).
    pub fn cached_names(&self) -> Result<Vec<String>> {
        let ranges = self.lock_ranges()?;
        let mut names: Vec<String> = ranges
            .iter()
            .filter(|(_, range)| !range.is_exhausted())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort_unstable();
        Ok(names)
    }

    /// Drops the cached range of `name`, returning it.
    ///
    /// The unissued remainder of the range is never handed out; the next call
    /// for `name` reserves a fresh segment.
    ///
    /// # Errors
    /// - [`Error::LockPoisoned`] if the cache lock is poisoned (std mutex
    ///   only).
    pub fn evict(&self, name: &str) -> Result<Option<ValueRange>> {
        let mut ranges = self.lock_ranges()?;
        Ok(ranges.remove(name))
    }

    fn lock_ranges(&self) -> Result<MutexGuard<'_, Ranges>> {
        #[cfg(feature = "parking-lot")]
        {
            Ok(self.ranges.lock())
        }
        #[cfg(not(feature = "parking-lot"))]
        {
            Ok(self.ranges.lock()?)
        }
    }

    /// Reserves a fresh segment for `name`, retrying up to `retry_times`.
    ///
    /// Store failures, lost races, and segments that do not form a valid
    /// range all consume one attempt.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    fn fetch_range(&self, name: &str) -> Result<ValueRange> {
        let retry_times = self.config.retry_times();

        for attempt in 1..=retry_times {
            match self.try_reserve(name) {
                Ok(Some(plan)) => match self.accept_segment(name, plan) {
                    Ok(range) => return Ok(range),
                    // The row has moved on, so the next attempt reads a fresh value.
                    Err(err) => {
                        warn!(
                            name,
                            attempt,
                            retry_times,
                            error = %err,
                            "reserved segment is unusable"
                        );
                    }
                },
                Ok(None) => {
                    debug!(name, attempt, retry_times, "lost segment race, retrying");
                }
                Err(source) => {
                    let err = Error::TransientStoreFailure { attempt, source };
                    warn!(name, attempt, retry_times, error = %err, "segment fetch failed");
                }
            }
        }

        error!(name, attempts = retry_times, "segment fetch retry budget exhausted");
        Err(Error::AllocationExhausted {
            name: name.to_owned(),
            attempts: retry_times,
        })
    }

    /// One store round-trip on its own connection.
    ///
    /// Returns `Ok(None)` when the write affected no row, meaning another
    /// writer got there first.
    fn try_reserve(&self, name: &str) -> StoreResult<Option<SegmentPlan>> {
        let table = self.config.table_name();
        let mut conn = self.store.connect()?;

        let current = conn.select_value(table, name)?;
        let plan = plan_segment(current, &self.config);
        let affected = match plan.current {
            None => conn.insert_value(table, name, plan.finish)?,
            Some(expected) => conn.compare_and_swap(table, name, expected, plan.finish)?,
        };

        Ok((affected > 0).then_some(plan))
    }

    fn accept_segment(&self, name: &str, plan: SegmentPlan) -> Result<ValueRange> {
        let SegmentPlan {
            kind,
            current,
            start,
            finish,
        } = plan;
        match kind {
            SegmentKind::Create => info!(name, start, finish, "created sequence"),
            SegmentKind::Advance => debug!(name, ?current, start, finish, "reserved segment"),
            SegmentKind::Partial => {
                info!(name, ?current, start, finish, "reserved final segment before wrap");
            }
            SegmentKind::Wrap => warn!(
                name,
                ?current,
                start,
                finish,
                max_value = self.config.max_value(),
                "sequence wrapped to min value"
            ),
        }
        ValueRange::from(start, finish)
    }
}

impl<S: SequenceStore> Sequence for SequenceAllocator<S> {
    fn next_for(&self, name: &str) -> Result<i64> {
        validate_sequence_name(name)?;

        let mut ranges = self.lock_ranges()?;
        if let Some(range) = ranges.get(name) {
            if let Some(value) = range.next_value() {
                return Ok(value);
            }
            ranges.remove(name);
        }

        let range = self.fetch_range(name)?;
        let value = range.next_value().ok_or(Error::InvalidRange {
            start: range.start(),
            finish: range.finish(),
        })?;
        ranges.insert(name.to_owned(), range);
        Ok(value)
    }
}

impl<S: SequenceStore> core::fmt::Debug for SequenceAllocator<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SequenceAllocator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

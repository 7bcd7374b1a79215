use core::fmt;

use portable_atomic::{AtomicI64, Ordering};

use crate::{Error, Result};

/// A thread-safe cursor over the closed interval `[start, finish]` of reserved
/// sequence space.
///
/// A range is created right after a successful store round-trip and handed out
/// value by value without touching the store again. The bounds never change;
/// only the internal cursor moves, and it moves through a lock-free
/// compare-and-swap so callers may share a range without external locking.
///
/// ## Guarantees
/// - ✅ Every value returned lies in `[start, finish]`
/// - ✅ Each value is returned at most once per range
/// - ✅ Values are returned in strictly increasing order
/// - ✅ Once exhausted, [`Self::next_value`] keeps returning `None`
///
/// # Example
/// ```
/// use ferroseq::ValueRange;
///
/// let range = ValueRange::from(10, 12).unwrap();
/// assert_eq!(range.next_value(), Some(10));
/// assert_eq!(range.next_value(), Some(11));
/// assert_eq!(range.next_value(), Some(12));
/// assert_eq!(range.next_value(), None);
/// assert_eq!(range.next_value(), None);
/// ```
pub struct ValueRange {
    start: i64,
    finish: i64,
    #[cfg(feature = "cache-padded")]
    cursor: crossbeam_utils::CachePadded<AtomicI64>,
    #[cfg(not(feature = "cache-padded"))]
    cursor: AtomicI64,
}

impl ValueRange {
    /// Builds a range over `[start, finish]` with its cursor parked just below
    /// `start`.
    ///
    /// # Errors
    /// - [`Error::InvalidRange`] if `start <= 0` or `start > finish`.
    pub fn from(start: i64, finish: i64) -> Result<Self> {
        if start <= 0 || start > finish {
            return Err(Error::InvalidRange { start, finish });
        }

        let cursor = AtomicI64::new(start - 1);
        Ok(Self {
            start,
            finish,
            #[cfg(feature = "cache-padded")]
            cursor: crossbeam_utils::CachePadded::new(cursor),
            #[cfg(not(feature = "cache-padded"))]
            cursor,
        })
    }

    /// Returns the next unissued value, or `None` once the range is exhausted.
    ///
    /// The cursor never advances past `finish`, so calling this after
    /// exhaustion is idempotent.
    pub fn next_value(&self) -> Option<i64> {
        let finish = self.finish;
        self.cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < finish).then(|| current + 1)
            })
            .ok()
            .map(|previous| previous + 1)
    }

    /// Inclusive lower bound.
    pub const fn start(&self) -> i64 {
        self.start
    }

    /// Inclusive upper bound.
    pub const fn finish(&self) -> i64 {
        self.finish
    }

    /// Number of values that have not been issued yet.
    pub fn remaining(&self) -> u64 {
        (self.finish - self.cursor.load(Ordering::Acquire)).unsigned_abs()
    }

    /// Whether every value in the range has been issued.
    pub fn is_exhausted(&self) -> bool {
        self.cursor.load(Ordering::Acquire) >= self.finish
    }
}

impl fmt::Debug for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueRange")
            .field("start", &self.start)
            .field("finish", &self.finish)
            .field("cursor", &self.cursor.load(Ordering::Relaxed))
            .finish()
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.finish)
    }
}

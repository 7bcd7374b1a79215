use crate::store::StoreError;

/// A result type defaulting to the crate-wide [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `ferroseq` can emit.
///
/// Argument and configuration errors surface synchronously to the caller that
/// triggered them and are never retried. Store failures are absorbed by the
/// allocator's retry loop; a caller only observes them once the retry budget
/// is spent, as [`Error::AllocationExhausted`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A sequence name or a configuration value was rejected.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Why the value was rejected.
        reason: String,
    },

    /// A [`ValueRange`] was requested with `start <= 0` or `start > finish`.
    ///
    /// Returned by [`ValueRange::from`]. Inside the allocator a segment that
    /// fails this check (e.g. a row holding a negative value) costs one
    /// attempt and is retried from a fresh read.
    ///
    /// [`ValueRange`]: crate::ValueRange
    /// [`ValueRange::from`]: crate::ValueRange::from
    #[error("invalid value range [{start}, {finish}]")]
    InvalidRange {
        /// Requested inclusive lower bound.
        start: i64,
        /// Requested inclusive upper bound.
        finish: i64,
    },

    /// A single store round-trip failed.
    ///
    /// Logged by the allocator for every failed attempt. Callers of
    /// [`Sequence::next_for`](crate::Sequence::next_for) only see
    /// [`Error::AllocationExhausted`] once the whole budget is spent.
    #[error("store attempt {attempt} failed: {source}")]
    TransientStoreFailure {
        /// 1-based attempt number.
        attempt: u32,
        /// The underlying store error.
        #[source]
        source: StoreError,
    },

    /// Every attempt in the retry budget failed to reserve a segment.
    #[error("no segment could be allocated for sequence '{name}' after {attempts} attempts")]
    AllocationExhausted {
        /// The sequence name.
        name: String,
        /// Number of attempts made.
        attempts: u32,
    },

    /// The segment cache lock was **poisoned**.
    ///
    /// This occurs when a thread panics while holding the lock. When the
    /// `parking-lot` feature is enabled, mutexes do **not** poison, so this
    /// variant is not available.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("segment cache lock poisoned")]
    LockPoisoned,
}

impl Error {
    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

#[cfg(not(feature = "parking-lot"))]
use crate::mutex::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}

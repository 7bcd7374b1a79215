use crate::{Error, Result};

/// Name used by [`Sequence::next`] when the caller does not pick one.
pub const DEFAULT_SEQUENCE_NAME: &str = "DEFAULT";

/// Maximum length of a sequence name, in characters.
pub const MAX_SEQUENCE_NAME_LENGTH: usize = 64;

/// A source of unique, monotonically non-decreasing `i64` values per named
/// sequence.
///
/// Names are caller-chosen (`"USER"`, `"ORDER"`, ...) and must be 1 to
/// [`MAX_SEQUENCE_NAME_LENGTH`] characters long.
pub trait Sequence {
    /// Returns the next value of the sequence called `name`.
    ///
    /// # Errors
    /// - [`Error::InvalidArgument`] if `name` is empty or too long.
    /// - [`Error::AllocationExhausted`] if no segment could be reserved.
    fn next_for(&self, name: &str) -> Result<i64>;

    /// Returns the next value of [`DEFAULT_SEQUENCE_NAME`].
    ///
    /// # Errors
    /// See [`Self::next_for`].
    fn next(&self) -> Result<i64> {
        self.next_for(DEFAULT_SEQUENCE_NAME)
    }
}

/// Checks that `name` is a usable sequence name.
///
/// # Errors
/// - [`Error::InvalidArgument`] if `name` is empty or longer than
///   [`MAX_SEQUENCE_NAME_LENGTH`] characters.
pub fn validate_sequence_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_argument("sequence name must not be empty"));
    }
    let len = name.chars().count();
    if len > MAX_SEQUENCE_NAME_LENGTH {
        return Err(Error::invalid_argument(format!(
            "sequence name is {len} characters long (max = {MAX_SEQUENCE_NAME_LENGTH})"
        )));
    }
    Ok(())
}

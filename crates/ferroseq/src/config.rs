use crate::{Error, Result};

/// Default number of store attempts per segment fetch.
pub const DEFAULT_RETRY_TIMES: u32 = 10;
/// Default table holding one row per sequence.
pub const DEFAULT_TABLE_NAME: &str = "sequence";
/// Default segment size.
pub const DEFAULT_STEP: i64 = 1000;
/// Default lowest issued value.
pub const DEFAULT_MIN_VALUE: i64 = 1;
/// Default highest issued value before the sequence wraps.
pub const DEFAULT_MAX_VALUE: i64 = 99_999_999;

const MAX_TABLE_NAME_LENGTH: usize = 64;

/// Process-wide allocator settings.
///
/// Every `with_*` setter validates its argument immediately and returns
/// [`Error::InvalidArgument`] on a bad value, so misconfiguration fails at
/// startup rather than on the first allocation. Cross-field invariants are
/// checked by [`Self::validate`], which the allocator runs on construction
/// and again in [`SequenceAllocator::init`].
///
/// # Example
/// ```
/// use ferroseq::SequenceConfig;
///
/// let config = SequenceConfig::default()
///     .with_step(5)?
///     .with_max_value(10_000)?;
/// config.validate()?;
/// assert_eq!(config.first_segment_end(), 5);
/// # Ok::<(), ferroseq::Error>(())
/// ```
///
/// [`SequenceAllocator::init`]: crate::SequenceAllocator::init
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceConfig {
    retry_times: u32,
    table_name: String,
    step: i64,
    min_value: i64,
    max_value: i64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            retry_times: DEFAULT_RETRY_TIMES,
            table_name: DEFAULT_TABLE_NAME.to_owned(),
            step: DEFAULT_STEP,
            min_value: DEFAULT_MIN_VALUE,
            max_value: DEFAULT_MAX_VALUE,
        }
    }
}

impl SequenceConfig {
    /// Sets how many store attempts a single segment fetch may make.
    ///
    /// # Errors
    /// - [`Error::InvalidArgument`] if `retry_times` is zero.
    pub fn with_retry_times(mut self, retry_times: u32) -> Result<Self> {
        if retry_times == 0 {
            return Err(Error::invalid_argument("retry times must be greater than 0"));
        }
        self.retry_times = retry_times;
        Ok(self)
    }

    /// Sets the table (or tree, for key-value stores) holding sequence rows.
    ///
    /// The name is interpolated into SQL statements, so it must be a plain
    /// identifier: an ASCII letter or underscore followed by ASCII letters,
    /// digits or underscores.
    ///
    /// # Errors
    /// - [`Error::InvalidArgument`] if the name is empty, too long, or not an
    ///   identifier.
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Result<Self> {
        let table_name = table_name.into();
        validate_table_name(&table_name)?;
        self.table_name = table_name;
        Ok(self)
    }

    /// Sets the segment size reserved per store round-trip.
    ///
    /// # Errors
    /// - [`Error::InvalidArgument`] if `step <= 0`.
    pub fn with_step(mut self, step: i64) -> Result<Self> {
        if step <= 0 {
            return Err(Error::invalid_argument(format!(
                "step must be greater than 0 (got {step})"
            )));
        }
        self.step = step;
        Ok(self)
    }

    /// Sets the lowest value a sequence issues, and the value it wraps to.
    ///
    /// # Errors
    /// - [`Error::InvalidArgument`] if `min_value <= 0`.
    pub fn with_min_value(mut self, min_value: i64) -> Result<Self> {
        if min_value <= 0 {
            return Err(Error::invalid_argument(format!(
                "min value must be greater than 0 (got {min_value})"
            )));
        }
        self.min_value = min_value;
        Ok(self)
    }

    /// Sets the highest value a sequence issues before wrapping.
    ///
    /// # Errors
    /// - [`Error::InvalidArgument`] if `max_value <= 0`.
    pub fn with_max_value(mut self, max_value: i64) -> Result<Self> {
        if max_value <= 0 {
            return Err(Error::invalid_argument(format!(
                "max value must be greater than 0 (got {max_value})"
            )));
        }
        self.max_value = max_value;
        Ok(self)
    }

    /// Checks the invariants spanning several fields.
    ///
    /// # Errors
    /// - [`Error::InvalidArgument`] if `min_value >= max_value`, or if the
    ///   first segment `[min_value, min_value + step - 1]` does not fit below
    ///   `max_value`. A segment that overshoots the maximum would be re-issued
    ///   on every wrap.
    pub fn validate(&self) -> Result<()> {
        if self.min_value >= self.max_value {
            return Err(Error::invalid_argument(format!(
                "min value ({}) must be less than max value ({})",
                self.min_value, self.max_value
            )));
        }
        match self.min_value.checked_add(self.step - 1) {
            Some(end) if end <= self.max_value => Ok(()),
            _ => Err(Error::invalid_argument(format!(
                "step ({}) does not fit between min value ({}) and max value ({})",
                self.step, self.min_value, self.max_value
            ))),
        }
    }

    /// Store attempts per segment fetch.
    pub const fn retry_times(&self) -> u32 {
        self.retry_times
    }

    /// Table holding sequence rows.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Segment size.
    pub const fn step(&self) -> i64 {
        self.step
    }

    /// Lowest issued value.
    pub const fn min_value(&self) -> i64 {
        self.min_value
    }

    /// Highest issued value.
    pub const fn max_value(&self) -> i64 {
        self.max_value
    }

    /// Upper bound of the first segment of a sequence, `min_value + step - 1`.
    ///
    /// This is the value stored when a row is created and the value a row is
    /// reset to when the sequence wraps.
    pub const fn first_segment_end(&self) -> i64 {
        self.min_value.saturating_add(self.step - 1)
    }
}

fn validate_table_name(table_name: &str) -> Result<()> {
    let mut chars = table_name.chars();
    let Some(first) = chars.next() else {
        return Err(Error::invalid_argument("table name must not be empty"));
    };
    if table_name.len() > MAX_TABLE_NAME_LENGTH {
        return Err(Error::invalid_argument(format!(
            "table name is longer than {MAX_TABLE_NAME_LENGTH} characters"
        )));
    }
    let valid = (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(Error::invalid_argument(format!(
            "table name '{table_name}' is not a valid identifier"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid<T: core::fmt::Debug>(result: Result<T>) {
        assert!(
            matches!(result, Err(Error::InvalidArgument { .. })),
            "expected InvalidArgument, got {result:?}"
        );
    }

    #[test]
    fn defaults_are_valid() {
        let config = SequenceConfig::default();
        config.validate().unwrap();
        assert_eq!(config.retry_times(), 10);
        assert_eq!(config.table_name(), "sequence");
        assert_eq!(config.step(), 1000);
        assert_eq!(config.min_value(), 1);
        assert_eq!(config.max_value(), 99_999_999);
        assert_eq!(config.first_segment_end(), 1000);
    }

    #[test]
    fn setters_reject_non_positive_values() {
        assert_invalid(SequenceConfig::default().with_retry_times(0));
        assert_invalid(SequenceConfig::default().with_step(0));
        assert_invalid(SequenceConfig::default().with_step(-1));
        assert_invalid(SequenceConfig::default().with_min_value(0));
        assert_invalid(SequenceConfig::default().with_max_value(-10));
    }

    #[test]
    fn setters_reject_bad_table_names() {
        assert_invalid(SequenceConfig::default().with_table_name(""));
        assert_invalid(SequenceConfig::default().with_table_name("1seq"));
        assert_invalid(SequenceConfig::default().with_table_name("seq; DROP TABLE x"));
        assert_invalid(SequenceConfig::default().with_table_name("t".repeat(65)));

        let config = SequenceConfig::default()
            .with_table_name("nt_sequence_2")
            .unwrap();
        assert_eq!(config.table_name(), "nt_sequence_2");
    }

    #[test]
    fn validate_requires_min_below_max() {
        let config = SequenceConfig::default()
            .with_min_value(10)
            .unwrap()
            .with_max_value(10)
            .unwrap()
            .with_step(1)
            .unwrap();
        assert_invalid(config.validate());
    }

    #[test]
    fn validate_requires_first_segment_to_fit() {
        let config = SequenceConfig::default()
            .with_max_value(10)
            .unwrap()
            .with_step(11)
            .unwrap();
        assert_invalid(config.validate());

        let config = config.with_step(10).unwrap();
        config.validate().unwrap();
        assert_eq!(config.first_segment_end(), 10);
    }

    #[test]
    fn validate_handles_huge_steps() {
        let config = SequenceConfig::default()
            .with_min_value(i64::MAX - 1)
            .unwrap()
            .with_max_value(i64::MAX)
            .unwrap()
            .with_step(i64::MAX)
            .unwrap();
        assert_invalid(config.validate());
    }
}

use std::{path::PathBuf, time::Duration};

use anyhow::bail;
use clap::Parser;
use ferroseq::{
    DEFAULT_MAX_VALUE, DEFAULT_MIN_VALUE, DEFAULT_RETRY_TIMES,
    DEFAULT_SEQUENCE_NAME, DEFAULT_STEP, DEFAULT_TABLE_NAME, SequenceConfig,
    validate_sequence_name,
};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Command-line options for the `ferroseq` binary.
///
/// Every option can also be supplied through the environment (or a `.env`
/// file in the working directory). Processes pointed at the same database and
/// table share their sequences.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ferroseq",
    version,
    about = "Issue values from named sequences stored in a shared SQLite database"
)]
pub struct CliArgs {
    /// Path of the SQLite database file. Created if missing.
    ///
    /// Environment variable: `FERROSEQ_DATABASE`
    #[arg(long, env = "FERROSEQ_DATABASE", default_value = "ferroseq.db")]
    pub database: PathBuf,

    /// Table holding one row per sequence. Created if missing.
    ///
    /// Environment variable: `FERROSEQ_TABLE`
    #[arg(long, env = "FERROSEQ_TABLE", default_value_t = String::from(DEFAULT_TABLE_NAME))]
    pub table: String,

    /// Sequence to draw values from.
    ///
    /// Environment variable: `FERROSEQ_NAME`
    #[arg(long, env = "FERROSEQ_NAME", default_value_t = String::from(DEFAULT_SEQUENCE_NAME))]
    pub name: String,

    /// Number of values to issue per thread.
    ///
    /// Environment variable: `FERROSEQ_COUNT`
    #[arg(short, long, env = "FERROSEQ_COUNT", default_value_t = 1)]
    pub count: usize,

    /// Number of threads sharing one allocator.
    ///
    /// With more than one thread the issued values are checked for
    /// duplicates before the process exits.
    ///
    /// Environment variable: `FERROSEQ_THREADS`
    #[arg(short, long, env = "FERROSEQ_THREADS", default_value_t = 1)]
    pub threads: usize,

    /// Values reserved from the database per round-trip.
    ///
    /// Environment variable: `FERROSEQ_STEP`
    #[arg(long, env = "FERROSEQ_STEP", default_value_t = DEFAULT_STEP)]
    pub step: i64,

    /// First value of every sequence, and the value it wraps back to.
    ///
    /// Environment variable: `FERROSEQ_MIN_VALUE`
    #[arg(long, env = "FERROSEQ_MIN_VALUE", default_value_t = DEFAULT_MIN_VALUE)]
    pub min_value: i64,

    /// Largest value a sequence issues before wrapping.
    ///
    /// Environment variable: `FERROSEQ_MAX_VALUE`
    #[arg(long, env = "FERROSEQ_MAX_VALUE", default_value_t = DEFAULT_MAX_VALUE)]
    pub max_value: i64,

    /// Store round-trips attempted per segment before giving up.
    ///
    /// Environment variable: `FERROSEQ_RETRY_TIMES`
    #[arg(long, env = "FERROSEQ_RETRY_TIMES", default_value_t = DEFAULT_RETRY_TIMES)]
    pub retry_times: u32,

    /// How long a connection waits on a locked database, in milliseconds.
    ///
    /// Environment variable: `FERROSEQ_BUSY_TIMEOUT_MS`
    #[arg(long, env = "FERROSEQ_BUSY_TIMEOUT_MS", default_value_t = DEFAULT_BUSY_TIMEOUT_MS)]
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub database: PathBuf,
    pub name: String,
    pub count: usize,
    pub threads: usize,
    pub busy_timeout: Duration,
    pub sequence: SequenceConfig,
}

impl CliConfig {
    /// Values issued across all threads, saturating at `usize::MAX`.
    pub fn total_values(&self) -> usize {
        self.threads.saturating_mul(self.count)
    }
}

impl TryFrom<CliArgs> for CliConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.threads == 0 {
            bail!("FERROSEQ_THREADS must be greater than 0");
        }

        if args.count == 0 {
            bail!("FERROSEQ_COUNT must be greater than 0");
        }

        validate_sequence_name(&args.name)?;

        let sequence = SequenceConfig::default()
            .with_retry_times(args.retry_times)?
            .with_table_name(args.table)?
            .with_step(args.step)?
            .with_min_value(args.min_value)?
            .with_max_value(args.max_value)?;
        sequence.validate()?;

        Ok(Self {
            database: args.database,
            name: args.name,
            count: args.count,
            threads: args.threads,
            busy_timeout: Duration::from_millis(args.busy_timeout_ms),
            sequence,
        })
    }
}

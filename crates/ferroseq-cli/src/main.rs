#![doc = include_str!("../README.md")]

mod cli;

use std::{
    io::{BufWriter, Write},
    sync::Arc,
};

use anyhow::bail;
use clap::Parser;
use cli::config::{CliArgs, CliConfig};
use cli::issue::{find_duplicates, issue_values};
use cli::telemetry::init_telemetry;
use ferroseq::{SequenceAllocator, SequenceStore, SqliteStore};

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = CliConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let store = Arc::new(SqliteStore::new(&config.database).with_busy_timeout(config.busy_timeout));
    store.ensure_table(config.sequence.table_name())?;

    let allocator = SequenceAllocator::new(store, config.sequence.clone())?;
    allocator.init()?;

    let batches = issue_values(&allocator, &config.name, config.count, config.threads)?;

    let mut out = BufWriter::new(std::io::stdout().lock());
    for value in batches.iter().flatten() {
        writeln!(out, "{value}")?;
    }
    out.flush()?;

    if config.threads > 1 {
        let duplicates = find_duplicates(&batches);
        if !duplicates.is_empty() {
            tracing::error!(count = duplicates.len(), ?duplicates, "duplicate values issued");
            bail!("{} duplicate values issued", duplicates.len());
        }
        tracing::info!(
            threads = config.threads,
            total = config.total_values(),
            "all issued values are distinct"
        );
    }

    Ok(())
}

fn log_startup_info(config: &CliConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Issuing sequence values with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Issuing {} values from '{}' on {} threads via {}",
            config.total_values(),
            config.name,
            config.threads,
            config.database.display()
        );
    }
}

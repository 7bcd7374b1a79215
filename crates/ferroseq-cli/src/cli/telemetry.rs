//! Console logging for the `ferroseq` binary.
//!
//! Events go to stderr so that stdout carries nothing but issued values. The
//! level is read from `RUST_LOG` and defaults to `info`; use
//! `RUST_LOG=ferroseq=debug` to see every segment reservation and lost race.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_ids(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .compact(),
        )
        .try_init()?;
    Ok(())
}

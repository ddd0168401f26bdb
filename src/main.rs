//! registerscan - anomaly signals from Dutch open government registries
//!
//! Batch pipelines that cross-reference public register extracts and
//! flag statistical anomalies for further review.

use anyhow::Result;
use clap::Parser;
use registerscan::cli;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging: RUST_LOG wins over --log-level
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    cli::run(cli)
}

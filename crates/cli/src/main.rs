// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tandem - operator CLI for locks and sequences

mod commands;
mod connect;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{lock, seq, series};
use std::path::PathBuf;
use tandem_core::TandemConfig;

#[derive(Parser)]
#[command(
    name = "tandem",
    version,
    about = "Distributed locks and sequence counters over a Redis-compatible store"
)]
struct Cli {
    /// Configuration file (defaults apply when it does not exist)
    #[arg(long, global = true, default_value = "tandem.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire a named lock, optionally hold it, then release it
    Lock(lock::LockArgs),
    /// Issue or read sequence numbers
    Seq(seq::SeqArgs),
    /// Inspect configured series
    Series(series::SeriesArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = TandemConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Commands::Lock(args) => lock::handle(args, &config).await,
        Commands::Seq(args) => seq::handle(args, &config).await,
        Commands::Series(args) => series::handle(args, &config),
    }
}

/// Log to stderr so command output on stdout stays clean
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sequence commands

use crate::connect;
use anyhow::Result;
use clap::Subcommand;
use tandem_core::{SystemClock, TandemConfig};
use tandem_engine::{DailySequence, IncrSequence, SequenceError};

#[derive(clap::Args)]
pub struct SeqArgs {
    #[command(subcommand)]
    command: SeqCommand,
}

#[derive(Subcommand)]
pub enum SeqCommand {
    /// Counter that restarts at 1 every local day
    Daily {
        #[command(subcommand)]
        action: DailyAction,
    },
    /// Named, never-resetting series from the catalog
    Incr {
        #[command(subcommand)]
        action: IncrAction,
    },
}

#[derive(Subcommand)]
pub enum DailyAction {
    /// Issue the next number for today
    Next { prefix: String },
    /// Show today's last number without issuing one
    Current { prefix: String },
}

#[derive(Subcommand)]
pub enum IncrAction {
    /// Issue the next code of a series
    Next { series: String },
    /// Show the last issued code without issuing one
    Current { series: String },
}

pub async fn handle(args: SeqArgs, config: &TandemConfig) -> Result<()> {
    match args.command {
        SeqCommand::Daily { action } => {
            let sequence = DailySequence::new(connect::counter_store(config).await?, SystemClock);
            let value = match action {
                DailyAction::Next { prefix } => sequence.next(&prefix).await?,
                DailyAction::Current { prefix } => sequence.current(&prefix).await?,
            };
            println!("{value}");
        }
        SeqCommand::Incr { action } => {
            let (name, issue) = match action {
                IncrAction::Next { series } => (series, true),
                IncrAction::Current { series } => (series, false),
            };
            // Resolve the name before touching the store
            let catalog = config.catalog();
            let series = catalog
                .get(&name)
                .cloned()
                .ok_or_else(|| SequenceError::UnknownSeries(name.clone()))?;
            let sequence = IncrSequence::new(connect::counter_store(config).await?, series);
            let code = if issue {
                sequence.next().await?
            } else {
                sequence.current().await?
            };
            println!("{code}");
        }
    }
    Ok(())
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Series catalog commands

use anyhow::Result;
use clap::Subcommand;
use tandem_core::TandemConfig;

#[derive(clap::Args)]
pub struct SeriesArgs {
    #[command(subcommand)]
    command: SeriesCommand,
}

#[derive(Subcommand)]
pub enum SeriesCommand {
    /// List built-in and configured series
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn handle(args: SeriesArgs, config: &TandemConfig) -> Result<()> {
    match args.command {
        SeriesCommand::List { json } => {
            let catalog = config.catalog();
            if json {
                let series: Vec<_> = catalog.iter().collect();
                println!("{}", serde_json::to_string_pretty(&series)?);
                return Ok(());
            }

            println!("{:<28} {:<36} {:<8} WIDTH", "NAME", "KEY", "PREFIX");
            for series in catalog.iter() {
                println!(
                    "{:<28} {:<36} {:<8} {}",
                    series.name,
                    series.key,
                    series.prefix,
                    series.effective_width()
                );
            }
        }
    }
    Ok(())
}

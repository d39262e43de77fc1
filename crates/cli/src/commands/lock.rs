// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock command

use crate::connect;
use anyhow::Result;
use std::time::Duration;
use tandem_core::TandemConfig;
use tandem_engine::{MutexError, MutexManager};
use tokio_util::sync::CancellationToken;

#[derive(clap::Args)]
pub struct LockArgs {
    /// Resource name to lock
    key: String,

    /// Self-release period (e.g. "30s"); overrides `[lock] expiry`
    #[arg(long, value_parser = humantime::parse_duration)]
    expiry: Option<Duration>,

    /// Retry budget while the lock is busy; overrides `[lock] wait`
    #[arg(long, value_parser = humantime::parse_duration)]
    wait: Option<Duration>,

    /// Make a single attempt instead of retrying
    #[arg(long = "try")]
    try_once: bool,

    /// Keep the lock this long before releasing it (Ctrl-C releases early)
    #[arg(long, value_parser = humantime::parse_duration)]
    hold: Option<Duration>,
}

pub async fn handle(args: LockArgs, config: &TandemConfig) -> Result<()> {
    let mut options = config.lock.options.clone();
    if let Some(expiry) = args.expiry {
        options = options.with_expiry(expiry);
    }
    if let Some(wait) = args.wait {
        options = options.with_wait(wait);
    }

    let manager = MutexManager::system(connect::lock_nodes(config).await?)?;
    let mutex = manager.new_mutex(args.key.clone(), options);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let acquired = if args.try_once {
        mutex.try_lock(&cancel).await
    } else {
        mutex.lock(&cancel).await
    };
    match acquired {
        Ok(()) => println!("locked {}", args.key),
        Err(e @ MutexError::Conflict { .. }) => {
            println!("busy {}", args.key);
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    }

    if let Some(hold) = args.hold {
        tokio::select! {
            _ = cancel.cancelled() => tracing::info!(key = %args.key, "interrupted, releasing"),
            _ = tokio::time::sleep(hold) => {}
        }
    }

    let released = mutex.unlock().await?;
    if released {
        println!("released {}", args.key);
    } else {
        println!("expired {}", args.key);
    }
    Ok(())
}

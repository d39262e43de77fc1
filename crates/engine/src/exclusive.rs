// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out batches that run in one process at a time
//!
//! The batch takes a named mutex with a single attempt. When another process
//! already holds it the run is skipped rather than queued behind it.

use crate::error::ExclusiveError;
use crate::fanout::{FanOutExecutor, TargetOperation};
use crate::mutex::Mutex;
use std::fmt;
use std::sync::Arc;
use tandem_adapters::LockStore;
use tandem_core::{BatchReport, Clock, SystemClock, TokenGen, UuidTokenGen};
use tokio_util::sync::CancellationToken;

/// What happened to an exclusive batch
#[derive(Debug)]
pub enum BatchRun<T> {
    Completed(BatchReport<T>),
    /// Another holder was running the batch
    Skipped,
}

impl<T> BatchRun<T> {
    pub fn is_skipped(&self) -> bool {
        matches!(self, BatchRun::Skipped)
    }
}

pub struct ExclusiveBatch<S, C = SystemClock, G = UuidTokenGen> {
    mutex: Mutex<S, C, G>,
    executor: FanOutExecutor,
}

impl<S: LockStore, C: Clock, G: TokenGen> ExclusiveBatch<S, C, G> {
    pub fn new(mutex: Mutex<S, C, G>, executor: FanOutExecutor) -> Self {
        Self { mutex, executor }
    }

    pub fn key(&self) -> &str {
        self.mutex.key()
    }

    /// Run the batch if nobody else is; the lock is released whatever the outcome
    pub async fn run<T, O>(
        &self,
        cancel: &CancellationToken,
        targets: Vec<T>,
        op: Arc<O>,
    ) -> Result<BatchRun<T>, ExclusiveError>
    where
        T: Clone + Send + Sync + fmt::Display + 'static,
        O: TargetOperation<T>,
    {
        match self.mutex.try_lock(cancel).await {
            Ok(()) => {}
            Err(e) if e.is_conflict() => {
                tracing::info!(key = %self.key(), "batch already running elsewhere, skipping");
                return Ok(BatchRun::Skipped);
            }
            Err(e) => return Err(e.into()),
        }

        let result = self.executor.run(cancel, targets, op).await;

        if let Err(e) = self.mutex.unlock().await {
            tracing::warn!(key = %self.key(), error = %e, "failed to release batch lock");
        }
        Ok(BatchRun::Completed(result?))
    }
}

#[cfg(test)]
#[path = "exclusive_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the coordination engine

use tandem_adapters::StoreError;
use thiserror::Error;

/// Errors from the distributed mutex
#[derive(Debug, Error)]
pub enum MutexError {
    /// Held by another holder (or by this one); callers branch on this
    #[error("lock {key} is held elsewhere")]
    Conflict { key: String },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("lock {key}: acquisition cancelled")]
    Cancelled { key: String },
    #[error("lock {key}: release did not finish within {timeout_ms}ms")]
    ReleaseTimeout { key: String, timeout_ms: u64 },
    #[error("lock {key}: release task failed: {message}")]
    ReleaseAborted { key: String, message: String },
    #[error("a lock quorum needs at least one node")]
    NoNodes,
}

impl MutexError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, MutexError::Conflict { .. })
    }
}

/// Errors from sequence generators
#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("unknown series: {0}")]
    UnknownSeries(String),
}

/// Errors from a fan-out batch
#[derive(Debug, Error)]
pub enum FanOutError {
    /// Some targets failed; the others kept their effects
    #[error("{failed} of {total} targets failed: {summary}")]
    PartialFailure {
        failed: usize,
        total: usize,
        summary: String,
    },
    #[error("job queue closed before the batch was enqueued")]
    QueueClosed,
}

/// Errors from running a batch under a mutex
#[derive(Debug, Error)]
pub enum ExclusiveError {
    #[error("mutex error: {0}")]
    Mutex(#[from] MutexError),
    #[error("fan-out error: {0}")]
    FanOut(#[from] FanOutError),
}

/// Errors from a find-or-create convergence
#[derive(Debug, Error)]
pub enum ConvergeError<E> {
    #[error("{0}")]
    Inner(E),
    /// Create hit a uniqueness violation but the lookup found nothing either
    #[error("record reported as existing but not found on lookup")]
    Vanished,
}

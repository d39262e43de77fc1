// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Counter and lock store adapters

mod redis_store;

pub use redis_store::RedisStore;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeStore, StoreCall};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store could not be reached or timed out
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The store answered with an error
    #[error("store command failed: {0}")]
    Command(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Atomic counters with optional expiry
#[async_trait]
pub trait CounterStore: Clone + Send + Sync + 'static {
    /// Atomically increment `key` and return the new value
    ///
    /// When the new value is 1 and `expire_at` is given, the key is set to
    /// expire at that unix timestamp (seconds) in the same atomic step.
    /// Later increments leave the expiry alone.
    async fn incr(&self, key: &str, expire_at: Option<i64>) -> Result<i64, StoreError>;

    /// Read a counter without changing it
    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError>;

    /// Remove a key; returns whether it existed
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
}

/// One replica of the lock quorum
#[async_trait]
pub trait LockStore: Clone + Send + Sync + 'static {
    /// Label used in logs
    fn node(&self) -> &str;

    /// Store `token` under `key` for `ttl` unless the key already exists
    ///
    /// Returns `false` when someone else holds the key.
    async fn acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Reset the ttl of `key` if it still holds `token`
    async fn extend(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Delete `key` if it still holds `token`
    async fn release(&self, key: &str, token: &str) -> Result<bool, StoreError>;
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced store wrapper for consistent observability

use crate::store::{CounterStore, LockStore, StoreError};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Wrapper that adds tracing to any store
#[derive(Clone)]
pub struct TracedStore<S> {
    inner: S,
}

impl<S> TracedStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[async_trait]
impl<S: CounterStore> CounterStore for TracedStore<S> {
    async fn incr(&self, key: &str, expire_at: Option<i64>) -> Result<i64, StoreError> {
        let span = tracing::debug_span!("store.incr", key, expire_at);
        async {
            let start = Instant::now();
            let result = self.inner.incr(key, expire_at).await;
            match &result {
                Ok(value) => tracing::debug!(value, elapsed_ms = elapsed_ms(start), "incremented"),
                Err(e) => tracing::error!(elapsed_ms = elapsed_ms(start), error = %e, "incr failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let result = self.inner.get(key).await;
        match &result {
            Ok(value) => tracing::trace!(key, value = ?value, "read"),
            Err(e) => tracing::error!(key, error = %e, "get failed"),
        }
        result
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let result = self.inner.delete(key).await;
        match &result {
            Ok(existed) => tracing::info!(key, existed, "deleted"),
            Err(e) => tracing::error!(key, error = %e, "delete failed"),
        }
        result
    }
}

#[async_trait]
impl<S: LockStore> LockStore for TracedStore<S> {
    fn node(&self) -> &str {
        self.inner.node()
    }

    async fn acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, StoreError> {
        let span = tracing::debug_span!(
            "lock.acquire",
            node = self.inner.node(),
            key,
            ttl_ms = ttl.as_millis() as u64
        );
        async {
            let start = Instant::now();
            let result = self.inner.acquire(key, token, ttl).await;
            match &result {
                Ok(true) => tracing::debug!(elapsed_ms = elapsed_ms(start), "acquired"),
                Ok(false) => tracing::debug!(elapsed_ms = elapsed_ms(start), "held elsewhere"),
                Err(e) => tracing::warn!(elapsed_ms = elapsed_ms(start), error = %e, "acquire failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn extend(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, StoreError> {
        let result = self.inner.extend(key, token, ttl).await;
        match &result {
            Ok(extended) => tracing::debug!(node = self.inner.node(), key, extended, "extend"),
            Err(e) => tracing::warn!(node = self.inner.node(), key, error = %e, "extend failed"),
        }
        result
    }

    async fn release(&self, key: &str, token: &str) -> Result<bool, StoreError> {
        let span = tracing::debug_span!("lock.release", node = self.inner.node(), key);
        async {
            let result = self.inner.release(key, token).await;
            // false is normal when the lock already expired on this node
            match &result {
                Ok(released) => tracing::debug!(released, "released"),
                Err(e) => tracing::warn!(error = %e, "release failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named distributed mutexes over a quorum of store nodes
//!
//! `Unlocked → Held → Unlocked`: a mutex becomes held on a successful
//! `lock`/`try_lock` and returns to unlocked on `unlock` or when its expiry
//! elapses. Other processes only observe the held state as contention.

use crate::error::MutexError;
use crate::quorum::{Quorum, RoundError};
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;
use tandem_adapters::LockStore;
use tandem_core::mutex::{node_timeout, RELEASE_TIMEOUT, RETRY_DELAY_MAX, RETRY_DELAY_MIN};
use tandem_core::{
    Clock, JitterSource, MutexOptions, RandJitter, SystemClock, TokenGen, UuidTokenGen,
};
use tokio_util::sync::CancellationToken;

/// Hands out [`Mutex`] handles that share one quorum, clock, jitter source
/// and token generator
pub struct MutexManager<S, C = SystemClock, T = UuidTokenGen> {
    quorum: Quorum<S>,
    clock: C,
    jitter: Arc<dyn JitterSource>,
    tokens: T,
}

impl<S: LockStore> MutexManager<S> {
    /// Production wiring: system clock, OS-seeded jitter, UUID tokens
    pub fn system(nodes: Vec<S>) -> Result<Self, MutexError> {
        Self::new(nodes, SystemClock, RandJitter::new(), UuidTokenGen)
    }
}

impl<S: LockStore, C: Clock, T: TokenGen> MutexManager<S, C, T> {
    pub fn new(
        nodes: Vec<S>,
        clock: C,
        jitter: impl JitterSource,
        tokens: T,
    ) -> Result<Self, MutexError> {
        if nodes.is_empty() {
            return Err(MutexError::NoNodes);
        }
        Ok(Self {
            quorum: Quorum::new(nodes),
            clock,
            jitter: Arc::new(jitter),
            tokens,
        })
    }

    /// Number of nodes in the quorum
    pub fn nodes(&self) -> usize {
        self.quorum.len()
    }

    /// Create a handle for `key`; no I/O happens until it is locked
    pub fn new_mutex(&self, key: impl Into<String>, options: MutexOptions) -> Mutex<S, C, T> {
        Mutex {
            key: key.into(),
            options,
            quorum: self.quorum.clone(),
            clock: self.clock.clone(),
            jitter: Arc::clone(&self.jitter),
            tokens: self.tokens.clone(),
            held: StdMutex::new(None),
        }
    }
}

struct Held {
    token: String,
    valid_until: Instant,
}

/// Handle on one named lock
pub struct Mutex<S, C = SystemClock, T = UuidTokenGen> {
    key: String,
    options: MutexOptions,
    quorum: Quorum<S>,
    clock: C,
    jitter: Arc<dyn JitterSource>,
    tokens: T,
    held: StdMutex<Option<Held>>,
}

impl<S: LockStore, C: Clock, T: TokenGen> Mutex<S, C, T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn options(&self) -> &MutexOptions {
        &self.options
    }

    /// Whether this handle believes it still holds the lock
    pub fn is_held(&self) -> bool {
        let now = self.clock.now();
        self.held_state()
            .as_ref()
            .is_some_and(|held| held.valid_until > now)
    }

    /// Acquire, retrying with jittered delays until the attempt budget runs out
    ///
    /// Cancelling `cancel` stops the retry loop between attempts.
    pub async fn lock(&self, cancel: &CancellationToken) -> Result<(), MutexError> {
        let tries = self.options.attempt_budget();
        let mut last_error = None;
        let mut contended = false;

        for attempt in 0..tries {
            if attempt > 0 {
                let delay = self.jitter.delay(RETRY_DELAY_MIN, RETRY_DELAY_MAX);
                tokio::select! {
                    _ = cancel.cancelled() => return Err(self.cancelled()),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            if cancel.is_cancelled() {
                return Err(self.cancelled());
            }

            match self.attempt().await {
                Ok(()) => {
                    tracing::info!(key = %self.key, attempts = attempt + 1, "lock acquired");
                    return Ok(());
                }
                Err(RoundError::Contended) => contended = true,
                Err(RoundError::Unavailable(e)) => {
                    tracing::warn!(key = %self.key, attempt = attempt + 1, error = %e, "lock attempt failed");
                    last_error = Some(e);
                }
            }
        }

        tracing::info!(key = %self.key, tries, "lock attempts exhausted");
        match (contended, last_error) {
            (false, Some(e)) => Err(MutexError::Store(e)),
            _ => Err(self.conflict()),
        }
    }

    /// Single acquisition attempt; fails fast with `Conflict` when busy
    pub async fn try_lock(&self, cancel: &CancellationToken) -> Result<(), MutexError> {
        if cancel.is_cancelled() {
            return Err(self.cancelled());
        }
        match self.attempt().await {
            Ok(()) => {
                tracing::info!(key = %self.key, "lock acquired");
                Ok(())
            }
            Err(RoundError::Contended) => Err(self.conflict()),
            Err(RoundError::Unavailable(e)) => Err(MutexError::Store(e)),
        }
    }

    /// Release the lock
    ///
    /// The release runs on its own task with a fixed timeout, so it completes
    /// even when the caller's own work was cancelled or its future is dropped
    /// mid-release. Returns `false` when the lock was already gone.
    pub async fn unlock(&self) -> Result<bool, MutexError> {
        let Some(held) = self.held_state().take() else {
            return Ok(false);
        };

        let quorum = self.quorum.clone();
        let key = self.key.clone();
        let per_node = node_timeout(self.options.effective_expiry());
        let release = tokio::spawn(async move {
            tokio::time::timeout(RELEASE_TIMEOUT, quorum.release(&key, &held.token, per_node)).await
        });

        match release.await {
            Ok(Ok(Ok(released))) => {
                tracing::info!(key = %self.key, released, "lock released");
                Ok(released)
            }
            Ok(Ok(Err(e))) => {
                tracing::warn!(key = %self.key, error = %e, "lock release failed");
                Err(MutexError::Store(e))
            }
            Ok(Err(_)) => Err(MutexError::ReleaseTimeout {
                key: self.key.clone(),
                timeout_ms: RELEASE_TIMEOUT.as_millis() as u64,
            }),
            Err(e) => Err(MutexError::ReleaseAborted {
                key: self.key.clone(),
                message: e.to_string(),
            }),
        }
    }

    /// Push the expiry back by a full period while still held
    pub async fn extend(&self) -> Result<bool, MutexError> {
        let Some(token) = self.held_state().as_ref().map(|h| h.token.clone()) else {
            return Ok(false);
        };
        let expiry = self.options.effective_expiry();
        let start = self.clock.now();
        let extended = self.quorum.extend(&self.key, &token, expiry).await?;
        if extended {
            if let Some(held) = self.held_state().as_mut() {
                held.valid_until = start + expiry;
            }
        }
        tracing::debug!(key = %self.key, extended, "lock extend");
        Ok(extended)
    }

    /// Run `f` while holding the lock, releasing it afterwards whatever `f` returned
    pub async fn scoped<F, Fut, R>(&self, cancel: &CancellationToken, f: F) -> Result<R, MutexError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = R>,
    {
        self.lock(cancel).await?;
        let output = f().await;
        if let Err(e) = self.unlock().await {
            tracing::warn!(key = %self.key, error = %e, "release after scoped section failed");
        }
        Ok(output)
    }

    async fn attempt(&self) -> Result<(), RoundError> {
        let token = self.tokens.next();
        let expiry = self.options.effective_expiry();
        let validity = self
            .quorum
            .acquire(&self.key, &token, expiry, &self.clock)
            .await?;
        *self.held_state() = Some(Held {
            token,
            valid_until: self.clock.now() + validity,
        });
        Ok(())
    }

    fn held_state(&self) -> std::sync::MutexGuard<'_, Option<Held>> {
        self.held.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn conflict(&self) -> MutexError {
        MutexError::Conflict {
            key: self.key.clone(),
        }
    }

    fn cancelled(&self) -> MutexError {
        MutexError::Cancelled {
            key: self.key.clone(),
        }
    }
}

#[cfg(test)]
#[path = "mutex_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{CounterStore, LockStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tandem_core::{Clock, FakeClock};

/// Recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Incr { key: String, expire_at: Option<i64> },
    Get { key: String },
    Delete { key: String },
    Acquire { key: String, token: String },
    Extend { key: String, token: String },
    Release { key: String, token: String },
}

struct Counter {
    value: i64,
    /// Unix seconds; compared against the clock's wall time
    expire_at: Option<i64>,
}

struct Held {
    token: String,
    expires: Instant,
}

#[derive(Default)]
struct FakeState {
    counters: HashMap<String, Counter>,
    locks: HashMap<String, Held>,
    calls: Vec<StoreCall>,
    unavailable: bool,
}

/// In-memory counter and lock store driven by a [`FakeClock`]
///
/// Clones share state, so one `FakeStore` stands for one server node.
#[derive(Clone)]
pub struct FakeStore {
    node: String,
    clock: FakeClock,
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeStore {
    pub fn new() -> Self {
        Self::with_clock("fake", FakeClock::new())
    }

    /// A node sharing `clock` with the test (and with other nodes)
    pub fn with_clock(node: impl Into<String>, clock: FakeClock) -> Self {
        Self {
            node: node.into(),
            clock,
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    pub fn clock(&self) -> &FakeClock {
        &self.clock
    }

    /// Make every following call fail with [`StoreError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock_state().unavailable = unavailable;
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock_state().calls.clone()
    }

    /// Current holder token of a lock key, if unexpired
    pub fn holder(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        self.lock_state()
            .locks
            .get(key)
            .filter(|h| h.expires > now)
            .map(|h| h.token.clone())
    }

    /// Expiry (unix seconds) recorded for a counter key
    pub fn expire_at(&self, key: &str) -> Option<i64> {
        self.lock_state()
            .counters
            .get(key)
            .and_then(|c| c.expire_at)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record the call, fail if unavailable, and drop expired entries
    fn enter(&self, call: StoreCall) -> Result<std::sync::MutexGuard<'_, FakeState>, StoreError> {
        let mut state = self.lock_state();
        state.calls.push(call);
        if state.unavailable {
            return Err(StoreError::Unavailable(format!("{} is down", self.node)));
        }
        let wall = self.clock.local_now().timestamp();
        let now = self.clock.now();
        state
            .counters
            .retain(|_, c| c.expire_at.map_or(true, |at| wall < at));
        state.locks.retain(|_, h| h.expires > now);
        Ok(state)
    }
}

#[async_trait]
impl CounterStore for FakeStore {
    async fn incr(&self, key: &str, expire_at: Option<i64>) -> Result<i64, StoreError> {
        let mut state = self.enter(StoreCall::Incr {
            key: key.to_string(),
            expire_at,
        })?;
        let counter = state.counters.entry(key.to_string()).or_insert(Counter {
            value: 0,
            expire_at: None,
        });
        counter.value += 1;
        if counter.value == 1 {
            if let Some(at) = expire_at {
                counter.expire_at = Some(at);
            }
        }
        Ok(counter.value)
    }

    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let state = self.enter(StoreCall::Get {
            key: key.to_string(),
        })?;
        Ok(state.counters.get(key).map(|c| c.value))
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut state = self.enter(StoreCall::Delete {
            key: key.to_string(),
        })?;
        let counter = state.counters.remove(key).is_some();
        let lock = state.locks.remove(key).is_some();
        Ok(counter || lock)
    }
}

#[async_trait]
impl LockStore for FakeStore {
    fn node(&self) -> &str {
        &self.node
    }

    async fn acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, StoreError> {
        let expires = self.clock.now() + ttl;
        let mut state = self.enter(StoreCall::Acquire {
            key: key.to_string(),
            token: token.to_string(),
        })?;
        if state.locks.contains_key(key) {
            return Ok(false);
        }
        state.locks.insert(
            key.to_string(),
            Held {
                token: token.to_string(),
                expires,
            },
        );
        Ok(true)
    }

    async fn extend(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, StoreError> {
        let expires = self.clock.now() + ttl;
        let mut state = self.enter(StoreCall::Extend {
            key: key.to_string(),
            token: token.to_string(),
        })?;
        match state.locks.get_mut(key) {
            Some(held) if held.token == token => {
                held.expires = expires;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, key: &str, token: &str) -> Result<bool, StoreError> {
        let mut state = self.enter(StoreCall::Release {
            key: key.to_string(),
            token: token.to_string(),
        })?;
        if state.locks.get(key).is_some_and(|h| h.token == token) {
            state.locks.remove(key);
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mutex options and quorum arithmetic
//!
//! Pure pieces of the distributed mutex: how long a lock lives, how many
//! acquisition attempts a caller gets, and whether a round of per-node
//! acquisitions adds up to a granted lock.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Expiry used when none (or a too-short one) is configured
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(8);

/// Attempts allowed when no usable wait budget is configured
pub const DEFAULT_TRIES: u32 = 32;

/// Expiry and wait values at or below this are treated as unset
pub const MIN_CONFIGURABLE: Duration = Duration::from_secs(1);

/// Lower bound of the delay between acquisition attempts
pub const RETRY_DELAY_MIN: Duration = Duration::from_millis(50);

/// Upper bound (exclusive) of the delay between acquisition attempts
pub const RETRY_DELAY_MAX: Duration = Duration::from_millis(250);

/// Fixed bound on a release round, independent of the caller
pub const RELEASE_TIMEOUT: Duration = Duration::from_secs(3);

/// Fraction of the expiry reserved for clock drift between nodes
pub const DRIFT_FACTOR: f64 = 0.01;

const DRIFT_FLOOR: Duration = Duration::from_millis(2);

const NODE_TIMEOUT_CAP: Duration = Duration::from_secs(1);

/// Options for a named mutex
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutexOptions {
    /// How long the lock lives before self-releasing
    #[serde(default, with = "humantime_serde")]
    pub expiry: Option<Duration>,
    /// Upper bound on time spent retrying acquisition
    #[serde(default, with = "humantime_serde")]
    pub wait: Option<Duration>,
}

impl MutexOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = Some(wait);
        self
    }

    /// Expiry actually applied to the lock
    pub fn effective_expiry(&self) -> Duration {
        match self.expiry {
            Some(expiry) if expiry > MIN_CONFIGURABLE => expiry,
            _ => DEFAULT_EXPIRY,
        }
    }

    /// Number of acquisition attempts `lock` may make
    ///
    /// A wait budget above one second is converted into attempts at the
    /// minimum retry delay; anything else falls back to [`DEFAULT_TRIES`].
    pub fn attempt_budget(&self) -> u32 {
        match self.wait {
            Some(wait) if wait > MIN_CONFIGURABLE => {
                let tries = wait.as_millis() / RETRY_DELAY_MIN.as_millis();
                u32::try_from(tries).unwrap_or(u32::MAX)
            }
            _ => DEFAULT_TRIES,
        }
    }
}

/// Minimum number of nodes that must agree for a lock to be granted
pub fn quorum(nodes: usize) -> usize {
    nodes / 2 + 1
}

/// How long a single node may take to answer during acquisition
pub fn node_timeout(expiry: Duration) -> Duration {
    (expiry / 10).min(NODE_TIMEOUT_CAP)
}

/// Time the lock is still guaranteed to be held after a round that took
/// `elapsed`, or `None` if the round ate the whole expiry
pub fn validity(expiry: Duration, elapsed: Duration) -> Option<Duration> {
    let drift = expiry.mul_f64(DRIFT_FACTOR) + DRIFT_FLOOR;
    expiry
        .checked_sub(elapsed)
        .and_then(|left| left.checked_sub(drift))
        .filter(|left| !left.is_zero())
}

/// Per-node results of one acquisition round
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QuorumTally {
    /// Nodes that accepted our token
    pub acquired: usize,
    /// Nodes where the key is held by someone else
    pub taken: usize,
    /// Nodes that could not be reached or errored
    pub failed: usize,
}

/// Decision reached from a [`QuorumTally`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuorumVerdict {
    /// Majority agreed with time to spare
    Granted { validity: Duration },
    /// Someone else holds it, or the round split without a majority
    Contended,
    /// No node answered with a definite yes or no
    Unavailable,
}

impl QuorumTally {
    pub fn record_acquired(&mut self) {
        self.acquired += 1;
    }

    pub fn record_taken(&mut self) {
        self.taken += 1;
    }

    pub fn record_failed(&mut self) {
        self.failed += 1;
    }

    pub fn total(&self) -> usize {
        self.acquired + self.taken + self.failed
    }

    /// Decide the round outcome for a quorum of `nodes`
    pub fn verdict(&self, nodes: usize, expiry: Duration, elapsed: Duration) -> QuorumVerdict {
        if self.acquired >= quorum(nodes) {
            if let Some(validity) = validity(expiry, elapsed) {
                return QuorumVerdict::Granted { validity };
            }
            return QuorumVerdict::Contended;
        }
        if self.acquired == 0 && self.taken == 0 {
            return QuorumVerdict::Unavailable;
        }
        QuorumVerdict::Contended
    }
}

#[cfg(test)]
#[path = "mutex_tests.rs"]
mod tests;

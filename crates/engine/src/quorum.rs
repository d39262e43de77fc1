// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Quorum lock rounds over independent store nodes
//!
//! A round asks every node at once and counts the answers. The lock is
//! granted only when a majority accepted our token and enough of the expiry
//! is left after the round; otherwise whatever was acquired is given back.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tandem_adapters::{LockStore, StoreError};
use tandem_core::mutex::{node_timeout, quorum};
use tandem_core::{Clock, QuorumTally, QuorumVerdict};
use tokio::task::JoinSet;

/// Why an acquisition round did not grant the lock
#[derive(Debug)]
pub(crate) enum RoundError {
    Contended,
    Unavailable(StoreError),
}

/// The set of nodes a lock must win a majority of
pub(crate) struct Quorum<S> {
    nodes: Arc<[S]>,
}

impl<S> Clone for Quorum<S> {
    fn clone(&self) -> Self {
        Self {
            nodes: Arc::clone(&self.nodes),
        }
    }
}

impl<S: LockStore> Quorum<S> {
    pub(crate) fn new(nodes: Vec<S>) -> Self {
        Self {
            nodes: nodes.into(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// One acquisition round; returns the remaining validity on success
    pub(crate) async fn acquire(
        &self,
        key: &str,
        token: &str,
        expiry: Duration,
        clock: &impl Clock,
    ) -> Result<Duration, RoundError> {
        let start = clock.now();
        let timeout = node_timeout(expiry);

        let mut round = JoinSet::new();
        for node in self.nodes.iter().cloned() {
            let key = key.to_string();
            let token = token.to_string();
            round.spawn(async move {
                bounded(&node, timeout, node.acquire(&key, &token, expiry)).await
            });
        }

        let mut tally = QuorumTally::default();
        let mut last_error = None;
        while let Some(joined) = round.join_next().await {
            match joined {
                Ok(Ok(true)) => tally.record_acquired(),
                Ok(Ok(false)) => tally.record_taken(),
                Ok(Err(e)) => {
                    tally.record_failed();
                    last_error = Some(e);
                }
                Err(e) => {
                    tally.record_failed();
                    last_error = Some(StoreError::Unavailable(e.to_string()));
                }
            }
        }

        let elapsed = clock.now().saturating_duration_since(start);
        match tally.verdict(self.len(), expiry, elapsed) {
            QuorumVerdict::Granted { validity } => Ok(validity),
            verdict => {
                tracing::debug!(
                    key,
                    acquired = tally.acquired,
                    taken = tally.taken,
                    failed = tally.failed,
                    "round lost, rolling back"
                );
                if tally.acquired > 0 {
                    if let Err(e) = self.release(key, token, timeout).await {
                        tracing::warn!(key, error = %e, "rollback of lost round failed");
                    }
                }
                match (verdict, last_error) {
                    (QuorumVerdict::Unavailable, Some(e)) => Err(RoundError::Unavailable(e)),
                    _ => Err(RoundError::Contended),
                }
            }
        }
    }

    /// Re-arm the expiry on every node still holding `token`
    pub(crate) async fn extend(
        &self,
        key: &str,
        token: &str,
        expiry: Duration,
    ) -> Result<bool, StoreError> {
        let timeout = node_timeout(expiry);
        let mut round = JoinSet::new();
        for node in self.nodes.iter().cloned() {
            let key = key.to_string();
            let token = token.to_string();
            round.spawn(async move {
                bounded(&node, timeout, node.extend(&key, &token, expiry)).await
            });
        }
        self.majority(round).await
    }

    /// Delete `key` on every node still holding `token`, giving each node
    /// at most `timeout` to answer
    ///
    /// True when a majority released it; false (without error) when the
    /// lock was already gone.
    pub(crate) async fn release(
        &self,
        key: &str,
        token: &str,
        timeout: Duration,
    ) -> Result<bool, StoreError> {
        let mut round = JoinSet::new();
        for node in self.nodes.iter().cloned() {
            let key = key.to_string();
            let token = token.to_string();
            round.spawn(async move { bounded(&node, timeout, node.release(&key, &token)).await });
        }
        self.majority(round).await
    }

    async fn majority(
        &self,
        mut round: JoinSet<Result<bool, StoreError>>,
    ) -> Result<bool, StoreError> {
        let mut agreed = 0;
        let mut first_error = None;
        while let Some(joined) = round.join_next().await {
            match joined {
                Ok(Ok(true)) => agreed += 1,
                Ok(Ok(false)) => {}
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    first_error.get_or_insert(StoreError::Unavailable(e.to_string()));
                }
            }
        }
        if agreed >= quorum(self.len()) {
            return Ok(true);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(false),
        }
    }
}

/// Await one node call, treating silence past `timeout` as unavailability
async fn bounded<S: LockStore>(
    node: &S,
    timeout: Duration,
    call: impl Future<Output = Result<bool, StoreError>>,
) -> Result<bool, StoreError> {
    match tokio::time::timeout(timeout, call).await {
        Ok(answer) => answer,
        Err(_) => Err(StoreError::Unavailable(format!(
            "{} did not answer within {}ms",
            node.node(),
            timeout.as_millis()
        ))),
    }
}

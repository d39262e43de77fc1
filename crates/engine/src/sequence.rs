// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Counters handed out by the store
//!
//! [`DailySequence`] restarts at 1 every local calendar day; [`IncrSequence`]
//! never restarts and renders its values with a prefix and zero padding.

use crate::error::SequenceError;
use tandem_adapters::CounterStore;
use tandem_core::sequence::{daily_key, next_day_start};
use tandem_core::{Clock, IncrSequenceConfig, SeriesCatalog, SystemClock};

/// Day-scoped counters, one per prefix
#[derive(Clone)]
pub struct DailySequence<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S: CounterStore, C: Clock> DailySequence<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Next value of today's counter for `prefix`, starting at 1
    ///
    /// The first increment of a day also makes the counter expire at the
    /// next local midnight.
    pub async fn next(&self, prefix: &str) -> Result<i64, SequenceError> {
        let now = self.clock.local_now();
        let key = daily_key(prefix, &now);
        let expire_at = next_day_start(&now).timestamp();
        let value = self.store.incr(&key, Some(expire_at)).await?;
        tracing::debug!(%key, value, "daily sequence issued");
        Ok(value)
    }

    /// Today's counter for `prefix` without changing it; 0 before the first `next`
    pub async fn current(&self, prefix: &str) -> Result<i64, SequenceError> {
        let key = daily_key(prefix, &self.clock.local_now());
        Ok(self.store.get(&key).await?.unwrap_or(0))
    }
}

/// A global, formatted series such as `BTX000042`
#[derive(Clone)]
pub struct IncrSequence<S> {
    store: S,
    config: IncrSequenceConfig,
}

impl<S: CounterStore> IncrSequence<S> {
    pub fn new(store: S, config: IncrSequenceConfig) -> Self {
        Self { store, config }
    }

    /// Look a series up by name
    pub fn from_catalog(
        store: S,
        catalog: &SeriesCatalog,
        name: &str,
    ) -> Result<Self, SequenceError> {
        let config = catalog
            .get(name)
            .cloned()
            .ok_or_else(|| SequenceError::UnknownSeries(name.to_string()))?;
        Ok(Self::new(store, config))
    }

    pub fn config(&self) -> &IncrSequenceConfig {
        &self.config
    }

    pub async fn next(&self) -> Result<String, SequenceError> {
        let value = self.store.incr(&self.config.key, None).await?;
        tracing::debug!(series = %self.config.name, value, "sequence issued");
        Ok(self.config.format(value))
    }

    /// The last issued number, or the zero-formatted value if none was issued
    pub async fn current(&self) -> Result<String, SequenceError> {
        let value = self.store.get(&self.config.key).await?.unwrap_or(0);
        Ok(self.config.format(value))
    }
}

#[cfg(test)]
#[path = "sequence_tests.rs"]
mod tests;

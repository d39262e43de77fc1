// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store wiring from configuration

use anyhow::{Context, Result};
use tandem_adapters::{RedisStore, TracedStore};
use tandem_core::TandemConfig;

pub type Store = TracedStore<RedisStore>;

/// Counter store at `[store] url`
pub async fn counter_store(config: &TandemConfig) -> Result<Store> {
    let store = RedisStore::connect(&config.store.url)
        .await
        .with_context(|| format!("connecting to {}", config.store.url))?;
    Ok(TracedStore::new(store))
}

/// One store per configured lock node; every node must be reachable at startup
pub async fn lock_nodes(config: &TandemConfig) -> Result<Vec<Store>> {
    let mut nodes = Vec::new();
    for url in config.lock_nodes() {
        let store = RedisStore::connect(&url)
            .await
            .with_context(|| format!("connecting to lock node {url}"))?;
        nodes.push(TracedStore::new(store));
    }
    Ok(nodes)
}

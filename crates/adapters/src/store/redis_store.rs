// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis-compatible store
//!
//! Counter increments and token-checked lock updates run as Lua scripts so
//! each one is a single atomic step on the server.

use super::{CounterStore, LockStore, StoreError};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;
use std::sync::Arc;
use std::time::Duration;

const INCR_SCRIPT: &str = r#"
local value = redis.call('INCR', KEYS[1])
if value == 1 and ARGV[1] ~= '' then
    redis.call('EXPIREAT', KEYS[1], ARGV[1])
end
return value
"#;

const EXTEND_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('PEXPIRE', KEYS[1], ARGV[2])
end
return 0
"#;

const RELEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

struct Scripts {
    incr: Script,
    extend: Script,
    release: Script,
}

/// Store backed by one Redis-compatible server
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    node: String,
    scripts: Arc<Scripts>,
}

impl RedisStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379/`)
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let node = client.get_connection_info().addr.to_string();
        let conn = client.get_connection_manager().await?;
        tracing::debug!(node = %node, "connected to store");
        Ok(Self {
            conn,
            node,
            scripts: Arc::new(Scripts {
                incr: Script::new(INCR_SCRIPT),
                extend: Script::new(EXTEND_SCRIPT),
                release: Script::new(RELEASE_SCRIPT),
            }),
        })
    }
}

fn millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
        {
            StoreError::Unavailable(e.to_string())
        } else {
            StoreError::Command(e.to_string())
        }
    }
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn incr(&self, key: &str, expire_at: Option<i64>) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        let expire_at = expire_at.map(|t| t.to_string()).unwrap_or_default();
        let value: i64 = self
            .scripts
            .incr
            .key(key)
            .arg(expire_at)
            .invoke_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<i64> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let removed: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(removed > 0)
    }
}

#[async_trait]
impl LockStore for RedisStore {
    fn node(&self) -> &str {
        &self.node
    }

    async fn acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn extend(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let extended: i64 = self
            .scripts
            .extend
            .key(key)
            .arg(token)
            .arg(millis(ttl))
            .invoke_async(&mut conn)
            .await?;
        Ok(extended == 1)
    }

    async fn release(&self, key: &str, token: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let released: i64 = self
            .scripts
            .release
            .key(key)
            .arg(token)
            .invoke_async(&mut conn)
            .await?;
        Ok(released == 1)
    }
}

#[cfg(test)]
#[path = "redis_store_tests.rs"]
mod tests;

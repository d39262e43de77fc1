// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process configuration
//!
//! Loaded from a TOML file; every section is optional and falls back to
//! defaults. `TANDEM_STORE_URL` overrides the store address.

use crate::fanout::DEFAULT_MAX_WORKERS;
use crate::mutex::MutexOptions;
use crate::sequence::{IncrSequenceConfig, SeriesCatalog};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding `[store] url`
pub const STORE_URL_ENV: &str = "TANDEM_STORE_URL";

const DEFAULT_STORE_URL: &str = "redis://127.0.0.1:6379/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Counter store connection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_STORE_URL.to_string(),
        }
    }
}

/// Lock quorum and default mutex options
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// One URL per independent replica; empty means the store alone
    pub nodes: Vec<String>,
    #[serde(flatten)]
    pub options: MutexOptions,
}

/// Fan-out executor sizing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanOutConfig {
    pub max_workers: usize,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TandemConfig {
    pub store: StoreConfig,
    pub lock: LockConfig,
    pub fanout: FanOutConfig,
    pub series: Vec<IncrSequenceConfig>,
}

impl TandemConfig {
    /// Load from `path`, or defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Self::default().finish(|name| std::env::var(name).ok());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_toml(&text)?.finish(|name| std::env::var(name).ok())
    }

    /// Parse without applying environment overrides
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply overrides from `env` and validate
    pub fn finish(mut self, env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(url) = env(STORE_URL_ENV).filter(|u| !u.is_empty()) {
            self.store.url = url;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.url.trim().is_empty() {
            return Err(ConfigError::Invalid("store.url must not be empty".into()));
        }
        if self.fanout.max_workers == 0 {
            return Err(ConfigError::Invalid(
                "fanout.max_workers must be at least 1".into(),
            ));
        }
        let mut seen = HashSet::new();
        for series in &self.series {
            if series.name.is_empty() || series.key.is_empty() {
                return Err(ConfigError::Invalid(
                    "series entries need a name and a key".into(),
                ));
            }
            if !seen.insert(series.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate series name: {}",
                    series.name
                )));
            }
        }
        Ok(())
    }

    /// Replica URLs for the lock quorum
    pub fn lock_nodes(&self) -> Vec<String> {
        if self.lock.nodes.is_empty() {
            vec![self.store.url.clone()]
        } else {
            self.lock.nodes.clone()
        }
    }

    /// Built-in series plus those configured here
    pub fn catalog(&self) -> SeriesCatalog {
        SeriesCatalog::builtin().with(self.series.iter().cloned())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

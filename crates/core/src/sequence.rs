// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sequence keys, formatting and the catalog of numbered series
//!
//! Numbers handed out by a series are never reused: deleting the entity that
//! carries a number does not give the number back.

use chrono::{DateTime, Days, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Zero-pad width used when a series is configured with width ≤ 0
pub const DEFAULT_WIDTH: usize = 6;

const DAILY_KEY_NAMESPACE: &str = "seq:daily";
const INCR_KEY_NAMESPACE: &str = "seq:incr";

/// Store key for the counter of `prefix` on the calendar day of `now`
pub fn daily_key<Tz: TimeZone>(prefix: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    format!(
        "{}:{}:{}",
        DAILY_KEY_NAMESPACE,
        prefix,
        now.format("%Y%m%d")
    )
}

/// First instant of the calendar day after `now`, in the same timezone
///
/// Midnight that falls in a DST gap resolves to the first valid instant
/// after it; an ambiguous midnight resolves to the earlier instant.
pub fn next_day_start<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let Some(tomorrow) = now.date_naive().checked_add_days(Days::new(1)) else {
        return now.clone();
    };
    let midnight = tomorrow.and_time(NaiveTime::MIN);

    // Walk forward an hour at a time past a DST gap (at most a couple of steps).
    (0..=3)
        .filter_map(|hours| {
            let candidate = midnight + chrono::Duration::hours(hours);
            tz.from_local_datetime(&candidate).earliest()
        })
        .next()
        .unwrap_or_else(|| now.clone() + chrono::Duration::days(1))
}

/// Render a counter value as `prefix` followed by the zero-padded value
pub fn format_sequence(prefix: &str, value: i64, width: usize) -> String {
    format!("{prefix}{value:0width$}")
}

/// Configuration of one unscoped, formatted series
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrSequenceConfig {
    /// Name used to look the series up
    pub name: String,
    /// Counter identity in the store
    pub key: String,
    /// Human-readable prefix prepended to every number
    #[serde(default)]
    pub prefix: String,
    /// Zero-pad width; ≤ 0 means [`DEFAULT_WIDTH`]
    #[serde(default)]
    pub width: i32,
}

impl IncrSequenceConfig {
    pub fn new(name: impl Into<String>, key: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            prefix: prefix.into(),
            width: 0,
        }
    }

    pub fn with_width(mut self, width: i32) -> Self {
        self.width = width;
        self
    }

    pub fn effective_width(&self) -> usize {
        usize::try_from(self.width)
            .ok()
            .filter(|w| *w > 0)
            .unwrap_or(DEFAULT_WIDTH)
    }

    pub fn format(&self, value: i64) -> String {
        format_sequence(&self.prefix, value, self.effective_width())
    }
}

/// Business domain numbered by a built-in series
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeriesDomain {
    TaxCode,
    DepartmentCode,
    UserCode,
    RoleCode,
}

impl SeriesDomain {
    pub const ALL: [SeriesDomain; 4] = [
        SeriesDomain::TaxCode,
        SeriesDomain::DepartmentCode,
        SeriesDomain::UserCode,
        SeriesDomain::RoleCode,
    ];

    fn slug(self) -> &'static str {
        match self {
            SeriesDomain::TaxCode => "tax-code",
            SeriesDomain::DepartmentCode => "department-code",
            SeriesDomain::UserCode => "user-code",
            SeriesDomain::RoleCode => "role-code",
        }
    }

    fn code(self) -> &'static str {
        match self {
            SeriesDomain::TaxCode => "TX",
            SeriesDomain::DepartmentCode => "DP",
            SeriesDomain::UserCode => "US",
            SeriesDomain::RoleCode => "RL",
        }
    }
}

/// Tenant tier a series is scoped to
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TenantTier {
    Brand,
    Merchant,
    Store,
}

impl TenantTier {
    pub const ALL: [TenantTier; 3] = [TenantTier::Brand, TenantTier::Merchant, TenantTier::Store];

    fn slug(self) -> &'static str {
        match self {
            TenantTier::Brand => "brand",
            TenantTier::Merchant => "merchant",
            TenantTier::Store => "store",
        }
    }

    fn code(self) -> &'static str {
        match self {
            TenantTier::Brand => "B",
            TenantTier::Merchant => "M",
            TenantTier::Store => "S",
        }
    }
}

impl fmt::Display for TenantTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Built-in config for a domain/tier pair, e.g. `tax-code.brand` → `BTX000001`
pub fn builtin_series(domain: SeriesDomain, tier: TenantTier) -> IncrSequenceConfig {
    let name = format!("{}.{}", domain.slug(), tier.slug());
    let key = format!("{}:{}:{}", INCR_KEY_NAMESPACE, domain.slug(), tier.slug());
    let prefix = format!("{}{}", tier.code(), domain.code());
    IncrSequenceConfig::new(name, key, prefix)
}

/// Named series available to a process
#[derive(Clone, Debug, Default)]
pub struct SeriesCatalog {
    series: BTreeMap<String, IncrSequenceConfig>,
}

impl SeriesCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every domain for every tenant tier
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for domain in SeriesDomain::ALL {
            for tier in TenantTier::ALL {
                catalog.insert(builtin_series(domain, tier));
            }
        }
        catalog
    }

    /// Add or replace a series by name
    pub fn insert(&mut self, config: IncrSequenceConfig) {
        self.series.insert(config.name.clone(), config);
    }

    pub fn with(mut self, configs: impl IntoIterator<Item = IncrSequenceConfig>) -> Self {
        for config in configs {
            self.insert(config);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&IncrSequenceConfig> {
        self.series.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.series.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IncrSequenceConfig> {
        self.series.values()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[cfg(test)]
#[path = "sequence_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tandem-core: pure building blocks for the tandem coordination primitives
//!
//! This crate provides:
//! - Clock, token and jitter abstractions injected into the engine
//! - Mutex options and quorum arithmetic
//! - Sequence keys, formatting and the series catalog
//! - Fan-out job, outcome and report types
//! - TOML configuration

pub mod clock;
pub mod config;
pub mod fanout;
pub mod jitter;
pub mod mutex;
pub mod sequence;
pub mod token;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, FanOutConfig, LockConfig, StoreConfig, TandemConfig};
pub use fanout::{BatchProgress, BatchReport, Job, JobOutcome, JobState, ReportError};
pub use jitter::{FixedJitter, JitterSource, RandJitter};
pub use mutex::{MutexOptions, QuorumTally, QuorumVerdict};
pub use sequence::{IncrSequenceConfig, SeriesCatalog, SeriesDomain, TenantTier};
pub use token::{SequentialTokenGen, TokenGen, UuidTokenGen};

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tandem coordination engine
//!
//! Async orchestration over the store adapters: quorum mutexes, sequence
//! generators, the fan-out executor and its helpers.

pub mod converge;
mod error;
mod exclusive;
pub mod fanout;
pub mod mutex;
mod quorum;
pub mod sequence;

pub use converge::{find_or_create, Converged, FindOrCreate, UniqueViolation};
pub use error::{ConvergeError, ExclusiveError, FanOutError, MutexError, SequenceError};
pub use exclusive::{BatchRun, ExclusiveBatch};
pub use fanout::{FanOutExecutor, TargetOperation};
pub use mutex::{Mutex, MutexManager};
pub use sequence::{DailySequence, IncrSequence};

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry delay sources for lock acquisition
//!
//! The random source is owned by whoever builds the mutex manager, so retry
//! timing can be made deterministic in tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Produces the delay to sleep between two acquisition attempts
pub trait JitterSource: Send + Sync + 'static {
    /// Delay drawn from `[min, max)`
    fn delay(&self, min: Duration, max: Duration) -> Duration;
}

/// Uniformly random delays backed by a seedable RNG
#[derive(Clone)]
pub struct RandJitter {
    rng: Arc<Mutex<StdRng>>,
}

impl RandJitter {
    /// Seed from the operating system
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Deterministic sequence of delays for a given seed
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Arc::new(Mutex::new(rng)),
        }
    }
}

impl Default for RandJitter {
    fn default() -> Self {
        Self::new()
    }
}

impl JitterSource for RandJitter {
    fn delay(&self, min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let span = (max - min).as_micros() as u64;
        min + Duration::from_micros(rng.random_range(0..span))
    }
}

/// Always returns the same delay, clamped into the requested range
#[derive(Clone, Copy, Debug)]
pub struct FixedJitter(pub Duration);

impl JitterSource for FixedJitter {
    fn delay(&self, min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        self.0.clamp(min, max - Duration::from_micros(1))
    }
}

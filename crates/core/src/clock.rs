// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling
//!
//! Two readings are exposed: a monotonic [`Instant`] for measuring elapsed
//! time (lock validity, TTLs) and a local wall-clock time for calendar
//! decisions (which day a counter belongs to, when that day ends).

use chrono::{DateTime, Local};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A clock that provides the current time
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;

    /// Wall-clock time in the local timezone
    fn local_now(&self) -> DateTime<Local>;
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn local_now(&self) -> DateTime<Local> {
        Local::now()
    }
}

struct FakeTime {
    instant: Instant,
    wall: DateTime<Local>,
}

/// Fake clock for testing with controllable time
///
/// Both readings move together on [`FakeClock::advance`].
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<FakeTime>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(FakeTime {
                instant: Instant::now(),
                wall: Local::now(),
            })),
        }
    }

    /// Create a fake clock whose wall-clock reading starts at `wall`
    pub fn at(wall: DateTime<Local>) -> Self {
        let clock = Self::new();
        clock.set_local(wall);
        clock
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        current.instant += duration;
        if let Some(wall) = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|delta| current.wall.checked_add_signed(delta))
        {
            current.wall = wall;
        }
    }

    /// Set the wall-clock reading without touching the monotonic one
    pub fn set_local(&self, wall: DateTime<Local>) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        current.wall = wall;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).instant
    }

    fn local_now(&self) -> DateTime<Local> {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).wall
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A clock that provides the current time.
///
/// `now` drives interval decisions (snapshot cadence); `now_utc` stamps
/// durable event envelopes.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Real system clock
#[derive(Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fake clock for testing with controllable time
#[derive(Clone, Debug)]
pub struct FakeClock {
    current: Arc<Mutex<Instant>>,
    utc: Arc<Mutex<DateTime<Utc>>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(Instant::now())),
            utc: Arc::new(Mutex::new(Utc.timestamp_millis_opt(1_000_000).unwrap())),
        }
    }

    /// Advance both clocks by the given duration
    pub fn advance(&self, duration: Duration) {
        *self.current.lock() += duration;
        let mut utc = self.utc.lock();
        *utc = *utc + chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
    }

    /// Set the wall-clock time to a specific instant
    pub fn set_utc(&self, ts: DateTime<Utc>) {
        *self.utc.lock() = ts;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.current.lock()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        *self.utc.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;

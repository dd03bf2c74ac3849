//! Production clock using system time.
//!
//! `SystemClock` is the production implementation of [`Clock`]: monotonic
//! time from `std::time::Instant` for echo expiry, and UTC wall-clock time for
//! stamping optimistic renders.

use chrono::{DateTime, Utc};
use parley_core::Clock;

/// Production clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    #[allow(clippy::disallowed_methods)]
    fn wall_clock(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

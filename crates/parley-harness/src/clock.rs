//! Manually advanced clock.
//!
//! Time only moves when a test calls [`ManualClock::advance`]. Clones share
//! the same underlying time, so a test can keep a handle after moving the
//! clock into an engine.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};
use parley_core::Clock;

/// Wall-clock time at offset zero: 2024-01-01T00:00:00Z.
const BASE_SECS: i64 = 1_704_067_200;

/// Deterministic [`Clock`] whose instants are offsets from zero.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    elapsed_nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock at offset zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `by`.
    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
    }
}

impl Clock for ManualClock {
    type Instant = Duration;

    fn now(&self) -> Duration {
        self.elapsed()
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        let base = DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(BASE_SECS);
        base + TimeDelta::from_std(self.elapsed()).unwrap_or(TimeDelta::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();

        handle.advance(Duration::from_secs(3));
        assert_eq!(clock.now(), Duration::from_secs(3));
    }

    #[test]
    fn wall_clock_follows_offset() {
        let clock = ManualClock::new();
        assert_eq!(clock.wall_clock().to_rfc3339(), "2024-01-01T00:00:00+00:00");

        clock.advance(Duration::from_millis(1500));
        assert_eq!(clock.wall_clock().timestamp_millis(), BASE_SECS * 1000 + 1500);
    }
}

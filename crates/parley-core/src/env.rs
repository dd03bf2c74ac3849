//! Clock abstraction for deterministic testing.
//!
//! Decouples synchronization logic from system time. Echo expiry is measured
//! against a monotonic [`Clock::Instant`], while optimistic renders are
//! stamped with [`Clock::wall_clock`]. Production uses real system time;
//! simulation drives a manual clock.

use std::{ops::Sub, time::Duration};

use chrono::{DateTime, Utc};

/// Abstract source of time.
///
/// # Invariants
///
/// - `now()` never goes backwards within a single engine.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic instant type.
    ///
    /// Production clocks use `std::time::Instant`, simulation clocks use a
    /// virtual offset.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time, used for locally generated message timestamps.
    fn wall_clock(&self) -> DateTime<Utc>;
}

//! Properties of engine state that hold after every step.
//!
//! [`SyncSnapshot`] captures what a caller can observe of a
//! [`parley_core::SyncEngine`]; each [`Invariant`] inspects one snapshot and
//! reports at most one [`Violation`]. The ordering of events that led there
//! is irrelevant.

mod checks;
mod snapshot;

use std::fmt;

pub use checks::{
    ActiveVisibleUnreadZero, IdleTranscriptEmpty, NoOrphanCounters, SubscriptionsMatchRegistry,
};
pub use snapshot::SyncSnapshot;

/// Outcome of one invariant check.
pub type InvariantResult = Result<(), Violation>;

/// A broken invariant and the state that broke it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Which invariant.
    pub invariant: &'static str,
    /// The offending state, in words.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.invariant, self.message)
    }
}

/// A property checked against engine state.
pub trait Invariant: Send + Sync {
    /// Stable name used in reports.
    fn name(&self) -> &'static str;

    /// Inspect `state`.
    fn check(&self, state: &SyncSnapshot) -> InvariantResult;
}

const STANDARD: &[&dyn Invariant] = &[
    &ActiveVisibleUnreadZero,
    &NoOrphanCounters,
    &SubscriptionsMatchRegistry,
    &IdleTranscriptEmpty,
];

/// Fixed set of invariants checked together.
#[derive(Clone, Copy)]
pub struct InvariantRegistry {
    invariants: &'static [&'static dyn Invariant],
}

impl InvariantRegistry {
    /// Every engine invariant.
    pub fn standard() -> Self {
        Self { invariants: STANDARD }
    }

    /// Violations found in `state`, in registration order.
    pub fn violations<'a>(
        &'a self,
        state: &'a SyncSnapshot,
    ) -> impl Iterator<Item = Violation> + 'a {
        self.invariants.iter().filter_map(move |invariant| invariant.check(state).err())
    }

    /// Panic listing every violation in `state`, labelled with `context`.
    #[allow(clippy::panic, reason = "test assertion helper")]
    pub fn assert_all(&self, state: &SyncSnapshot, context: &str) {
        let report = self.violations(state).fold(String::new(), |mut report, violation| {
            report.push_str("\n  ");
            report.push_str(&violation.to_string());
            report
        });
        if !report.is_empty() {
            panic!("invariants broken {context}:{report}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_snapshot_is_clean() {
        let registry = InvariantRegistry::standard();
        assert_eq!(registry.violations(&SyncSnapshot::default()).count(), 0);
    }

    #[test]
    fn violation_names_its_invariant() {
        let violation = Violation { invariant: "no_orphan_counters", message: "room:3".into() };
        assert_eq!(violation.to_string(), "[no_orphan_counters] room:3");
    }
}

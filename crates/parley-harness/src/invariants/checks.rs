//! Standard engine invariants.

use super::{Invariant, InvariantResult, SyncSnapshot, Violation};

/// The channel that is both active and visible has no unread messages.
pub struct ActiveVisibleUnreadZero;

impl Invariant for ActiveVisibleUnreadZero {
    fn name(&self) -> &'static str {
        "active_visible_unread_zero"
    }

    fn check(&self, state: &SyncSnapshot) -> InvariantResult {
        let Some(active) = state.active.filter(|_| state.visible) else {
            return Ok(());
        };
        match state.unread.get(&active) {
            Some(&count) if count > 0 => Err(Violation {
                invariant: self.name(),
                message: format!("active visible channel {active} has {count} unread"),
            }),
            _ => Ok(()),
        }
    }
}

/// Every unread counter belongs to a known channel.
pub struct NoOrphanCounters;

impl Invariant for NoOrphanCounters {
    fn name(&self) -> &'static str {
        "no_orphan_counters"
    }

    fn check(&self, state: &SyncSnapshot) -> InvariantResult {
        match state.unread.keys().find(|c| !state.known.contains(c)) {
            Some(orphan) => Err(Violation {
                invariant: self.name(),
                message: format!("counter for {orphan} outlived its channel"),
            }),
            None => Ok(()),
        }
    }
}

/// While connected, live subscriptions are exactly the topics known channels
/// need. At most one handle per topic follows from the manager keying by
/// topic.
pub struct SubscriptionsMatchRegistry;

impl Invariant for SubscriptionsMatchRegistry {
    fn name(&self) -> &'static str {
        "subscriptions_match_registry"
    }

    fn check(&self, state: &SyncSnapshot) -> InvariantResult {
        if !state.connected {
            return Ok(());
        }
        let desired = state.desired_topics();
        if desired == state.live_topics {
            return Ok(());
        }
        Err(Violation {
            invariant: self.name(),
            message: format!("live {:?}, desired {:?}", state.live_topics, desired),
        })
    }
}

/// Nothing is shown before a channel has been selected.
pub struct IdleTranscriptEmpty;

impl Invariant for IdleTranscriptEmpty {
    fn name(&self) -> &'static str {
        "idle_transcript_empty"
    }

    fn check(&self, state: &SyncSnapshot) -> InvariantResult {
        if state.active.is_none() && state.transcript_len > 0 {
            return Err(Violation {
                invariant: self.name(),
                message: format!("{} messages shown with no active channel", state.transcript_len),
            });
        }
        Ok(())
    }
}

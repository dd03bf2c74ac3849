//! Staleness guard for the periodic registry poll.
//!
//! Polls fire on a fixed interval with no overlap guard, so a slow response
//! can arrive after a newer one. Each poll carries a monotonically increasing
//! [`PollTicket`]; a response is applied only if it is newer than the last
//! applied one. An older response arriving late is superseded and dropped.

/// Tag of one registry poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PollTicket(u64);

/// Issues poll tickets and decides which responses are still current.
#[derive(Debug, Clone, Default)]
pub struct PollGuard {
    next: u64,
    applied: Option<PollTicket>,
}

impl PollGuard {
    /// Create a guard with nothing issued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag a new poll.
    pub fn issue(&mut self) -> PollTicket {
        let ticket = PollTicket(self.next);
        self.next += 1;
        ticket
    }

    /// Whether a successful response for `ticket` may be applied.
    ///
    /// Accepting a ticket supersedes it and every older one.
    pub fn accept(&mut self, ticket: PollTicket) -> bool {
        if self.applied.is_some_and(|applied| applied >= ticket) {
            return false;
        }
        self.applied = Some(ticket);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_older_response_is_superseded() {
        let mut guard = PollGuard::new();
        let slow = guard.issue();
        let fast = guard.issue();

        assert!(guard.accept(fast));
        assert!(!guard.accept(slow));
    }

    #[test]
    fn in_order_responses_all_apply() {
        let mut guard = PollGuard::new();
        let first = guard.issue();
        let second = guard.issue();

        assert!(guard.accept(first));
        assert!(guard.accept(second));
        assert!(!guard.accept(second));
    }
}

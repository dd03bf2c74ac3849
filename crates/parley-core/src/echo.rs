//! Suppression of the local user's own broadcast echoes.
//!
//! Every message the local user sends is rendered optimistically and later
//! comes back through the broadcast subscription. [`EchoSuppressor`] records
//! each send for [`ECHO_TTL`] so the echo can be recognised and discarded
//! instead of rendered a second time.
//!
//! # Matching
//!
//! Echoes match on exact `(channel, content)` equality. Pending sends are
//! queued per key in insertion order, so match and prune are O(1) amortized.
//!
//! When several identical sends to the same channel are in flight, the
//! earliest pending entry is consumed first. Nothing on the wire says which
//! send a given echo belongs to, so this pairing is a heuristic: the number of
//! suppressed echoes is right, the pairing of individual echoes to sends is
//! not guaranteed.

use std::{
    collections::{HashMap, VecDeque},
    ops::Sub,
    time::Duration,
};

use crate::channel::ChannelId;

/// How long a sent message waits for its echo.
pub const ECHO_TTL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy)]
struct Pending<I> {
    seq: u64,
    created_at: I,
}

#[derive(Debug, Clone)]
struct Record<I> {
    seq: u64,
    created_at: I,
    channel: ChannelId,
    content: String,
}

/// Short-lived record of messages awaiting their echo.
///
/// Generic over the clock's instant type so simulations can use virtual time.
#[derive(Debug, Clone)]
pub struct EchoSuppressor<I> {
    ttl: Duration,
    next_seq: u64,
    /// Unmatched sends per channel and content, oldest first.
    pending: HashMap<ChannelId, HashMap<String, VecDeque<Pending<I>>>>,
    /// Every send in insertion order, for pruning.
    order: VecDeque<Record<I>>,
}

impl<I> Default for EchoSuppressor<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    fn default() -> Self {
        Self::new(ECHO_TTL)
    }
}

impl<I> EchoSuppressor<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create a suppressor whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, next_seq: 0, pending: HashMap::new(), order: VecDeque::new() }
    }

    /// Record a send of `content` to `channel` at `now`.
    ///
    /// Also prunes every entry older than the TTL. Pruning only happens here,
    /// so expired entries may linger until the next send; [`Self::consume`]
    /// checks age on its own and never matches them.
    pub fn remember(&mut self, channel: ChannelId, content: &str, now: I) {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.pending
            .entry(channel)
            .or_default()
            .entry(content.to_owned())
            .or_default()
            .push_back(Pending { seq, created_at: now });
        self.order.push_back(Record { seq, created_at: now, channel, content: content.to_owned() });

        self.prune(now);
    }

    /// Match and remove the earliest live entry for `(channel, content)`.
    ///
    /// Returns `true` if the inbound message is an echo and must be
    /// suppressed.
    pub fn consume(&mut self, channel: ChannelId, content: &str, now: I) -> bool {
        let Some(by_content) = self.pending.get_mut(&channel) else {
            return false;
        };
        let Some(queue) = by_content.get_mut(content) else {
            return false;
        };

        let mut matched = false;
        while let Some(entry) = queue.pop_front() {
            if age(now, entry.created_at) <= self.ttl {
                matched = true;
                break;
            }
        }

        if queue.is_empty() {
            by_content.remove(content);
        }
        if by_content.is_empty() {
            self.pending.remove(&channel);
        }
        matched
    }

    /// Number of unmatched entries, including expired ones not yet pruned.
    pub fn len(&self) -> usize {
        self.pending.values().flat_map(HashMap::values).map(VecDeque::len).sum()
    }

    /// Whether no entries are pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn prune(&mut self, now: I) {
        while let Some(record) = self.order.front() {
            if age(now, record.created_at) <= self.ttl {
                break;
            }
            let Some(record) = self.order.pop_front() else {
                break;
            };

            let Some(by_content) = self.pending.get_mut(&record.channel) else {
                continue;
            };
            if let Some(queue) = by_content.get_mut(&record.content) {
                // Already consumed entries are no longer at the front.
                if queue.front().is_some_and(|entry| entry.seq == record.seq) {
                    queue.pop_front();
                }
                if queue.is_empty() {
                    by_content.remove(&record.content);
                }
            }
            if by_content.is_empty() {
                self.pending.remove(&record.channel);
            }
        }
    }
}

fn age<I>(now: I, created_at: I) -> Duration
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    if now > created_at { now - created_at } else { Duration::ZERO }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOM: ChannelId = ChannelId::Room(5);
    const PEER: ChannelId = ChannelId::Direct(42);

    fn at(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn echo_is_suppressed_exactly_once() {
        let mut echoes = EchoSuppressor::default();
        echoes.remember(PEER, "hello", at(0));

        assert!(echoes.consume(PEER, "hello", at(100)));
        assert!(!echoes.consume(PEER, "hello", at(200)));
    }

    #[test]
    fn expired_entry_never_matches() {
        let mut echoes = EchoSuppressor::default();
        echoes.remember(ROOM, "hi", at(0));

        assert!(!echoes.consume(ROOM, "hi", at(15_001)));
        assert!(echoes.is_empty());
    }

    #[test]
    fn entry_at_exact_ttl_still_matches() {
        let mut echoes = EchoSuppressor::default();
        echoes.remember(ROOM, "hi", at(0));

        assert!(echoes.consume(ROOM, "hi", at(15_000)));
    }

    #[test]
    fn match_requires_same_channel_and_exact_content() {
        let mut echoes = EchoSuppressor::default();
        echoes.remember(ROOM, "hi", at(0));

        assert!(!echoes.consume(PEER, "hi", at(1)));
        assert!(!echoes.consume(ROOM, "hi ", at(1)));
        assert!(!echoes.consume(ROOM, "Hi", at(1)));
        assert!(echoes.consume(ROOM, "hi", at(1)));
    }

    #[test]
    fn duplicates_are_consumed_oldest_first() {
        let mut echoes = EchoSuppressor::default();
        echoes.remember(ROOM, "ok", at(0));
        echoes.remember(ROOM, "ok", at(10_000));

        // Oldest is consumed first, so the younger one survives past the
        // oldest's expiry.
        assert!(echoes.consume(ROOM, "ok", at(11_000)));
        assert!(echoes.consume(ROOM, "ok", at(20_000)));
        assert!(!echoes.consume(ROOM, "ok", at(20_001)));
    }

    #[test]
    fn consume_skips_expired_duplicates() {
        let mut echoes = EchoSuppressor::default();
        echoes.remember(ROOM, "ok", at(0));
        echoes.remember(ROOM, "ok", at(10_000));

        assert!(echoes.consume(ROOM, "ok", at(16_000)));
        assert!(echoes.is_empty());
    }

    #[test]
    fn remember_prunes_expired_entries() {
        let mut echoes = EchoSuppressor::default();
        echoes.remember(ROOM, "a", at(0));
        echoes.remember(PEER, "b", at(1_000));
        assert_eq!(echoes.len(), 2);

        echoes.remember(ROOM, "c", at(16_500));

        assert_eq!(echoes.len(), 1);
        assert!(echoes.consume(ROOM, "c", at(16_600)));
    }

    #[test]
    fn prune_ignores_already_consumed_entries() {
        let mut echoes = EchoSuppressor::default();
        echoes.remember(ROOM, "x", at(0));
        assert!(echoes.consume(ROOM, "x", at(1)));
        echoes.remember(ROOM, "x", at(10_000));

        // Pruning the consumed record must not drop the newer entry.
        echoes.remember(PEER, "y", at(16_000));

        assert!(echoes.consume(ROOM, "x", at(16_100)));
    }

    #[test]
    fn custom_ttl() {
        let mut echoes = EchoSuppressor::new(Duration::from_secs(1));
        echoes.remember(ROOM, "x", at(0));
        assert!(!echoes.consume(ROOM, "x", at(1_001)));
    }
}

//! The single channel currently in view and its transcript.
//!
//! Selecting a channel issues a [`HistoryTicket`]. History fetches are never
//! cancelled; instead, a response is applied only if its ticket is still the
//! one in flight. A response for a channel the user has since switched away
//! from (or re-selected, issuing a newer ticket) is stale and dropped without
//! touching the transcript.

use std::collections::HashSet;

use crate::{
    channel::{ChannelId, UserId},
    message::ChatMessage,
};

/// Tag of one history fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HistoryTicket {
    /// Channel the history was requested for.
    pub channel: ChannelId,
    seq: u64,
}

/// Active channel, its transcript, and the in-flight history fetch.
#[derive(Debug, Clone, Default)]
pub struct ActiveChannelSession {
    active: Option<ChannelId>,
    transcript: Vec<ChatMessage>,
    next_seq: u64,
    in_flight: Option<HistoryTicket>,
}

impl ActiveChannelSession {
    /// Create a session with nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `channel` active, clear the transcript, and tag a history fetch.
    ///
    /// Any earlier in-flight fetch becomes stale.
    pub fn select(&mut self, channel: ChannelId) -> HistoryTicket {
        let ticket = HistoryTicket { channel, seq: self.next_seq };
        self.next_seq += 1;

        self.active = Some(channel);
        self.transcript.clear();
        self.in_flight = Some(ticket);
        ticket
    }

    /// Whether a response for `ticket` may still be applied.
    pub fn is_current(&self, ticket: HistoryTicket) -> bool {
        self.in_flight == Some(ticket) && self.active == Some(ticket.channel)
    }

    /// Apply fetched history, oldest first.
    ///
    /// Messages rendered live while the fetch was in flight stay after the
    /// history, minus any the history already contains. Remote and confirmed
    /// entries match by server id. Unconfirmed optimistic entries match a
    /// history entry with the same sender and content, one to one, newest
    /// history first; history entries already claimed by id are skipped.
    ///
    /// Returns `false` and changes nothing if the ticket is stale.
    pub fn apply_history(&mut self, ticket: HistoryTicket, history: Vec<ChatMessage>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.in_flight = None;

        let known: HashSet<i64> = history.iter().filter_map(|m| m.id).collect();
        let live = std::mem::replace(&mut self.transcript, history);

        let history_len = self.transcript.len();
        let live_ids: HashSet<i64> = live.iter().filter_map(|m| m.id).collect();
        let mut claimed: Vec<bool> =
            self.transcript.iter().map(|m| m.id.is_some_and(|id| live_ids.contains(&id))).collect();

        for message in live {
            let duplicate = match message.id {
                Some(id) => known.contains(&id),
                None if message.local => {
                    claim_copy(&self.transcript[..history_len], &mut claimed, &message)
                },
                None => false,
            };
            if !duplicate {
                self.transcript.push(message);
            }
        }
        true
    }

    /// Attach the server id of a suppressed echo to its optimistic entry.
    ///
    /// Only the earliest unconfirmed local entry from `sender` with the same
    /// content is updated. Confirmation only matters while history is
    /// loading, so this is a no-op otherwise. Returns whether an entry was
    /// confirmed.
    pub fn confirm(&mut self, sender: UserId, content: &str, id: i64) -> bool {
        if self.in_flight.is_none() {
            return false;
        }
        let entry = self.transcript.iter_mut().find(|m| {
            m.local && m.id.is_none() && m.sender_id == sender && m.content == content
        });
        match entry {
            Some(entry) => {
                entry.id = Some(id);
                true
            },
            None => false,
        }
    }

    /// Record a failed fetch. The transcript is left as it is.
    ///
    /// Returns `false` if the ticket is stale.
    pub fn fail_history(&mut self, ticket: HistoryTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.in_flight = None;
        true
    }

    /// Append a message to the transcript.
    pub fn push(&mut self, message: ChatMessage) {
        self.transcript.push(message);
    }

    /// Channel in view.
    pub fn active(&self) -> Option<ChannelId> {
        self.active
    }

    /// Rendered transcript of the active channel.
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Whether a history fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }
}

/// Claim the newest unclaimed history entry with the sender and content of
/// `local`. Returns whether one was found.
fn claim_copy(history: &[ChatMessage], claimed: &mut [bool], local: &ChatMessage) -> bool {
    let copy = history.iter().enumerate().rev().find(|(i, h)| {
        !claimed[*i] && h.sender_id == local.sender_id && h.content == local.content
    });
    match copy {
        Some((i, _)) => {
            claimed[i] = true;
            true
        },
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(id: i64, content: &str) -> ChatMessage {
        ChatMessage {
            id: Some(id),
            sender_id: 8,
            sender_username: Some("bob".into()),
            content: content.into(),
            timestamp: "2024-01-01T00:00:00Z".into(),
            local: false,
        }
    }

    #[test]
    fn stale_ticket_is_discarded() {
        let mut session = ActiveChannelSession::new();
        let first = session.select(ChannelId::Room(1));
        let second = session.select(ChannelId::Room(2));
        session.push(remote(10, "live in room 2"));

        assert!(!session.apply_history(first, vec![remote(1, "old room 1")]));
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.active(), Some(ChannelId::Room(2)));
        assert!(session.is_current(second));
    }

    #[test]
    fn reselecting_same_channel_invalidates_older_ticket() {
        let mut session = ActiveChannelSession::new();
        let first = session.select(ChannelId::Room(1));
        let second = session.select(ChannelId::Room(1));

        assert!(!session.is_current(first));
        assert!(session.apply_history(second, vec![remote(1, "a")]));
        assert!(!session.apply_history(first, vec![remote(1, "a")]));
        assert_eq!(session.transcript().len(), 1);
    }

    #[test]
    fn history_precedes_live_messages_without_duplicates() {
        let mut session = ActiveChannelSession::new();
        let ticket = session.select(ChannelId::Room(1));
        session.push(remote(3, "c"));
        session.push(remote(4, "d"));

        let applied = session.apply_history(ticket, vec![remote(1, "a"), remote(2, "b"), remote(3, "c")]);

        assert!(applied);
        let contents: Vec<_> = session.transcript().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["a", "b", "c", "d"]);
        assert!(!session.is_loading());
    }

    fn local(content: &str) -> ChatMessage {
        ChatMessage {
            id: None,
            sender_id: 7,
            sender_username: Some("alice".into()),
            content: content.into(),
            timestamp: "2024-01-01T00:00:01.000Z".into(),
            local: true,
        }
    }

    fn own(id: i64, content: &str) -> ChatMessage {
        ChatMessage { sender_id: 7, sender_username: Some("alice".into()), ..remote(id, content) }
    }

    #[test]
    fn history_copy_replaces_unconfirmed_local_entry() {
        let mut session = ActiveChannelSession::new();
        let ticket = session.select(ChannelId::Room(1));
        session.push(local("hello"));

        assert!(session.apply_history(ticket, vec![remote(1, "hi"), own(2, "hello")]));

        let ids: Vec<_> = session.transcript().iter().map(|m| m.id).collect();
        assert_eq!(ids, [Some(1), Some(2)]);
    }

    #[test]
    fn local_entries_match_history_one_to_one() {
        let mut session = ActiveChannelSession::new();
        let ticket = session.select(ChannelId::Room(1));
        session.push(local("ok"));
        session.push(local("ok"));

        // Only the first send reached the server before the history query.
        assert!(session.apply_history(ticket, vec![own(5, "ok")]));

        let rendered: Vec<_> = session.transcript().iter().map(|m| (m.id, m.local)).collect();
        assert_eq!(rendered, [(Some(5), false), (None, true)]);
    }

    #[test]
    fn same_content_from_someone_else_is_kept() {
        let mut session = ActiveChannelSession::new();
        let ticket = session.select(ChannelId::Room(1));
        session.push(local("hello"));

        assert!(session.apply_history(ticket, vec![remote(3, "hello")]));
        assert_eq!(session.transcript().len(), 2);
    }

    #[test]
    fn confirmed_entry_does_not_claim_another_copy() {
        let mut session = ActiveChannelSession::new();
        let ticket = session.select(ChannelId::Room(1));
        session.push(local("ok"));
        session.push(local("ok"));
        assert!(session.confirm(7, "ok", 5));

        // The second send is not in history yet, so it must survive.
        assert!(session.apply_history(ticket, vec![own(5, "ok")]));

        let rendered: Vec<_> = session.transcript().iter().map(|m| (m.id, m.local)).collect();
        assert_eq!(rendered, [(Some(5), false), (None, true)]);
    }

    #[test]
    fn confirm_is_ignored_once_history_landed() {
        let mut session = ActiveChannelSession::new();
        let ticket = session.select(ChannelId::Room(1));
        assert!(session.apply_history(ticket, vec![]));
        session.push(local("hello"));

        assert!(!session.confirm(7, "hello", 9));
        assert_eq!(session.transcript()[0].id, None);
    }

    #[test]
    fn failed_fetch_keeps_transcript() {
        let mut session = ActiveChannelSession::new();
        let ticket = session.select(ChannelId::Direct(42));
        session.push(remote(1, "live"));

        assert!(session.fail_history(ticket));
        assert_eq!(session.transcript().len(), 1);
        assert!(!session.is_loading());
        assert!(!session.fail_history(ticket));
    }

    #[test]
    fn select_clears_transcript() {
        let mut session = ActiveChannelSession::new();
        session.select(ChannelId::Room(1));
        session.push(remote(1, "x"));

        session.select(ChannelId::Room(2));

        assert!(session.transcript().is_empty());
    }
}

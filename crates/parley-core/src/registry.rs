//! Authoritative set of known channels and their unread counters.
//!
//! The registry is replaced wholesale on every refresh. Counters live and die
//! with their channel: a counter exists exactly for the channels currently
//! known, so a channel that drops out of a refresh takes its badge with it.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::channel::{Channel, ChannelId};

/// Known channels and per-channel unread counts.
#[derive(Debug, Clone, Default)]
pub struct ChannelRegistry {
    channels: BTreeMap<ChannelId, Channel>,
    unread: HashMap<ChannelId, u32>,
}

impl ChannelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the known set with `server_list`.
    ///
    /// Counters of channels that remain are preserved, new channels start at
    /// zero, and counters of vanished channels are deleted. Duplicate entries
    /// collapse by identity; the last one wins for display data.
    ///
    /// Returns the reconciled set of channel identities.
    pub fn refresh(&mut self, server_list: Vec<Channel>) -> BTreeSet<ChannelId> {
        let channels: BTreeMap<ChannelId, Channel> =
            server_list.into_iter().map(|channel| (channel.id, channel)).collect();

        self.unread.retain(|id, _| channels.contains_key(id));
        for id in channels.keys() {
            self.unread.entry(*id).or_insert(0);
        }
        self.channels = channels;

        self.ids()
    }

    /// Reset the counter of `channel` to zero.
    pub fn mark_read(&mut self, channel: ChannelId) {
        if let Some(count) = self.unread.get_mut(&channel) {
            *count = 0;
        }
    }

    /// Add one unread message to `channel` and return the new count.
    ///
    /// Creates the counter at 1 if absent. Callers drop messages for unknown
    /// channels before they get here.
    pub fn increment(&mut self, channel: ChannelId) -> u32 {
        let count = self.unread.entry(channel).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Unread count for `channel`. Zero for unknown channels.
    pub fn unread(&self, channel: ChannelId) -> u32 {
        self.unread.get(&channel).copied().unwrap_or(0)
    }

    /// Whether `channel` is currently known.
    pub fn contains(&self, channel: ChannelId) -> bool {
        self.channels.contains_key(&channel)
    }

    /// Channel data for `channel`.
    pub fn get(&self, channel: ChannelId) -> Option<&Channel> {
        self.channels.get(&channel)
    }

    /// Known channels in identity order (rooms before direct peers).
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// Identities of all known channels.
    pub fn ids(&self) -> BTreeSet<ChannelId> {
        self.channels.keys().copied().collect()
    }

    /// Channels that hold an unread counter.
    pub fn counted(&self) -> impl Iterator<Item = (ChannelId, u32)> + '_ {
        self.unread.iter().map(|(id, count)| (*id, *count))
    }

    /// Number of known channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether no channels are known.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rooms(ids: &[i64]) -> Vec<Channel> {
        ids.iter().map(|id| Channel::room(*id, format!("room {id}"))).collect()
    }

    #[test]
    fn refresh_preserves_surviving_counters() {
        let mut registry = ChannelRegistry::new();
        registry.refresh(rooms(&[1, 2]));
        registry.increment(ChannelId::Room(1));
        registry.increment(ChannelId::Room(1));
        registry.increment(ChannelId::Room(2));

        registry.refresh(rooms(&[1, 3]));

        assert_eq!(registry.unread(ChannelId::Room(1)), 2);
        assert_eq!(registry.unread(ChannelId::Room(3)), 0);
        assert!(!registry.contains(ChannelId::Room(2)));
        assert!(registry.counted().all(|(id, _)| registry.contains(id)));
    }

    #[test]
    fn refresh_empty_drops_everything() {
        let mut registry = ChannelRegistry::new();
        registry.refresh(rooms(&[1, 2]));
        registry.increment(ChannelId::Room(1));

        let known = registry.refresh(Vec::new());

        assert!(known.is_empty());
        assert!(registry.is_empty());
        assert_eq!(registry.counted().count(), 0);
    }

    #[test]
    fn refresh_is_order_independent_and_idempotent() {
        let mut a = ChannelRegistry::new();
        let mut b = ChannelRegistry::new();

        let known_a = a.refresh(rooms(&[3, 1, 2]));
        let known_b = b.refresh(rooms(&[1, 2, 3, 2]));
        let again = b.refresh(rooms(&[1, 2, 3]));

        assert_eq!(known_a, known_b);
        assert_eq!(known_b, again);
    }

    #[test]
    fn duplicate_identity_keeps_last_display_data() {
        let mut registry = ChannelRegistry::new();
        registry.refresh(vec![Channel::direct(42, "bob", false), Channel::direct(42, "bob", true)]);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(ChannelId::Direct(42)).and_then(|c| c.online), Some(true));
    }

    #[test]
    fn mark_read_resets_counter() {
        let mut registry = ChannelRegistry::new();
        registry.refresh(rooms(&[1]));
        assert_eq!(registry.increment(ChannelId::Room(1)), 1);
        assert_eq!(registry.increment(ChannelId::Room(1)), 2);

        registry.mark_read(ChannelId::Room(1));

        assert_eq!(registry.unread(ChannelId::Room(1)), 0);
    }

    #[test]
    fn mark_read_does_not_create_counters() {
        let mut registry = ChannelRegistry::new();
        registry.mark_read(ChannelId::Room(9));
        assert_eq!(registry.counted().count(), 0);
    }
}

//! Observable engine state for invariant checking.

use std::collections::{BTreeMap, BTreeSet};

use parley_core::{ChannelId, Clock, SyncEngine, Topic, Transport, UserId};

/// Point-in-time copy of everything invariants look at.
#[derive(Debug, Clone, Default)]
pub struct SyncSnapshot {
    /// Local user.
    pub local_user: UserId,
    /// Whether the transport reports a live connection.
    pub connected: bool,
    /// Whether the user can see the active channel.
    pub visible: bool,
    /// Selected channel.
    pub active: Option<ChannelId>,
    /// Channels in the registry.
    pub known: BTreeSet<ChannelId>,
    /// Every unread counter, including zeros.
    pub unread: BTreeMap<ChannelId, u32>,
    /// Topics the subscription manager holds a handle for.
    pub live_topics: BTreeSet<Topic>,
    /// Transcript length.
    pub transcript_len: usize,
}

impl SyncSnapshot {
    /// Capture the observable state of `engine`.
    pub fn from_engine<T: Transport, C: Clock>(engine: &SyncEngine<T, C>) -> Self {
        let registry = engine.registry();
        Self {
            local_user: engine.auth().user_id,
            connected: engine.transport().is_connected(),
            visible: engine.is_visible(),
            active: engine.active_channel(),
            known: registry.ids(),
            unread: registry.counted().collect(),
            live_topics: engine.subscriptions().live_topics().collect(),
            transcript_len: engine.transcript().len(),
        }
    }

    /// Topics the known channels need.
    pub fn desired_topics(&self) -> BTreeSet<Topic> {
        self.known.iter().map(|c| c.topic(self.local_user)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_channels_share_user_queue() {
        let snapshot = SyncSnapshot {
            local_user: 7,
            known: [ChannelId::Direct(1), ChannelId::Direct(2), ChannelId::Room(3)].into(),
            ..SyncSnapshot::default()
        };

        let desired: Vec<_> = snapshot.desired_topics().into_iter().collect();
        assert_eq!(desired.len(), 2);
        assert!(desired.contains(&Topic::UserQueue(7)));
        assert!(desired.contains(&Topic::Room(3)));
    }
}

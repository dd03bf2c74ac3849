//! Live transport subscriptions, reconciled against the registry.
//!
//! Subscriptions are keyed by [`Topic`], not by channel: every room has its
//! own topic, and all direct channels share the local user's queue. The
//! manager keeps exactly one handle per desired topic and remembers which
//! topic each handle belongs to, so every delivery can be tagged with its
//! origin before it reaches the router.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::{
    channel::{ChannelId, Topic, UserId},
    transport::{SubscriptionId, Transport},
};

/// Topics touched by one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Topics newly subscribed.
    pub subscribed: Vec<Topic>,
    /// Topics unsubscribed.
    pub unsubscribed: Vec<Topic>,
}

impl Reconciliation {
    /// Whether the pass changed nothing.
    pub fn is_empty(&self) -> bool {
        self.subscribed.is_empty() && self.unsubscribed.is_empty()
    }
}

/// Owner of all live subscription handles.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionManager {
    live: BTreeMap<Topic, SubscriptionId>,
    origins: HashMap<SubscriptionId, Topic>,
}

impl SubscriptionManager {
    /// Create a manager with no live subscriptions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring live subscriptions in line with `known`.
    ///
    /// Unsubscribes topics no known channel needs and subscribes topics that
    /// are missing. Repeated calls with the same set issue no transport calls.
    /// No-op while the transport is disconnected; the reconcile after the next
    /// connect catches up.
    pub fn reconcile<T: Transport>(
        &mut self,
        transport: &mut T,
        known: &BTreeSet<ChannelId>,
        local_user: UserId,
    ) -> Reconciliation {
        let mut report = Reconciliation::default();
        if !transport.is_connected() {
            return report;
        }

        let desired: BTreeSet<Topic> = known.iter().map(|c| c.topic(local_user)).collect();

        let stale: Vec<Topic> =
            self.live.keys().filter(|topic| !desired.contains(topic)).copied().collect();
        for topic in stale {
            if let Some(handle) = self.live.remove(&topic) {
                self.origins.remove(&handle);
                if let Err(e) = transport.unsubscribe(handle) {
                    tracing::warn!(%topic, error = %e, "unsubscribe failed");
                }
                report.unsubscribed.push(topic);
            }
        }

        for topic in desired {
            if !self.live.contains_key(&topic) && self.subscribe(transport, topic) {
                report.subscribed.push(topic);
            }
        }

        report
    }

    /// Make sure the topic carrying `channel` is subscribed.
    ///
    /// Returns `true` if a live subscription exists afterwards.
    pub fn ensure<T: Transport>(
        &mut self,
        transport: &mut T,
        channel: ChannelId,
        local_user: UserId,
    ) -> bool {
        let topic = channel.topic(local_user);
        if self.live.contains_key(&topic) {
            return true;
        }
        transport.is_connected() && self.subscribe(transport, topic)
    }

    fn subscribe<T: Transport>(&mut self, transport: &mut T, topic: Topic) -> bool {
        match transport.subscribe(topic) {
            Ok(handle) => {
                tracing::debug!(%topic, ?handle, "subscribed");
                self.live.insert(topic, handle);
                self.origins.insert(handle, topic);
                true
            },
            Err(e) => {
                tracing::warn!(%topic, error = %e, "subscribe failed");
                false
            },
        }
    }

    /// Topic a delivery on `handle` originated from.
    pub fn origin(&self, handle: SubscriptionId) -> Option<Topic> {
        self.origins.get(&handle).copied()
    }

    /// Whether `topic` has a live subscription.
    pub fn is_live(&self, topic: Topic) -> bool {
        self.live.contains_key(&topic)
    }

    /// All topics with a live subscription.
    pub fn live_topics(&self) -> impl Iterator<Item = Topic> + '_ {
        self.live.keys().copied()
    }

    /// Forget every handle without talking to the transport.
    ///
    /// Called when the connection drops: the server has already discarded
    /// the subscriptions.
    pub fn reset(&mut self) {
        self.live.clear();
        self.origins.clear();
    }

    /// Unsubscribe every live topic and forget all handles.
    pub fn unsubscribe_all<T: Transport>(&mut self, transport: &mut T) {
        if transport.is_connected() {
            for (topic, handle) in &self.live {
                if let Err(e) = transport.unsubscribe(*handle) {
                    tracing::warn!(%topic, error = %e, "unsubscribe failed");
                }
            }
        }
        self.reset();
    }
}

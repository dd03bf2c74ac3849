//! Recording in-memory transport.
//!
//! `SimTransport` implements [`Transport`] without a network. Every call the
//! engine makes is recorded so tests can assert on exact subscribe,
//! unsubscribe, and send traffic, and inbound payloads are produced with
//! [`SimTransport::deliver`] using whatever handle is live for a topic.

use std::collections::BTreeMap;

use parley_core::{Delivery, SubscriptionId, SyncEvent, Topic, Transport, TransportError};

/// One call made against the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    /// `subscribe(topic)` returned `handle`.
    Subscribe(Topic, SubscriptionId),
    /// `unsubscribe(handle)`.
    Unsubscribe(SubscriptionId),
    /// `send(destination, body)`.
    Send {
        /// STOMP destination.
        destination: String,
        /// JSON body.
        body: String,
    },
    /// `close()`.
    Close,
}

/// In-memory transport for deterministic tests.
#[derive(Debug, Default)]
pub struct SimTransport {
    connected: bool,
    next_handle: u64,
    live: BTreeMap<SubscriptionId, Topic>,
    calls: Vec<TransportCall>,
    fail_sends: bool,
    fail_subscribes: bool,
}

impl SimTransport {
    /// Create a disconnected transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport that is already connected.
    pub fn connected() -> Self {
        Self { connected: true, ..Self::default() }
    }

    /// Make subsequent sends fail.
    pub fn fail_sends(&mut self, fail: bool) {
        self.fail_sends = fail;
    }

    /// Make subsequent subscribes fail.
    pub fn fail_subscribes(&mut self, fail: bool) {
        self.fail_subscribes = fail;
    }

    /// Simulate the server dropping the connection.
    ///
    /// All handles are invalidated. Returns the event the runtime would
    /// forward to the engine.
    pub fn drop_connection(&mut self, reason: &str) -> SyncEvent {
        self.connected = false;
        self.live.clear();
        SyncEvent::Disconnected { reason: reason.to_owned() }
    }

    /// Re-establish a dropped connection with no live subscriptions.
    pub fn reopen(&mut self) {
        self.connected = true;
    }

    /// Live handle for `topic`, if subscribed.
    pub fn handle_for(&self, topic: Topic) -> Option<SubscriptionId> {
        self.live.iter().find(|(_, t)| **t == topic).map(|(handle, _)| *handle)
    }

    /// Topics with a live subscription, in handle order.
    pub fn live_topics(&self) -> Vec<Topic> {
        self.live.values().copied().collect()
    }

    /// Build the delivery event for `body` published on `topic`.
    ///
    /// Returns `None` if nothing is subscribed to `topic`, mirroring a
    /// broker that drops messages without subscribers.
    pub fn deliver(&self, topic: Topic, body: impl Into<String>) -> Option<SyncEvent> {
        let subscription = self.handle_for(topic)?;
        Some(SyncEvent::Delivered(Delivery { subscription, body: body.into() }))
    }

    /// Every call recorded so far.
    pub fn calls(&self) -> &[TransportCall] {
        &self.calls
    }

    /// Drain recorded calls.
    pub fn take_calls(&mut self) -> Vec<TransportCall> {
        std::mem::take(&mut self.calls)
    }

    /// `(destination, body)` of every send.
    pub fn sent(&self) -> Vec<(&str, &str)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                TransportCall::Send { destination, body } => {
                    Some((destination.as_str(), body.as_str()))
                },
                _ => None,
            })
            .collect()
    }
}

impl Transport for SimTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn subscribe(&mut self, topic: Topic) -> Result<SubscriptionId, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        if self.fail_subscribes {
            return Err(TransportError::Rejected(format!("subscribe to {topic} refused")));
        }

        let handle = SubscriptionId(self.next_handle);
        self.next_handle += 1;
        self.live.insert(handle, topic);
        self.calls.push(TransportCall::Subscribe(topic, handle));
        tracing::trace!(%topic, ?handle, "sim subscribe");
        Ok(handle)
    }

    fn unsubscribe(&mut self, handle: SubscriptionId) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.live.remove(&handle);
        self.calls.push(TransportCall::Unsubscribe(handle));
        Ok(())
    }

    fn send(&mut self, destination: &str, body: String) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        if self.fail_sends {
            return Err(TransportError::Io("simulated send failure".into()));
        }
        self.calls.push(TransportCall::Send { destination: destination.to_owned(), body });
        Ok(())
    }

    fn close(&mut self) {
        if self.connected {
            self.calls.push(TransportCall::Close);
        }
        self.connected = false;
        self.live.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique_across_reconnects() {
        let mut transport = SimTransport::connected();
        let first = transport.subscribe(Topic::Room(1)).unwrap();

        transport.drop_connection("reset");
        transport.reopen();
        let second = transport.subscribe(Topic::Room(1)).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn deliver_requires_live_subscription() {
        let mut transport = SimTransport::connected();
        assert!(transport.deliver(Topic::Room(1), "{}").is_none());

        let handle = transport.subscribe(Topic::Room(1)).unwrap();
        match transport.deliver(Topic::Room(1), "{}") {
            Some(SyncEvent::Delivered(delivery)) => assert_eq!(delivery.subscription, handle),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn disconnected_transport_rejects_calls() {
        let mut transport = SimTransport::new();
        assert_eq!(transport.subscribe(Topic::Room(1)), Err(TransportError::NotConnected));
        assert_eq!(transport.send("/app/chat.send", "{}".into()), Err(TransportError::NotConnected));
        assert!(transport.calls().is_empty());
    }
}

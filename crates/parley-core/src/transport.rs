//! Publish/subscribe transport capability.
//!
//! The engine treats the transport as an opaque capability: it subscribes to
//! topics, unsubscribes by handle, and sends text payloads. Connection
//! handshakes and frame I/O belong to the implementation.
//!
//! Inbound traffic does not flow through this trait. Implementations hand
//! [`TransportEvent`]s to the runtime, which feeds them to the engine as
//! [`crate::SyncEvent`]s.

use std::future::Future;

use crate::{channel::Topic, error::TransportError};

/// Handle identifying one live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// A payload delivered on a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Subscription the payload arrived on.
    pub subscription: SubscriptionId,
    /// Raw payload body.
    pub body: String,
}

/// Connection-level notifications from a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake completed.
    Connected,
    /// Connection lost. All subscription handles are invalid.
    Disconnected {
        /// Why the connection ended.
        reason: String,
    },
    /// Payload delivered on a subscription.
    Delivery(Delivery),
}

/// Publish/subscribe session.
///
/// Delivery order is guaranteed per topic only.
///
/// # Invariants
///
/// - Handles returned by `subscribe` are unique for the lifetime of the
///   transport, across reconnects.
/// - After a disconnect no handle from the previous connection delivers again.
pub trait Transport: Send {
    /// Establish the connection and authenticate.
    ///
    /// Completion is also reported as [`TransportEvent::Connected`].
    fn connect(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Whether the connection is currently established.
    fn is_connected(&self) -> bool;

    /// Subscribe to `topic`.
    fn subscribe(&mut self, topic: Topic) -> Result<SubscriptionId, TransportError>;

    /// Cancel a subscription.
    fn unsubscribe(&mut self, handle: SubscriptionId) -> Result<(), TransportError>;

    /// Send a text payload to `destination`.
    fn send(&mut self, destination: &str, body: String) -> Result<(), TransportError>;

    /// Close the connection. Idempotent.
    fn close(&mut self);
}

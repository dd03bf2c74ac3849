//! Engine input events.
//!
//! This module defines [`SyncEvent`], the inputs that drive the
//! [`crate::SyncEngine`] state machine apart from direct user intents.
//!
//! Events originate from three sources:
//! - The transport (connect, disconnect, deliveries).
//! - Completed REST fetches, tagged with the ticket they were issued with.
//! - Timers and the UI layer (poll interval, visibility).

use crate::{
    channel::Channel,
    error::FetchError,
    message::InboundMessage,
    poll::PollTicket,
    session::HistoryTicket,
    transport::{Delivery, TransportEvent},
};

/// Events processed by the engine.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Transport handshake completed.
    Connected,

    /// Transport connection lost.
    Disconnected {
        /// Why the connection ended.
        reason: String,
    },

    /// Payload delivered on a subscription.
    Delivered(Delivery),

    /// Registry poll interval elapsed.
    PollDue,

    /// Registry poll completed.
    ChannelsFetched {
        /// Ticket the poll was issued with.
        ticket: PollTicket,
        /// Channel list or failure.
        result: Result<Vec<Channel>, FetchError>,
    },

    /// History fetch completed.
    HistoryFetched {
        /// Ticket the fetch was issued with.
        ticket: HistoryTicket,
        /// Messages oldest first, or failure.
        result: Result<Vec<InboundMessage>, FetchError>,
    },

    /// Application visibility changed.
    VisibilityChanged {
        /// Whether the user can currently see the active channel.
        visible: bool,
    },
}

impl From<TransportEvent> for SyncEvent {
    fn from(event: TransportEvent) -> Self {
        match event {
            TransportEvent::Connected => Self::Connected,
            TransportEvent::Disconnected { reason } => Self::Disconnected { reason },
            TransportEvent::Delivery(delivery) => Self::Delivered(delivery),
        }
    }
}

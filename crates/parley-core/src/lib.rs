//! Client-side synchronization engine for Parley
//!
//! Keeps a chat client's view of rooms, direct conversations, unread badges,
//! and the visible transcript consistent with an asynchronous publish/subscribe
//! stream, and reconciles optimistically rendered sends with their server
//! echo.
//!
//! Everything here is Sans-IO: no sockets, no HTTP, no timers. The same code
//! runs in the production client and in deterministic simulation.
//!
//! # Components
//!
//! - [`ChannelRegistry`]: known channels and unread counters
//! - [`SubscriptionManager`]: one live subscription per needed topic
//! - [`EchoSuppressor`]: pending echoes of the user's own sends
//! - [`MessageRouter`]: suppress, display, or count each inbound message
//! - [`ActiveChannelSession`]: selected channel, transcript, stale-fetch guard
//! - [`SyncEngine`]: the session object composing all of the above

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod auth;
mod channel;
mod echo;
mod engine;
mod env;
mod error;
mod event;
mod message;
mod poll;
mod registry;
mod router;
mod session;
mod subscription;
mod transport;

pub use action::SyncAction;
pub use auth::AuthContext;
pub use channel::{
    Channel, ChannelId, ChannelKind, Presence, RoomId, RoomSummary, SEND_DESTINATION, Topic,
    UserId, channel_list,
};
pub use echo::{ECHO_TTL, EchoSuppressor};
pub use engine::SyncEngine;
pub use env::Clock;
pub use error::{FetchError, MalformedMessage, SyncError, TransportError};
pub use event::SyncEvent;
pub use message::{ChatMessage, InboundMessage, OutboundMessage};
pub use poll::{PollGuard, PollTicket};
pub use registry::ChannelRegistry;
pub use router::{Focus, MessageRouter, Route};
pub use session::{ActiveChannelSession, HistoryTicket};
pub use subscription::{Reconciliation, SubscriptionManager};
pub use transport::{Delivery, SubscriptionId, Transport, TransportEvent};

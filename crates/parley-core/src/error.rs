//! Error types for the synchronization engine.
//!
//! Strongly-typed errors for each failure class: rejected user intents
//! ([`SyncError`]), transport capability failures ([`TransportError`]), REST
//! collaborator failures ([`FetchError`]), and inbound payloads that cannot be
//! resolved to a channel ([`MalformedMessage`]).
//!
//! None of these are fatal. Fetch and transport failures are logged and leave
//! state unchanged; malformed payloads are dropped.

use thiserror::Error;

use crate::channel::{ChannelId, Topic};

/// Errors returned when a user intent cannot be carried out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Sending requires a selected channel.
    #[error("no active channel selected")]
    NoActiveChannel,

    /// Channel is not in the registry.
    #[error("unknown channel {0}")]
    UnknownChannel(ChannelId),

    /// Message content is empty or whitespace.
    #[error("message is empty")]
    EmptyMessage,

    /// Transport is not connected.
    #[error("not connected")]
    NotConnected,

    /// Outbound payload could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),
}

/// Errors raised by the publish/subscribe transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Operation requires a live connection.
    #[error("transport not connected")]
    NotConnected,

    /// Connection was closed.
    #[error("connection closed: {0}")]
    Closed(String),

    /// Server rejected the connection or a frame.
    #[error("rejected by server: {0}")]
    Rejected(String),

    /// Underlying I/O failure.
    #[error("i/o error: {0}")]
    Io(String),
}

impl TransportError {
    /// Returns true if reconnecting may succeed.
    ///
    /// Rejections indicate bad credentials or a protocol violation and are
    /// never transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Closed(_) | Self::Io(_))
    }
}

/// Errors raised by the REST collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Server answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(u16),

    /// Request did not complete.
    #[error("network error: {0}")]
    Network(String),

    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Reasons an inbound payload is dropped before routing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedMessage {
    /// Delivery arrived on a subscription that is no longer live.
    #[error("no live subscription for delivery")]
    UnknownSubscription,

    /// Payload is not a valid inbound message.
    #[error("invalid payload: {0}")]
    Decode(String),

    /// Both `roomId` and `receiverId` are set.
    #[error("both roomId and receiverId present")]
    AmbiguousChannel,

    /// Neither `roomId` nor `receiverId` is set.
    #[error("neither roomId nor receiverId present")]
    MissingChannel,

    /// Direct message neither sent by nor addressed to the local user.
    #[error("direct message not addressed to local user")]
    NotAddressedToUs,

    /// Payload's channel does not belong on the topic it arrived on.
    #[error("payload for {channel} delivered on {origin}")]
    OriginMismatch {
        /// Topic the payload arrived on.
        origin: Topic,
        /// Channel the payload names.
        channel: ChannelId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_and_close_are_transient() {
        assert!(TransportError::Closed("eof".into()).is_transient());
        assert!(TransportError::Io("reset".into()).is_transient());
        assert!(!TransportError::Rejected("bad token".into()).is_transient());
        assert!(!TransportError::NotConnected.is_transient());
    }

    #[test]
    fn origin_mismatch_display() {
        let err = MalformedMessage::OriginMismatch {
            origin: Topic::Room(5),
            channel: ChannelId::Room(6),
        };
        assert_eq!(err.to_string(), "payload for room:6 delivered on /topic/room.5");
    }
}

//! Wire messages and transcript entries.
//!
//! Inbound payloads name their channel through exactly one of `roomId` or
//! `receiverId`. The channel is resolved once, at parse time, into a
//! [`ChannelId`]; payloads with both or neither field are rejected rather than
//! guessed at.

use std::borrow::Cow;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    auth::AuthContext,
    channel::{ChannelId, RoomId, Topic, UserId},
    error::MalformedMessage,
};

/// Message as broadcast by the server and returned by history endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    /// Server-assigned message ID.
    #[serde(default)]
    pub id: Option<i64>,
    /// Room the message was posted to.
    #[serde(default)]
    pub room_id: Option<RoomId>,
    /// Recipient of a direct message.
    #[serde(default)]
    pub receiver_id: Option<UserId>,
    /// Author.
    pub sender_id: UserId,
    /// Author's username, if the server included it.
    #[serde(default)]
    pub sender_username: Option<String>,
    /// Message body.
    pub content: String,
    /// Server timestamp.
    #[serde(deserialize_with = "timestamp_text")]
    pub timestamp: String,
}

impl InboundMessage {
    /// Decode a JSON payload.
    pub fn from_json(body: &str) -> Result<Self, MalformedMessage> {
        serde_json::from_str(body).map_err(|e| MalformedMessage::Decode(e.to_string()))
    }

    /// Channel this message belongs to, from `local_user`'s point of view.
    ///
    /// Direct messages are keyed by the other participant: the receiver when
    /// the local user sent it, the sender otherwise.
    pub fn channel(&self, local_user: UserId) -> Result<ChannelId, MalformedMessage> {
        match (self.room_id, self.receiver_id) {
            (Some(_), Some(_)) => Err(MalformedMessage::AmbiguousChannel),
            (None, None) => Err(MalformedMessage::MissingChannel),
            (Some(room_id), None) => Ok(ChannelId::Room(room_id)),
            (None, Some(receiver)) if self.sender_id == local_user => {
                Ok(ChannelId::Direct(receiver))
            },
            (None, Some(receiver)) if receiver == local_user => {
                Ok(ChannelId::Direct(self.sender_id))
            },
            (None, Some(_)) => Err(MalformedMessage::NotAddressedToUs),
        }
    }

    /// Resolve the channel and check it belongs on the topic it arrived on.
    pub fn resolve(&self, origin: Topic, local_user: UserId) -> Result<ChannelId, MalformedMessage> {
        let channel = self.channel(local_user)?;
        if channel.topic(local_user) != origin {
            return Err(MalformedMessage::OriginMismatch { origin, channel });
        }
        Ok(channel)
    }
}

/// Servers disagree on how instants are serialized: accept ISO-8601 text or
/// a bare epoch number and keep it as text.
fn timestamp_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

/// Message sent to [`crate::SEND_DESTINATION`].
///
/// Exactly one of `room_id` and `receiver_id` is set; the other serializes as
/// `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    /// Target room.
    pub room_id: Option<RoomId>,
    /// Target peer.
    pub receiver_id: Option<UserId>,
    /// Local user.
    pub sender_id: UserId,
    /// Message body.
    pub content: String,
}

impl OutboundMessage {
    /// Address `content` to `channel`.
    pub fn new(channel: ChannelId, sender_id: UserId, content: impl Into<String>) -> Self {
        let (room_id, receiver_id) = match channel {
            ChannelId::Room(id) => (Some(id), None),
            ChannelId::Direct(peer) => (None, Some(peer)),
        };
        Self { room_id, receiver_id, sender_id, content: content.into() }
    }

    /// JSON encoding for the transport.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Entry in the rendered transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Server ID. `None` for optimistic entries.
    pub id: Option<i64>,
    /// Author.
    pub sender_id: UserId,
    /// Author's username, if known.
    pub sender_username: Option<String>,
    /// Message body.
    pub content: String,
    /// Server timestamp, or local time for optimistic entries.
    pub timestamp: String,
    /// Rendered optimistically before server confirmation.
    pub local: bool,
}

impl ChatMessage {
    /// Optimistic entry for a message the local user just sent.
    pub fn local(auth: &AuthContext, content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            sender_id: auth.user_id,
            sender_username: Some(auth.username.clone()),
            content: content.into(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            local: true,
        }
    }

    /// Name to show next to the message.
    pub fn sender_label(&self) -> Cow<'_, str> {
        match &self.sender_username {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!("User {}", self.sender_id)),
        }
    }
}

impl From<InboundMessage> for ChatMessage {
    fn from(message: InboundMessage) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            sender_username: message.sender_username,
            content: message.content,
            timestamp: message.timestamp,
            local: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn direct(sender: UserId, receiver: UserId) -> InboundMessage {
        InboundMessage {
            id: None,
            room_id: None,
            receiver_id: Some(receiver),
            sender_id: sender,
            sender_username: None,
            content: "hi".into(),
            timestamp: "2024-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn decodes_server_payload() {
        let body = r#"{"id":9,"senderId":3,"senderUsername":"carol","receiverId":null,
            "roomId":5,"content":"hey","timestamp":"2024-05-01T10:00:00Z"}"#;

        let message = InboundMessage::from_json(body).unwrap();

        assert_eq!(message.room_id, Some(5));
        assert_eq!(message.receiver_id, None);
        assert_eq!(message.channel(7), Ok(ChannelId::Room(5)));
    }

    #[test]
    fn numeric_timestamp_is_kept_as_text() {
        let body = r#"{"senderId":3,"roomId":5,"content":"hey","timestamp":1714557600.5}"#;
        let message = InboundMessage::from_json(body).unwrap();
        assert_eq!(message.timestamp, "1714557600.5");
    }

    #[test]
    fn both_or_neither_ids_are_malformed() {
        let mut message = direct(3, 7);
        message.room_id = Some(5);
        assert_eq!(message.channel(7), Err(MalformedMessage::AmbiguousChannel));

        message.room_id = None;
        message.receiver_id = None;
        assert_eq!(message.channel(7), Err(MalformedMessage::MissingChannel));
    }

    #[test]
    fn direct_channel_is_keyed_by_peer() {
        assert_eq!(direct(7, 42).channel(7), Ok(ChannelId::Direct(42)));
        assert_eq!(direct(42, 7).channel(7), Ok(ChannelId::Direct(42)));
        assert_eq!(direct(42, 43).channel(7), Err(MalformedMessage::NotAddressedToUs));
    }

    #[test]
    fn resolve_rejects_wrong_topic() {
        let mut message = direct(3, 7);
        message.receiver_id = None;
        message.room_id = Some(6);

        assert_eq!(message.resolve(Topic::Room(6), 7), Ok(ChannelId::Room(6)));
        assert_eq!(
            message.resolve(Topic::Room(5), 7),
            Err(MalformedMessage::OriginMismatch { origin: Topic::Room(5), channel: ChannelId::Room(6) })
        );
        assert!(message.resolve(Topic::UserQueue(7), 7).is_err());
    }

    #[test]
    fn outbound_sets_exactly_one_target() {
        let json = OutboundMessage::new(ChannelId::Direct(42), 7, "hello").to_json().unwrap();
        assert_eq!(json, r#"{"roomId":null,"receiverId":42,"senderId":7,"content":"hello"}"#);

        let json = OutboundMessage::new(ChannelId::Room(5), 7, "hello").to_json().unwrap();
        assert_eq!(json, r#"{"roomId":5,"receiverId":null,"senderId":7,"content":"hello"}"#);
    }

    #[test]
    fn local_entry_uses_wall_clock() {
        let auth = AuthContext::new(7, "alice", "t");
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();

        let message = ChatMessage::local(&auth, "hello", at);

        assert!(message.local);
        assert_eq!(message.timestamp, "2024-05-01T10:00:00.000Z");
        assert_eq!(message.sender_label(), "alice");
    }
}

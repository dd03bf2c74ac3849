//! Channel identity and the server-side sources it is built from.
//!
//! Rooms and direct conversations share one [`ChannelId`] so that
//! subscription, unread tracking, and history work the same way for both.
//! The only place the two kinds differ is topic naming: every room has its
//! own topic, while all direct conversations arrive on the local user's
//! personal queue.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned user ID.
pub type UserId = i64;

/// Server-assigned room ID.
pub type RoomId = i64;

/// Destination for every outbound chat message.
pub const SEND_DESTINATION: &str = "/app/chat.send";

/// Kind of conversation a channel represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelKind {
    /// Multi-user room.
    Room,
    /// One-to-one conversation with a peer.
    Direct,
}

/// Channel identity: `(kind, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelId {
    /// Room with the given ID.
    Room(RoomId),
    /// Direct conversation with the given peer.
    Direct(UserId),
}

impl ChannelId {
    /// Kind of this channel.
    pub fn kind(self) -> ChannelKind {
        match self {
            Self::Room(_) => ChannelKind::Room,
            Self::Direct(_) => ChannelKind::Direct,
        }
    }

    /// Topic on which messages for this channel are delivered to `local_user`.
    pub fn topic(self, local_user: UserId) -> Topic {
        match self {
            Self::Room(room_id) => Topic::Room(room_id),
            Self::Direct(_) => Topic::UserQueue(local_user),
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Room(id) => write!(f, "room:{id}"),
            Self::Direct(id) => write!(f, "direct:{id}"),
        }
    }
}

/// Publish/subscribe topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    /// Broadcast topic of a single room.
    Room(RoomId),
    /// Personal queue carrying direct messages in both directions.
    UserQueue(UserId),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Room(id) => write!(f, "/topic/room.{id}"),
            Self::UserQueue(id) => write!(f, "/queue/user.{id}"),
        }
    }
}

/// A known channel as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// Channel identity.
    pub id: ChannelId,
    /// Name shown in the channel list.
    pub display_name: String,
    /// Peer presence. `None` for rooms.
    pub online: Option<bool>,
}

impl Channel {
    /// A room channel.
    pub fn room(id: RoomId, name: impl Into<String>) -> Self {
        Self { id: ChannelId::Room(id), display_name: name.into(), online: None }
    }

    /// A direct channel with a peer.
    pub fn direct(peer: UserId, username: impl Into<String>, online: bool) -> Self {
        Self { id: ChannelId::Direct(peer), display_name: username.into(), online: Some(online) }
    }
}

/// Room entry returned by the room listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    /// Room ID.
    pub id: RoomId,
    /// Room name.
    pub name: String,
}

/// Presence entry returned by the presence endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    /// User ID.
    pub id: UserId,
    /// Username.
    pub username: String,
    /// Whether the user currently holds a live connection.
    pub online: bool,
}

/// Build the authoritative channel list from one registry poll.
///
/// Rooms come first in server order, followed by one direct channel per
/// presence entry. The local user never appears as a direct peer.
pub fn channel_list(rooms: Vec<RoomSummary>, presence: Vec<Presence>, local_user: UserId) -> Vec<Channel> {
    let rooms = rooms.into_iter().map(|room| Channel::room(room.id, room.name));
    let peers = presence
        .into_iter()
        .filter(|user| user.id != local_user)
        .map(|user| Channel::direct(user.id, user.username, user.online));
    rooms.chain(peers).collect()
}

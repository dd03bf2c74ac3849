//! Builders for server-shaped JSON payloads.

use parley_core::{RoomId, UserId};
use serde_json::{Value, json};

const TIMESTAMP: &str = "2024-01-01T00:00:00";

/// Username the builders attach to a sender.
pub fn username_of(user: UserId) -> String {
    format!("user{user}")
}

/// Broadcast of a room message, as published on `/topic/room.{room}`.
pub fn room_message(id: i64, room: RoomId, sender: UserId, content: &str) -> String {
    json!({
        "id": id,
        "roomId": room,
        "receiverId": Value::Null,
        "senderId": sender,
        "senderUsername": username_of(sender),
        "content": content,
        "timestamp": TIMESTAMP,
    })
    .to_string()
}

/// Direct message from `sender` to `receiver`, as published on both users'
/// queues.
pub fn direct_message(id: i64, sender: UserId, receiver: UserId, content: &str) -> String {
    json!({
        "id": id,
        "roomId": Value::Null,
        "receiverId": receiver,
        "senderId": sender,
        "senderUsername": username_of(sender),
        "content": content,
        "timestamp": TIMESTAMP,
    })
    .to_string()
}

/// Payload naming both a room and a receiver.
pub fn ambiguous_message(id: i64, room: RoomId, receiver: UserId, sender: UserId) -> String {
    json!({
        "id": id,
        "roomId": room,
        "receiverId": receiver,
        "senderId": sender,
        "content": "?",
        "timestamp": TIMESTAMP,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use parley_core::{ChannelId, InboundMessage};

    use super::*;

    #[test]
    fn builders_produce_decodable_payloads() {
        let room = InboundMessage::from_json(&room_message(1, 5, 9, "hi")).unwrap();
        assert_eq!(room.channel(7), Ok(ChannelId::Room(5)));

        let direct = InboundMessage::from_json(&direct_message(2, 9, 7, "hey")).unwrap();
        assert_eq!(direct.channel(7), Ok(ChannelId::Direct(9)));
        assert_eq!(direct.sender_username.as_deref(), Some("user9"));
    }
}

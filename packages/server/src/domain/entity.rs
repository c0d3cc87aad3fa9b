//! Core domain models for the messaging core.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{
    error::ValueObjectError,
    value_object::{ChatId, IdentityId, MessageBody, RoomName, Timestamp, Username},
};

/// Broadcast destination a connection subscribes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Topic {
    /// Public room, addressable by name and created on first reference
    Room(RoomName),
    /// Private chat, created by the surrounding application before use
    Private(ChatId),
}

/// Discriminant of [`Topic`], used to pick wire formats and resolution policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicKind {
    Room,
    Private,
}

impl Topic {
    /// Build a room topic from the room segment of a route.
    pub fn room_from_route(raw: &str) -> Result<Self, ValueObjectError> {
        RoomName::new(raw.to_string()).map(Topic::Room)
    }

    /// Build a private topic from the chat id segment of a route.
    pub fn private_from_route(raw: &str) -> Result<Self, ValueObjectError> {
        ChatId::parse(raw).map(Topic::Private)
    }

    pub fn kind(&self) -> TopicKind {
        match self {
            Topic::Room(_) => TopicKind::Room,
            Topic::Private(_) => TopicKind::Private,
        }
    }

    /// Group name used in logs and diagnostics (`chat_<room>` / `private_chat_<id>`).
    pub fn group_name(&self) -> String {
        match self {
            Topic::Room(name) => format!("chat_{name}"),
            Topic::Private(chat_id) => format!("private_chat_{chat_id}"),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.group_name())
    }
}

/// A resolved user reference used to attribute messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Directory-assigned identifier
    pub id: IdentityId,
    /// Canonical username
    pub username: Username,
}

impl Identity {
    pub fn new(id: IdentityId, username: Username) -> Self {
        Self { id, username }
    }
}

/// A message as recorded by the persistence gateway.
///
/// Immutable once created. `id` increases with persistence order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Store-assigned sequence number
    pub id: u64,
    /// Topic the message was published to
    pub topic: Topic,
    /// Sender identity
    pub author: Identity,
    /// Message body as sent
    pub body: MessageBody,
    /// Server-assigned persistence time
    pub created_at: Timestamp,
}

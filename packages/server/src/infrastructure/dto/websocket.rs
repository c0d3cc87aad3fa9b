//! WebSocket frame DTOs.
//!
//! Rooms and private chats use different field names on the wire; both are
//! mapped onto [`InboundMessage`] before they reach the use cases.

use serde::{Deserialize, Serialize};

use crate::domain::{StoredMessage, TopicKind};

/// Message type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    ChatMessage,
    PrivateMessage,
    Rejected,
}

/// Room frame sent by clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInboundFrame {
    pub username: String,
    pub message: String,
}

/// Private chat frame sent by clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateInboundFrame {
    pub sender: String,
    pub content: String,
}

/// Room message broadcast to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomChatMessage {
    pub r#type: MessageType,
    pub username: String,
    pub message: String,
    /// `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
}

/// Private chat message broadcast to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateChatMessage {
    pub r#type: MessageType,
    pub sender: String,
    pub content: String,
    /// `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
}

/// Why an inbound frame was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    EmptyBody,
    BodyTooLong,
    MalformedFrame,
    InvalidSender,
    UnknownSender,
}

/// Rejection notice sent back to the offending connection only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedMessage {
    pub r#type: MessageType,
    pub reason: RejectionReason,
    pub detail: String,
}

impl RejectedMessage {
    pub fn new(reason: RejectionReason, detail: impl Into<String>) -> Self {
        Self {
            r#type: MessageType::Rejected,
            reason,
            detail: detail.into(),
        }
    }
}

/// Topic-independent view of an inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender: String,
    pub body: String,
}

impl InboundMessage {
    /// Parse a text frame using the field names of the topic kind.
    pub fn parse(kind: TopicKind, text: &str) -> Result<Self, serde_json::Error> {
        match kind {
            TopicKind::Room => {
                let frame: RoomInboundFrame = serde_json::from_str(text)?;
                Ok(Self {
                    sender: frame.username,
                    body: frame.message,
                })
            }
            TopicKind::Private => {
                let frame: PrivateInboundFrame = serde_json::from_str(text)?;
                Ok(Self {
                    sender: frame.sender,
                    body: frame.content,
                })
            }
        }
    }
}

/// Serialize a persisted message into the outbound frame of its topic kind.
///
/// The sender is echoed as the author's canonical username.
pub fn encode_outbound(message: &StoredMessage) -> Result<String, serde_json::Error> {
    let sender = message.author.username.as_str().to_string();
    let body = message.body.as_str().to_string();
    let timestamp = message.created_at.to_wire_string();

    match message.topic.kind() {
        TopicKind::Room => serde_json::to_string(&RoomChatMessage {
            r#type: MessageType::ChatMessage,
            username: sender,
            message: body,
            timestamp,
        }),
        TopicKind::Private => serde_json::to_string(&PrivateChatMessage {
            r#type: MessageType::PrivateMessage,
            sender,
            content: body,
            timestamp,
        }),
    }
}

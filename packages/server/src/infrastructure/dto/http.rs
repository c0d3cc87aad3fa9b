//! HTTP API request and response DTOs.

use serde::{Deserialize, Serialize};

/// Active topic entry for the topic list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicSummaryDto {
    /// Group name (`chat_<room>` / `private_chat_<id>`)
    pub topic: String,
    /// `room` or `private`
    pub kind: String,
    pub subscribers: usize,
    /// When the longest-connected subscriber joined (`YYYY-MM-DD HH:MM:SS`)
    pub active_since: String,
}

/// Identity as exposed over HTTP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityDto {
    pub id: u64,
    pub username: String,
}

/// Body of `POST /api/users`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
}

/// Body of `POST /api/private-chats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenPrivateChatRequest {
    pub initiator: String,
    pub target: String,
}

/// Response of `POST /api/private-chats`, element of `GET /api/private-chats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateChatDto {
    pub chat_id: u64,
}

/// Response of `DELETE /api/private-chats/{chat_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedPrivateChatDto {
    pub chat_id: u64,
    pub closed_sessions: usize,
    pub deleted_messages: usize,
}

/// One entry of a message history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageHistoryItemDto {
    pub id: u64,
    pub sender: String,
    pub body: String,
    pub created_at: String, // YYYY-MM-DD HH:MM:SS
}

/// Query string of private chat endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ViewerQuery {
    pub username: Option<String>,
}

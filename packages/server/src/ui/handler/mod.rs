//! Handler modules for HTTP and WebSocket endpoints.

pub mod http;
pub mod websocket;

// Re-export HTTP handlers
pub use http::{
    create_user, delete_private_chat, health_check, list_private_chats, list_topics,
    open_private_chat, private_chat_history, room_history,
};

// Re-export WebSocket handlers
pub use websocket::{private_websocket_handler, room_websocket_handler};

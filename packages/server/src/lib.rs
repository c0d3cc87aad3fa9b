//! Plaza: real-time room and private chat over WebSocket.
//!
//! Clients subscribe to a topic (a public room or a private chat) by opening
//! a WebSocket. Every accepted message is persisted first and then fanned out
//! to all connections subscribed to the same topic.

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod registry;
pub mod ui;
pub mod usecase;

// Re-export entry points
pub use config::ServerConfig;
pub use ui::run as run_server;

//! UI layer: Axum routes, handlers and shared state.

pub mod handler;
mod runner;
mod signal;
pub mod state;

pub use runner::{run, serve};

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use self::{handler::*, state::AppState};

/// Build the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws/chat/{room_name}", get(room_websocket_handler))
        .route("/ws/chat/{room_name}/", get(room_websocket_handler))
        .route("/ws/private/{chat_id}", get(private_websocket_handler))
        .route("/ws/private/{chat_id}/", get(private_websocket_handler))
        .route("/api/health", get(health_check))
        .route("/api/topics", get(list_topics))
        .route("/api/users", post(create_user))
        .route("/api/rooms/{room_name}/messages", get(room_history))
        .route(
            "/api/private-chats",
            get(list_private_chats).post(open_private_chat),
        )
        .route("/api/private-chats/{chat_id}", delete(delete_private_chat))
        .route(
            "/api/private-chats/{chat_id}/messages",
            get(private_chat_history),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

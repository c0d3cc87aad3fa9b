//! Server entry point.

use std::{future::Future, sync::Arc};

use tokio::net::TcpListener;

use crate::{config::ServerConfig, error::ServerError};

use super::{build_router, signal::shutdown_signal, state::AppState};

/// Run the chat server until Ctrl+C / SIGTERM.
///
/// # Errors
///
/// Returns an error if the address is invalid or the listener cannot be bound.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let addr = config.bind_addr()?;
    let state = Arc::new(AppState::in_memory(&config));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Chat server listening on {}", listener.local_addr()?);

    serve(listener, state, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
///
/// Connections still open at shutdown are dropped; their sessions unregister
/// as their sockets close.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Chat server stopped");
    Ok(())
}

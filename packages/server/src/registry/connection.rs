//! Live connection handles.

use std::sync::Arc;

use tokio::sync::{Notify, mpsc};

use crate::domain::{ConnectionId, Timestamp, Topic};

/// One live transport session as seen by the registry.
///
/// `outbound` feeds the connection's own send task, so a slow socket only
/// backs up its own queue.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub outbound: mpsc::UnboundedSender<String>,
    pub connected_at: Timestamp,
    close_requested: Arc<Notify>,
}

impl Connection {
    pub fn new(
        id: ConnectionId,
        outbound: mpsc::UnboundedSender<String>,
        connected_at: Timestamp,
    ) -> Self {
        Self {
            id,
            outbound,
            connected_at,
            close_requested: Arc::new(Notify::new()),
        }
    }

    /// Enqueue a payload for this connection.
    ///
    /// Returns `false` if the connection's send task is gone.
    pub fn deliver(&self, payload: String) -> bool {
        self.outbound.send(payload).is_ok()
    }

    /// Ask the transport to close this connection from the server side.
    ///
    /// The request is remembered until the transport waits for it.
    pub fn request_close(&self) {
        self.close_requested.notify_one();
    }

    /// Resolves once `request_close` has been called on any clone.
    pub async fn close_requested(&self) {
        self.close_requested.notified().await;
    }
}

/// Proof of a successful `register`, consumed by `unregister`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationHandle {
    connection_id: ConnectionId,
    topic: Topic,
}

impl RegistrationHandle {
    pub(super) fn new(connection_id: ConnectionId, topic: Topic) -> Self {
        Self {
            connection_id,
            topic,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }
}

//! Test fixtures: an in-process server on an ephemeral port.

#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use plaza_server::{
    ServerConfig,
    domain::{IdentityResolver, Topic, Username},
    infrastructure::repository::{
        InMemoryIdentityDirectory, InMemoryMessageStore, InMemoryPrivateChatRepository,
    },
    ui::{serve, state::AppState},
};
use tokio::{net::TcpStream, sync::oneshot};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream,
    tungstenite::{Message, protocol::frame::coding::CloseCode},
};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Test server bound to `127.0.0.1:0`, stopped on drop.
pub struct TestServer {
    pub addr: std::net::SocketAddr,
    pub state: Arc<AppState>,
    pub identities: Arc<InMemoryIdentityDirectory>,
    pub messages: Arc<InMemoryMessageStore>,
    pub private_chats: Arc<InMemoryPrivateChatRepository>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(ServerConfig::default()).await
    }

    pub async fn start_with(config: ServerConfig) -> Self {
        let identities = Arc::new(InMemoryIdentityDirectory::new());
        let messages = Arc::new(InMemoryMessageStore::new());
        let private_chats = Arc::new(InMemoryPrivateChatRepository::new());
        let state = Arc::new(AppState::new(
            identities.clone(),
            messages.clone(),
            private_chats.clone(),
            &config,
        ));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server_state = state.clone();
        tokio::spawn(async move {
            let _ = serve(listener, server_state, async {
                let _ = shutdown_rx.await;
            })
            .await;
        });

        Self {
            addr,
            state,
            identities,
            messages,
            private_chats,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    /// Register a user directly in the identity directory.
    pub async fn create_user(&self, name: &str) -> plaza_server::domain::Identity {
        self.identities
            .resolve_or_create(&Username::new(name.to_string()).unwrap())
            .await
            .unwrap()
    }

    /// Open a WebSocket and wait until the server has registered it.
    pub async fn connect(&self, path: &str, topic: &Topic) -> WsClient {
        let before = self.state.registry.subscriber_count(topic).await;
        let (ws, _) = tokio_tungstenite::connect_async(self.ws_url(path))
            .await
            .expect("Failed to connect");
        self.wait_for_subscribers(topic, before + 1).await;
        ws
    }

    /// Poll the registry until `topic` has exactly `expected` subscribers.
    ///
    /// For `0` this also waits until the emptied group has been dropped.
    pub async fn wait_for_subscribers(&self, topic: &Topic, expected: usize) {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        loop {
            let reached = if expected == 0 {
                self.state.registry.group(topic).await.is_none()
            } else {
                self.state.registry.subscriber_count(topic).await == expected
            };
            if reached {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "topic '{topic}' never reached {expected} subscriber(s)"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn send_json(ws: &mut WsClient, value: serde_json::Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("Failed to send frame");
}

/// Next text frame as JSON, failing after a short timeout.
pub async fn recv_json(ws: &mut WsClient) -> serde_json::Value {
    loop {
        let frame = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Stream ended")
            .expect("WebSocket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).expect("Frame is not JSON");
        }
    }
}

/// Assert that no text frame arrives within `wait`.
pub async fn assert_silent(ws: &mut WsClient, wait: Duration) {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        match tokio::time::timeout_at(deadline, ws.next()).await {
            Err(_) => return,
            Ok(Some(Ok(Message::Text(text)))) => panic!("Unexpected frame: {text}"),
            Ok(Some(Ok(_))) => continue,
            Ok(_) => return,
        }
    }
}

/// Wait for the server to close the socket.
pub async fn wait_closed(ws: &mut WsClient) {
    loop {
        match tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("Timed out waiting for close")
        {
            None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
            Some(Ok(_)) => continue,
        }
    }
}

/// Wait for the server's close frame and return its code and reason.
pub async fn recv_close(ws: &mut WsClient) -> (CloseCode, String) {
    loop {
        let frame = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("Timed out waiting for close")
            .expect("Stream ended without a close frame")
            .expect("WebSocket error");
        if let Message::Close(frame) = frame {
            let frame = frame.expect("Close frame without a code");
            return (frame.code, frame.reason.as_str().to_string());
        }
    }
}

/// HTTP status of a refused WebSocket handshake.
pub async fn handshake_status(url: &str) -> u16 {
    match tokio_tungstenite::connect_async(url).await {
        Ok(_) => panic!("Handshake unexpectedly succeeded: {url}"),
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => response.status().as_u16(),
        Err(e) => panic!("Unexpected handshake error: {e}"),
    }
}

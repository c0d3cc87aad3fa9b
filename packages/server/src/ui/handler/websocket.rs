//! WebSocket connection handlers.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        Path, Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitStream, StreamExt},
};
use tokio::sync::{mpsc, oneshot};

use crate::{
    domain::{ConnectionIdFactory, Timestamp, Topic, Username},
    registry::Connection,
    ui::state::{AppState, ConnectQuery},
    usecase::{ChatSession, ConnectError, FrameOutcome},
};

/// `GET /ws/chat/{room_name}`
pub async fn room_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(room_name): Path<String>,
    Query(query): Query<ConnectQuery>,
) -> Result<Response, StatusCode> {
    let topic = Topic::room_from_route(&room_name)
        .map_err(|e| reject(&ConnectError::InvalidRoute(e.to_string())))?;
    accept(ws, state, topic, query).await
}

/// `GET /ws/private/{chat_id}?username=`
pub async fn private_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
    Query(query): Query<ConnectQuery>,
) -> Result<Response, StatusCode> {
    let topic = Topic::private_from_route(&chat_id)
        .map_err(|e| reject(&ConnectError::InvalidRoute(e.to_string())))?;
    accept(ws, state, topic, query).await
}

/// HTTP status for a refused handshake
pub fn connect_error_status(error: &ConnectError) -> StatusCode {
    match error {
        ConnectError::InvalidRoute(_) => StatusCode::BAD_REQUEST,
        ConnectError::UnknownTopic(_) => StatusCode::NOT_FOUND,
        ConnectError::Unauthorized { .. } => StatusCode::FORBIDDEN,
        ConnectError::AlreadyRegistered(_) => StatusCode::CONFLICT,
        ConnectError::Collaborator(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn reject(error: &ConnectError) -> StatusCode {
    tracing::warn!("Rejecting WebSocket handshake: {}", error);
    connect_error_status(error)
}

async fn accept(
    ws: WebSocketUpgrade,
    state: Arc<AppState>,
    topic: Topic,
    query: ConnectQuery,
) -> Result<Response, StatusCode> {
    let requester = query.username.and_then(|raw| Username::new(raw).ok());

    // Authorize before upgrading so refused clients get a proper HTTP status.
    // Registration happens after the upgrade, once the socket actually exists.
    state
        .open_session_usecase()
        .authorize(&topic, requester.as_ref())
        .await
        .map_err(|e| reject(&e))?;

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state, topic, requester))
        .into_response())
}

enum Inbound {
    Text(String),
    Unsupported,
    Control,
    Closed,
    Idle,
    Failed(String),
}

async fn next_inbound(receiver: &mut SplitStream<WebSocket>, idle: Option<Duration>) -> Inbound {
    let message = match idle {
        Some(limit) => match tokio::time::timeout(limit, receiver.next()).await {
            Ok(message) => message,
            Err(_) => return Inbound::Idle,
        },
        None => receiver.next().await,
    };

    match message {
        None | Some(Ok(Message::Close(_))) => Inbound::Closed,
        Some(Err(e)) => Inbound::Failed(e.to_string()),
        Some(Ok(Message::Text(text))) => Inbound::Text(text.as_str().to_string()),
        Some(Ok(Message::Binary(_))) => Inbound::Unsupported,
        // Ping/pong is handled automatically by the WebSocket protocol
        Some(Ok(Message::Ping(_) | Message::Pong(_))) => Inbound::Control,
    }
}

/// How a session loop ended
enum Ending {
    /// The peer went away or the socket failed; nothing more to send
    Client(String),
    /// The server ends the session and tells the peer why
    Server { code: u16, reason: String },
}

impl Ending {
    fn reason(&self) -> &str {
        match self {
            Ending::Client(reason) | Ending::Server { reason, .. } => reason,
        }
    }
}

/// Time the send task gets to flush queued frames and the close frame
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Close frame payloads are capped at 125 bytes, 2 of which hold the code
const MAX_CLOSE_REASON_BYTES: usize = 123;

fn close_frame(code: u16, reason: &str) -> CloseFrame {
    let mut end = reason.len().min(MAX_CLOSE_REASON_BYTES);
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    CloseFrame {
        code,
        reason: reason[..end].to_string().into(),
    }
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    topic: Topic,
    requester: Option<Username>,
) {
    let (mut sender, mut receiver) = socket.split();

    // Outbound queue of this connection only
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let connection = Connection::new(
        ConnectionIdFactory::generate(),
        tx,
        Timestamp::new(plaza_shared::time::now_millis()),
    );
    let connection_id = connection.id;
    let closer = connection.clone();

    let mut session = ChatSession::new(
        topic,
        connection,
        state.send_message_usecase(),
        state.close_session_usecase(),
        state.policy,
    );

    if let Err(e) = session
        .open(&state.open_session_usecase(), requester.as_ref())
        .await
    {
        tracing::warn!("Session '{}' could not be opened: {}", connection_id, e);
        let _ = sender
            .send(Message::Close(Some(close_frame(
                close_code::POLICY,
                &e.to_string(),
            ))))
            .await;
        return;
    }

    // Spawn a task to drain this connection's queue into the socket.
    // A close frame from the session loop is written after the queued frames.
    let (close_tx, mut close_rx) = oneshot::channel::<CloseFrame>();
    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Some(msg) => {
                        if sender.send(Message::Text(msg.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                frame = &mut close_rx => {
                    if let Ok(frame) = frame {
                        while let Ok(msg) = rx.try_recv() {
                            if sender.send(Message::Text(msg.into())).await.is_err() {
                                return;
                            }
                        }
                        let _ = sender.send(Message::Close(Some(frame))).await;
                    }
                    break;
                }
            }
        }
    });

    let mut send_task_done = false;
    let ending = loop {
        let inbound = tokio::select! {
            _ = &mut send_task => {
                send_task_done = true;
                break Ending::Client("socket write failed".to_string());
            }
            _ = closer.close_requested() => break Ending::Server {
                code: close_code::AWAY,
                reason: "topic removed".to_string(),
            },
            inbound = next_inbound(&mut receiver, state.idle_timeout) => inbound,
        };

        let outcome = match inbound {
            Inbound::Text(text) => session.handle_frame(&text).await,
            Inbound::Unsupported => {
                session.handle_unsupported_frame("binary frames are not supported")
            }
            Inbound::Control => continue,
            Inbound::Closed => break Ending::Client("client closed the connection".to_string()),
            Inbound::Idle => {
                break Ending::Server {
                    code: close_code::AWAY,
                    reason: "idle timeout".to_string(),
                };
            }
            Inbound::Failed(e) => break Ending::Client(format!("WebSocket error: {e}")),
        };

        match outcome {
            FrameOutcome::Delivered { recipients } => {
                tracing::debug!(
                    "Frame from '{}' delivered to {} subscriber(s)",
                    connection_id,
                    recipients
                );
            }
            FrameOutcome::Dropped(_) => {}
            FrameOutcome::Closing(e) => {
                break Ending::Server {
                    code: close_code::POLICY,
                    reason: e.to_string(),
                };
            }
        }
    };

    // Leave the topic before the close frame goes out
    session.close().await;

    if let Ending::Server { code, reason } = &ending {
        let frame = close_frame(*code, reason);
        if !send_task_done && close_tx.send(frame).is_ok() {
            let _ = tokio::time::timeout(CLOSE_GRACE, &mut send_task).await;
        }
    }
    send_task.abort();

    tracing::info!("Session '{}' closed: {}", connection_id, ending.reason());
}

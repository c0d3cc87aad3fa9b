//! Per-connection protocol state machine.
//!
//! A [`ChatSession`] goes through `Connecting -> Open -> Closed` exactly once.
//! The transport layer feeds it text frames; the session parses them, runs
//! [`SendMessageUseCase`] and decides whether the connection stays open.

use crate::{
    config::MalformedFramePolicy,
    domain::{Topic, Username},
    infrastructure::dto::websocket::{InboundMessage, RejectedMessage},
    registry::{Connection, RegistrationHandle},
};

use super::{
    close_session::CloseSessionUseCase,
    error::{ConnectError, SendMessageError},
    open_session::OpenSessionUseCase,
    send_message::SendMessageUseCase,
};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closed,
}

/// How refused frames are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionPolicy {
    /// Send a `rejected` frame to the sender
    pub notify_rejections: bool,
    pub malformed_frame: MalformedFramePolicy,
}

/// Result of handling one inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Persisted and broadcast to `recipients` subscribers
    Delivered { recipients: usize },
    /// Refused; the session stays open
    Dropped(SendMessageError),
    /// Refused; the transport must close the connection
    Closing(SendMessageError),
}

/// Protocol handler bound to one connection and one topic.
pub struct ChatSession {
    state: SessionState,
    topic: Topic,
    connection: Connection,
    handle: Option<RegistrationHandle>,
    send_message: SendMessageUseCase,
    close_session: CloseSessionUseCase,
    policy: SessionPolicy,
}

impl ChatSession {
    pub fn new(
        topic: Topic,
        connection: Connection,
        send_message: SendMessageUseCase,
        close_session: CloseSessionUseCase,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            state: SessionState::Connecting,
            topic,
            connection,
            handle: None,
            send_message,
            close_session,
            policy,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn handle(&self) -> Option<&RegistrationHandle> {
        self.handle.as_ref()
    }

    /// `Connecting -> Open`: authorize and register the connection.
    ///
    /// On failure the session goes straight to `Closed`.
    pub async fn open(
        &mut self,
        opener: &OpenSessionUseCase,
        requester: Option<&Username>,
    ) -> Result<(), ConnectError> {
        if self.state != SessionState::Connecting {
            return Err(ConnectError::AlreadyRegistered(self.connection.id));
        }

        match opener
            .execute(self.topic.clone(), requester, self.connection.clone())
            .await
        {
            Ok(handle) => {
                self.handle = Some(handle);
                self.state = SessionState::Open;
                tracing::info!(
                    "Session '{}' opened on '{}'",
                    self.connection.id,
                    self.topic
                );
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Closed;
                Err(e)
            }
        }
    }

    /// Handle one inbound text frame.
    pub async fn handle_frame(&mut self, text: &str) -> FrameOutcome {
        if self.state != SessionState::Open {
            return FrameOutcome::Closing(SendMessageError::SessionClosed);
        }

        let inbound = match InboundMessage::parse(self.topic.kind(), text) {
            Ok(inbound) => inbound,
            Err(e) => return self.refuse(SendMessageError::MalformedFrame(e.to_string())),
        };

        match self
            .send_message
            .execute(&self.topic, inbound.sender, inbound.body)
            .await
        {
            Ok(delivery) => FrameOutcome::Delivered {
                recipients: delivery.recipients,
            },
            Err(e) => self.refuse(e),
        }
    }

    /// Handle a frame that is not text (binary payloads are not part of the protocol).
    pub fn handle_unsupported_frame(&mut self, detail: &str) -> FrameOutcome {
        if self.state != SessionState::Open {
            return FrameOutcome::Closing(SendMessageError::SessionClosed);
        }
        self.refuse(SendMessageError::MalformedFrame(detail.to_string()))
    }

    /// `Open -> Closed`: unregister. Final and idempotent.
    pub async fn close(&mut self) -> bool {
        self.state = SessionState::Closed;
        match self.handle.take() {
            Some(handle) => self.close_session.execute(&handle).await,
            None => false,
        }
    }

    fn refuse(&self, error: SendMessageError) -> FrameOutcome {
        tracing::warn!(
            "Refused frame on session '{}' ({}): {}",
            self.connection.id,
            self.topic,
            error
        );

        let fatal = match &error {
            SendMessageError::MalformedFrame(_) => {
                self.policy.malformed_frame == MalformedFramePolicy::Close
            }
            SendMessageError::EmptyBody
            | SendMessageError::BodyTooLong { .. }
            | SendMessageError::InvalidSender(_)
            | SendMessageError::UnknownSender(_) => false,
            SendMessageError::SessionClosed
            | SendMessageError::Encode(_)
            | SendMessageError::Collaborator(_) => true,
        };

        if self.policy.notify_rejections
            && let Some(reason) = error.rejection_reason()
        {
            self.notify(RejectedMessage::new(reason, error.to_string()));
        }

        if fatal {
            FrameOutcome::Closing(error)
        } else {
            FrameOutcome::Dropped(error)
        }
    }

    fn notify(&self, notice: RejectedMessage) {
        match serde_json::to_string(&notice) {
            Ok(json) => {
                if !self.connection.deliver(json) {
                    tracing::debug!(
                        "Session '{}' is gone; rejection notice discarded",
                        self.connection.id
                    );
                }
            }
            Err(e) => tracing::error!("Failed to encode rejection notice: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ChatId, ConnectionIdFactory, IdentityResolver, PrivateTopicStore, Timestamp},
        infrastructure::repository::{
            InMemoryIdentityDirectory, InMemoryMessageStore, InMemoryPrivateChatRepository,
        },
        registry::ConnectionRegistry,
    };
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct Fixture {
        registry: Arc<ConnectionRegistry>,
        identities: Arc<InMemoryIdentityDirectory>,
        messages: Arc<InMemoryMessageStore>,
        private_chats: Arc<InMemoryPrivateChatRepository>,
        opener: OpenSessionUseCase,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = Arc::new(ConnectionRegistry::new());
            let identities = Arc::new(InMemoryIdentityDirectory::new());
            let messages = Arc::new(InMemoryMessageStore::new());
            let private_chats = Arc::new(InMemoryPrivateChatRepository::new());
            let opener = OpenSessionUseCase::new(
                registry.clone(),
                identities.clone(),
                private_chats.clone(),
            );
            Self {
                registry,
                identities,
                messages,
                private_chats,
                opener,
            }
        }

        fn session(
            &self,
            topic: Topic,
            policy: SessionPolicy,
        ) -> (ChatSession, mpsc::UnboundedReceiver<String>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let connection = Connection::new(ConnectionIdFactory::generate(), tx, Timestamp::new(0));
            let session = ChatSession::new(
                topic,
                connection,
                SendMessageUseCase::new(
                    self.registry.clone(),
                    self.identities.clone(),
                    self.messages.clone(),
                ),
                CloseSessionUseCase::new(self.registry.clone()),
                policy,
            );
            (session, rx)
        }
    }

    fn lobby() -> Topic {
        Topic::room_from_route("lobby").unwrap()
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        // テスト項目: Connecting -> Open -> Closed と遷移し、Closed は最終状態
        // given (前提条件):
        let fixture = Fixture::new();
        let (mut session, _rx) = fixture.session(lobby(), SessionPolicy::default());
        assert_eq!(session.state(), SessionState::Connecting);

        // when (操作):
        session.open(&fixture.opener, None).await.unwrap();
        let opened = session.state();
        let closed_once = session.close().await;
        let closed_twice = session.close().await;

        // then (期待する結果):
        assert_eq!(opened, SessionState::Open);
        assert!(closed_once);
        assert!(!closed_twice);
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(fixture.registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_frame_after_close_is_refused() {
        // テスト項目: Closed 後のフレームは SessionClosed で拒否される
        // given (前提条件):
        let fixture = Fixture::new();
        let (mut session, _rx) = fixture.session(lobby(), SessionPolicy::default());
        session.open(&fixture.opener, None).await.unwrap();
        session.close().await;

        // when (操作):
        let outcome = session
            .handle_frame(r#"{"username":"alice","message":"hi"}"#)
            .await;

        // then (期待する結果):
        assert_eq!(
            outcome,
            FrameOutcome::Closing(SendMessageError::SessionClosed)
        );
        assert_eq!(fixture.messages.total().await, 0);
    }

    #[tokio::test]
    async fn test_failed_open_closes_session() {
        // テスト項目: 購読できない場合は Open にならず Closed になる
        // given (前提条件):
        let fixture = Fixture::new();
        let (mut session, _rx) = fixture.session(
            Topic::Private(ChatId::new(42).unwrap()),
            SessionPolicy::default(),
        );

        // when (操作):
        let result = session.open(&fixture.opener, None).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ConnectError::UnknownTopic(_))));
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.handle().is_none());
    }

    #[tokio::test]
    async fn test_valid_frame_is_delivered_to_sender_too() {
        // テスト項目: 有効なフレームは送信者自身を含む購読者全員に配信される
        // given (前提条件):
        let fixture = Fixture::new();
        let (mut alice, mut alice_rx) = fixture.session(lobby(), SessionPolicy::default());
        let (mut bob, mut bob_rx) = fixture.session(lobby(), SessionPolicy::default());
        alice.open(&fixture.opener, None).await.unwrap();
        bob.open(&fixture.opener, None).await.unwrap();

        // when (操作):
        let outcome = alice
            .handle_frame(r#"{"username":"alice","message":"hi"}"#)
            .await;

        // then (期待する結果):
        assert_eq!(outcome, FrameOutcome::Delivered { recipients: 2 });
        for rx in [&mut alice_rx, &mut bob_rx] {
            let frame: serde_json::Value =
                serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
            assert_eq!(frame["type"], "chat_message");
            assert_eq!(frame["username"], "alice");
        }
    }

    #[tokio::test]
    async fn test_empty_body_dropped_silently_by_default() {
        // テスト項目: 空の本文はデフォルトでは通知なしで破棄される
        // given (前提条件):
        let fixture = Fixture::new();
        let (mut session, mut rx) = fixture.session(lobby(), SessionPolicy::default());
        session.open(&fixture.opener, None).await.unwrap();

        // when (操作):
        let outcome = session
            .handle_frame(r#"{"username":"alice","message":"   "}"#)
            .await;

        // then (期待する結果):
        assert_eq!(outcome, FrameOutcome::Dropped(SendMessageError::EmptyBody));
        assert_eq!(session.state(), SessionState::Open);
        assert!(rx.try_recv().is_err());
        assert_eq!(fixture.messages.total().await, 0);
    }

    #[tokio::test]
    async fn test_rejection_notice_sent_only_to_sender() {
        // テスト項目: 通知が有効な場合、拒否通知は送信者にだけ届く
        // given (前提条件):
        let fixture = Fixture::new();
        let policy = SessionPolicy {
            notify_rejections: true,
            ..SessionPolicy::default()
        };
        let (mut alice, mut alice_rx) = fixture.session(lobby(), policy);
        let (mut bob, mut bob_rx) = fixture.session(lobby(), policy);
        alice.open(&fixture.opener, None).await.unwrap();
        bob.open(&fixture.opener, None).await.unwrap();

        // when (操作):
        let outcome = alice
            .handle_frame(r#"{"username":"alice","message":""}"#)
            .await;

        // then (期待する結果):
        assert_eq!(outcome, FrameOutcome::Dropped(SendMessageError::EmptyBody));
        let notice: serde_json::Value =
            serde_json::from_str(&alice_rx.recv().await.unwrap()).unwrap();
        assert_eq!(notice["type"], "rejected");
        assert_eq!(notice["reason"], "empty_body");
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_malformed_frame_policy() {
        // テスト項目: 不正なフレームはポリシーに応じて破棄またはセッション終了になる
        // given (前提条件):
        let fixture = Fixture::new();
        let (mut lenient, _rx1) = fixture.session(lobby(), SessionPolicy::default());
        let (mut strict, _rx2) = fixture.session(
            lobby(),
            SessionPolicy {
                notify_rejections: false,
                malformed_frame: MalformedFramePolicy::Close,
            },
        );
        lenient.open(&fixture.opener, None).await.unwrap();
        strict.open(&fixture.opener, None).await.unwrap();

        // when (操作):
        let dropped = lenient.handle_frame("not json").await;
        let closing = strict.handle_frame("not json").await;

        // then (期待する結果):
        assert!(matches!(
            dropped,
            FrameOutcome::Dropped(SendMessageError::MalformedFrame(_))
        ));
        assert!(matches!(
            closing,
            FrameOutcome::Closing(SendMessageError::MalformedFrame(_))
        ));
    }

    #[tokio::test]
    async fn test_private_session_unknown_sender_dropped() {
        // テスト項目: プライベートチャットで未登録の送信者のフレームは配信されない
        // given (前提条件):
        let fixture = Fixture::new();
        let alice = fixture
            .identities
            .resolve_or_create(&Username::new("alice".to_string()).unwrap())
            .await
            .unwrap();
        let bob = fixture
            .identities
            .resolve_or_create(&Username::new("bob".to_string()).unwrap())
            .await
            .unwrap();
        let chat_id = fixture.private_chats.open_between(&alice, &bob).await.unwrap();
        let (mut session, mut rx) =
            fixture.session(Topic::Private(chat_id), SessionPolicy::default());
        session
            .open(&fixture.opener, Some(&alice.username))
            .await
            .unwrap();

        // when (操作):
        let outcome = session
            .handle_frame(r#"{"sender":"ghost","content":"boo"}"#)
            .await;

        // then (期待する結果):
        assert_eq!(
            outcome,
            FrameOutcome::Dropped(SendMessageError::UnknownSender("ghost".to_string()))
        );
        assert!(rx.try_recv().is_err());
        assert_eq!(fixture.messages.total().await, 0);
    }

    #[tokio::test]
    async fn test_unsupported_frame_is_malformed() {
        // テスト項目: テキスト以外のフレームは不正なフレームとして扱われる
        // given (前提条件):
        let fixture = Fixture::new();
        let (mut session, _rx) = fixture.session(lobby(), SessionPolicy::default());
        session.open(&fixture.opener, None).await.unwrap();

        // when (操作):
        let outcome = session.handle_unsupported_frame("binary frame");

        // then (期待する結果):
        assert_eq!(
            outcome,
            FrameOutcome::Dropped(SendMessageError::MalformedFrame("binary frame".to_string()))
        );
    }
}

//! Server state shared by all handlers.

use serde::Deserialize;
use std::{sync::Arc, time::Duration};

use crate::{
    config::ServerConfig,
    domain::{IdentityResolver, PersistenceGateway, PrivateTopicStore},
    infrastructure::repository::{
        InMemoryIdentityDirectory, InMemoryMessageStore, InMemoryPrivateChatRepository,
    },
    registry::ConnectionRegistry,
    usecase::{
        CloseSessionUseCase, DeletePrivateChatUseCase, OpenSessionUseCase, SendMessageUseCase,
        SessionPolicy,
    },
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// Requesting user; required for private chats
    pub username: Option<String>,
}

/// Shared application state
pub struct AppState {
    /// Live connections grouped by topic
    pub registry: Arc<ConnectionRegistry>,
    /// User directory（外部コラボレーター）
    pub identities: Arc<dyn IdentityResolver>,
    /// Message store（外部コラボレーター）
    pub messages: Arc<dyn PersistenceGateway>,
    /// Private chat store（外部コラボレーター）
    pub private_chats: Arc<dyn PrivateTopicStore>,
    /// How refused frames are handled
    pub policy: SessionPolicy,
    /// Close silent sessions after this long
    pub idle_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(
        identities: Arc<dyn IdentityResolver>,
        messages: Arc<dyn PersistenceGateway>,
        private_chats: Arc<dyn PrivateTopicStore>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
            identities,
            messages,
            private_chats,
            policy: SessionPolicy {
                notify_rejections: config.notify_rejections,
                malformed_frame: config.malformed_frame,
            },
            idle_timeout: config.idle_timeout(),
        }
    }

    /// State backed by the in-memory collaborators.
    pub fn in_memory(config: &ServerConfig) -> Self {
        Self::new(
            Arc::new(InMemoryIdentityDirectory::new()),
            Arc::new(InMemoryMessageStore::new()),
            Arc::new(InMemoryPrivateChatRepository::new()),
            config,
        )
    }

    pub fn open_session_usecase(&self) -> OpenSessionUseCase {
        OpenSessionUseCase::new(
            self.registry.clone(),
            self.identities.clone(),
            self.private_chats.clone(),
        )
    }

    pub fn send_message_usecase(&self) -> SendMessageUseCase {
        SendMessageUseCase::new(
            self.registry.clone(),
            self.identities.clone(),
            self.messages.clone(),
        )
    }

    pub fn close_session_usecase(&self) -> CloseSessionUseCase {
        CloseSessionUseCase::new(self.registry.clone())
    }

    pub fn delete_private_chat_usecase(&self) -> DeletePrivateChatUseCase {
        DeletePrivateChatUseCase::new(
            self.registry.clone(),
            self.identities.clone(),
            self.messages.clone(),
            self.private_chats.clone(),
        )
    }
}

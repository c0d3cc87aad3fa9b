//! UseCase: セッション確立処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - OpenSessionUseCase::authorize() / execute() メソッド
//! - トピックごとの購読可否判定とレジストリへの登録
//!
//! ### なぜこのテストが必要か
//! - ルームは誰でも購読でき、初回参照時に作成される
//! - プライベートチャットは事前に作成され、参加者のみが購読できる
//!
//! ### どのような状況を想定しているか
//! - 正常系：ルームの購読、参加者によるプライベートチャットの購読
//! - 異常系：存在しないチャット、参加者以外、未登録ユーザー、接続 ID の重複

use std::sync::Arc;

use crate::{
    domain::{IdentityResolver, PrivateTopicStore, RepositoryError, Topic, Username},
    registry::{Connection, ConnectionRegistry, RegistrationHandle, RegistryError},
};

use super::error::ConnectError;

/// セッション確立のユースケース
pub struct OpenSessionUseCase {
    registry: Arc<ConnectionRegistry>,
    identities: Arc<dyn IdentityResolver>,
    private_chats: Arc<dyn PrivateTopicStore>,
}

impl OpenSessionUseCase {
    /// 新しい OpenSessionUseCase を作成
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        identities: Arc<dyn IdentityResolver>,
        private_chats: Arc<dyn PrivateTopicStore>,
    ) -> Self {
        Self {
            registry,
            identities,
            private_chats,
        }
    }

    /// トピックを購読できるか判定
    ///
    /// # Arguments
    ///
    /// * `topic` - 購読対象のトピック
    /// * `requester` - 接続を要求したユーザー（プライベートチャットでは必須）
    ///
    /// # Returns
    ///
    /// * `Ok(())` - 購読可能
    /// * `Err(ConnectError)` - `UnknownTopic` / `Unauthorized` / `Collaborator`
    pub async fn authorize(
        &self,
        topic: &Topic,
        requester: Option<&Username>,
    ) -> Result<(), ConnectError> {
        let Topic::Private(chat_id) = topic else {
            // ルームは初回参照時に作成されるため常に購読可能
            return Ok(());
        };

        if !self.private_chats.exists(*chat_id).await? {
            return Err(ConnectError::UnknownTopic(topic.group_name()));
        }

        let unauthorized = || ConnectError::Unauthorized {
            topic: topic.group_name(),
        };
        let username = requester.ok_or_else(unauthorized)?;
        let identity = match self.identities.resolve_strict(username).await {
            Ok(identity) => identity,
            Err(RepositoryError::IdentityNotFound(_)) => return Err(unauthorized()),
            Err(e) => return Err(e.into()),
        };

        match self.private_chats.is_participant(*chat_id, &identity).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(unauthorized()),
            // 判定中にチャットが削除された
            Err(RepositoryError::ChatNotFound(_)) => {
                Err(ConnectError::UnknownTopic(topic.group_name()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 購読可否を判定し、接続をレジストリに登録
    pub async fn execute(
        &self,
        topic: Topic,
        requester: Option<&Username>,
        connection: Connection,
    ) -> Result<RegistrationHandle, ConnectError> {
        self.authorize(&topic, requester).await?;

        self.registry
            .register(connection, topic)
            .await
            .map_err(|e| match e {
                RegistryError::AlreadyRegistered(id) => ConnectError::AlreadyRegistered(id),
            })
    }
}

//! UseCase: プライベートチャット削除処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DeletePrivateChatUseCase::execute() メソッド
//! - チャット削除、購読中セッションの切断、メッセージの削除
//!
//! ### なぜこのテストが必要か
//! - 削除されたチャットに購読者やメッセージが残らないことを保証
//! - 参加者以外は削除できないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者による削除（購読者あり・なし）
//! - 異常系：参加者以外、存在しないチャット、二重削除

use std::sync::Arc;

use crate::{
    domain::{
        ChatId, IdentityResolver, PersistenceGateway, PrivateTopicStore, RepositoryError, Topic,
        Username,
    },
    registry::ConnectionRegistry,
};

use super::{error::ConnectError, open_session::OpenSessionUseCase};

/// 削除結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletedChat {
    pub chat_id: ChatId,
    /// 切断を要求したセッション数
    pub closed_sessions: usize,
    /// 削除したメッセージ数
    pub deleted_messages: usize,
}

/// プライベートチャット削除のユースケース
pub struct DeletePrivateChatUseCase {
    registry: Arc<ConnectionRegistry>,
    messages: Arc<dyn PersistenceGateway>,
    private_chats: Arc<dyn PrivateTopicStore>,
    access: OpenSessionUseCase,
}

impl DeletePrivateChatUseCase {
    /// 新しい DeletePrivateChatUseCase を作成
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        identities: Arc<dyn IdentityResolver>,
        messages: Arc<dyn PersistenceGateway>,
        private_chats: Arc<dyn PrivateTopicStore>,
    ) -> Self {
        let access = OpenSessionUseCase::new(registry.clone(), identities, private_chats.clone());
        Self {
            registry,
            messages,
            private_chats,
            access,
        }
    }

    /// プライベートチャット削除を実行
    ///
    /// 参加者判定はセッション確立と同じ規則。削除後は新しい購読も履歴の参照もできない。
    ///
    /// # Returns
    ///
    /// * `Ok(DeletedChat)` - 削除したチャットと後始末の件数
    /// * `Err(ConnectError)` - `UnknownTopic` / `Unauthorized` / `Collaborator`
    pub async fn execute(
        &self,
        chat_id: ChatId,
        requester: Option<&Username>,
    ) -> Result<DeletedChat, ConnectError> {
        let topic = Topic::Private(chat_id);

        // 1. 参加者のみ削除可能
        self.access.authorize(&topic, requester).await?;

        // 2. ストアから削除（以降の購読・履歴参照は UnknownTopic になる）
        match self.private_chats.delete(chat_id).await {
            Ok(()) => {}
            Err(RepositoryError::ChatNotFound(_)) => {
                return Err(ConnectError::UnknownTopic(topic.group_name()));
            }
            Err(e) => return Err(e.into()),
        }

        // 3. 送信中のメッセージを待ってから購読者を切断し、メッセージを削除
        let group = self.registry.group(&topic).await;
        let _turn = match &group {
            Some(group) => Some(group.publish_turn().await),
            None => None,
        };
        let closed_sessions = self.registry.evict(&topic).await;
        let deleted_messages = self.messages.purge(&topic).await?;

        tracing::info!(
            "Private chat {} deleted ({} session(s) closed, {} message(s) removed)",
            chat_id,
            closed_sessions,
            deleted_messages
        );

        Ok(DeletedChat {
            chat_id,
            closed_sessions,
            deleted_messages,
        })
    }
}

//! Repository trait 定義
//!
//! メッセージングコアが外部コラボレーター（ユーザーディレクトリ、
//! メッセージストア、プライベートチャットストア）に求めるインターフェース。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::{
    ChatId, Identity, MessageBody, RepositoryError, StoredMessage, Topic, Username,
};

/// ユーザー識別子の解決
///
/// ルームとプライベートチャットで解決ポリシーが異なる：
/// ルームは初見のユーザーを作成し、プライベートチャットは既知のユーザーのみ受け付ける。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// ユーザー名から Identity を取得し、存在しなければ作成する
    async fn resolve_or_create(&self, username: &Username) -> Result<Identity, RepositoryError>;

    /// 既存の Identity のみを返す
    ///
    /// 存在しない場合は `RepositoryError::IdentityNotFound`
    async fn resolve_strict(&self, username: &Username) -> Result<Identity, RepositoryError>;
}

/// メッセージの永続化（追記専用）
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// メッセージを追記し、サーバー側で採番・時刻付与したレコードを返す
    async fn append(
        &self,
        topic: &Topic,
        author: &Identity,
        body: &MessageBody,
    ) -> Result<StoredMessage, RepositoryError>;

    /// トピックのメッセージ履歴を永続化順に返す
    async fn history(&self, topic: &Topic) -> Result<Vec<StoredMessage>, RepositoryError>;

    /// トピックのメッセージをすべて削除し、削除件数を返す
    async fn purge(&self, topic: &Topic) -> Result<usize, RepositoryError>;
}

/// プライベートチャットの存在確認と参加者確認
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PrivateTopicStore: Send + Sync {
    /// チャットが存在するか
    async fn exists(&self, chat_id: ChatId) -> Result<bool, RepositoryError>;

    /// Identity がチャットの参加者か
    async fn is_participant(
        &self,
        chat_id: ChatId,
        identity: &Identity,
    ) -> Result<bool, RepositoryError>;

    /// 2 人の間のチャットを取得し、なければ作成する
    async fn open_between(
        &self,
        initiator: &Identity,
        target: &Identity,
    ) -> Result<ChatId, RepositoryError>;

    /// Identity が参加しているチャットを ID 順に返す
    async fn list_for(&self, identity: &Identity) -> Result<Vec<ChatId>, RepositoryError>;

    /// チャットを削除する
    ///
    /// 存在しない場合は `RepositoryError::ChatNotFound`
    async fn delete(&self, chat_id: ChatId) -> Result<(), RepositoryError>;
}

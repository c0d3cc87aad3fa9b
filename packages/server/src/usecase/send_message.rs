//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - 本文の検証、送信者の解決、永続化、ブロードキャスト
//!
//! ### なぜこのテストが必要か
//! - 永続化してからブロードキャストする順序を保証する
//! - ルームとプライベートチャットで送信者の解決ポリシーが異なることを確認
//! - 拒否されたメッセージは永続化もブロードキャストもされないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：ルーム・プライベートへの送信と購読者への配信
//! - 異常系：空の本文、未登録の送信者、ストア障害
//! - エッジケース：同一トピックへの連続送信の順序

use std::sync::Arc;

use crate::{
    domain::{
        IdentityResolver, MessageBody, PersistenceGateway, RepositoryError, StoredMessage, Topic,
        TopicKind, Username, ValueObjectError,
    },
    infrastructure::dto::websocket::encode_outbound,
    registry::ConnectionRegistry,
};

use super::error::SendMessageError;

/// 送信結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// 永続化されたメッセージ
    pub message: StoredMessage,
    /// 配信キューに積まれた購読者数
    pub recipients: usize,
}

/// メッセージ送信のユースケース
#[derive(Clone)]
pub struct SendMessageUseCase {
    registry: Arc<ConnectionRegistry>,
    identities: Arc<dyn IdentityResolver>,
    messages: Arc<dyn PersistenceGateway>,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        identities: Arc<dyn IdentityResolver>,
        messages: Arc<dyn PersistenceGateway>,
    ) -> Self {
        Self {
            registry,
            identities,
            messages,
        }
    }

    /// メッセージ送信を実行
    ///
    /// 1 回の呼び出しで永続化は最大 1 件、ブロードキャストは最大 1 回。
    ///
    /// # Arguments
    ///
    /// * `topic` - 送信先トピック
    /// * `sender` - フレームに含まれていた送信者名
    /// * `body` - フレームに含まれていた本文
    ///
    /// # Returns
    ///
    /// * `Ok(Delivery)` - 永続化されたメッセージと配信数
    /// * `Err(SendMessageError)` - 送信失敗（永続化もブロードキャストもされない）
    pub async fn execute(
        &self,
        topic: &Topic,
        sender: String,
        body: String,
    ) -> Result<Delivery, SendMessageError> {
        // 1. 本文の検証
        let body = MessageBody::new(body).map_err(|e| match e {
            ValueObjectError::MessageBodyTooLong { max, actual } => {
                SendMessageError::BodyTooLong { max, actual }
            }
            _ => SendMessageError::EmptyBody,
        })?;

        // 2. 送信者の解決（ルームは初見なら作成、プライベートは既知のみ）
        //    ユーザー名として不正な名前は、ルームでは作成できず、プライベートでは見つからない
        let username = Username::new(sender.clone()).map_err(|_| match topic.kind() {
            TopicKind::Room => SendMessageError::InvalidSender(sender),
            TopicKind::Private => SendMessageError::UnknownSender(sender),
        })?;
        let author = match topic.kind() {
            TopicKind::Room => self.identities.resolve_or_create(&username).await?,
            TopicKind::Private => match self.identities.resolve_strict(&username).await {
                Ok(identity) => identity,
                Err(RepositoryError::IdentityNotFound(name)) => {
                    return Err(SendMessageError::UnknownSender(name));
                }
                Err(e) => return Err(e.into()),
            },
        };

        // 3. 永続化とブロードキャストをトピック単位で直列化
        //    同時送信時は先にターンを取った方が先に永続化・配信される
        let group = self.registry.group(topic).await;
        let _turn = match &group {
            Some(group) => Some(group.publish_turn().await),
            None => None,
        };

        let message = self.messages.append(topic, &author, &body).await?;
        let payload =
            encode_outbound(&message).map_err(|e| SendMessageError::Encode(e.to_string()))?;
        let recipients = self.registry.broadcast(topic, &payload).await;

        tracing::info!(
            "Message {} from '{}' persisted on '{}' and delivered to {} subscriber(s)",
            message.id,
            message.author.username,
            topic,
            recipients
        );

        Ok(Delivery {
            message,
            recipients,
        })
    }
}

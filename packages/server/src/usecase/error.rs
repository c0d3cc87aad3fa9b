//! UseCase 層のエラー定義

use thiserror::Error;

use crate::{
    domain::{ConnectionId, RepositoryError},
    infrastructure::dto::websocket::RejectionReason,
};

/// セッション確立時のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// ルートからトピックを取り出せない
    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    /// プライベートチャットが存在しない
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    /// プライベートチャットの参加者ではない
    #[error("Not allowed to join {topic}")]
    Unauthorized { topic: String },

    /// 接続 ID が登録済み
    #[error("Connection '{0}' is already registered")]
    AlreadyRegistered(ConnectionId),

    /// コラボレーター（ストア）の障害
    #[error("Collaborator failure: {0}")]
    Collaborator(#[from] RepositoryError),
}

/// メッセージ送信時のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendMessageError {
    /// フレームを構造化メッセージとして解釈できない
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// 本文が空、または空白のみ
    #[error("Message body is empty")]
    EmptyBody,

    /// 本文が長すぎる
    #[error("Message body exceeds {max} characters (got {actual})")]
    BodyTooLong { max: usize, actual: usize },

    /// 送信者名がユーザー名として不正（ルームでは新規作成もできない）
    #[error("Invalid sender name: '{0}'")]
    InvalidSender(String),

    /// 送信者を解決できない
    #[error("Unknown sender: '{0}'")]
    UnknownSender(String),

    /// セッションが OPEN ではない
    #[error("Session is not open")]
    SessionClosed,

    /// 配信イベントのシリアライズ失敗
    #[error("Failed to encode event: {0}")]
    Encode(String),

    /// コラボレーター（ストア）の障害
    #[error("Collaborator failure: {0}")]
    Collaborator(#[from] RepositoryError),
}

impl SendMessageError {
    /// 送信者に通知できる拒否理由（通知対象外のエラーは None）
    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        match self {
            SendMessageError::MalformedFrame(_) => Some(RejectionReason::MalformedFrame),
            SendMessageError::EmptyBody => Some(RejectionReason::EmptyBody),
            SendMessageError::BodyTooLong { .. } => Some(RejectionReason::BodyTooLong),
            SendMessageError::InvalidSender(_) => Some(RejectionReason::InvalidSender),
            SendMessageError::UnknownSender(_) => Some(RejectionReason::UnknownSender),
            SendMessageError::SessionClosed
            | SendMessageError::Encode(_)
            | SendMessageError::Collaborator(_) => None,
        }
    }
}

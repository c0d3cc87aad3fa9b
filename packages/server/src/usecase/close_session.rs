//! UseCase: セッション終了処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - CloseSessionUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 切断時の競合（受信タスクと送信タスクの両方が終了処理を走らせる）でも
//!   二重の登録解除が無害であることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：切断後は残りの購読者だけに配信される
//! - エッジケース：同じハンドルでの二重切断

use std::sync::Arc;

use crate::registry::{ConnectionRegistry, RegistrationHandle};

/// セッション終了のユースケース
#[derive(Clone)]
pub struct CloseSessionUseCase {
    registry: Arc<ConnectionRegistry>,
}

impl CloseSessionUseCase {
    /// 新しい CloseSessionUseCase を作成
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// セッション終了を実行
    ///
    /// # Returns
    ///
    /// * `true` - 登録を解除した
    /// * `false` - 既に解除済み（何もしない）
    pub async fn execute(&self, handle: &RegistrationHandle) -> bool {
        let removed = self.registry.unregister(handle).await;
        if removed {
            let remaining = self.registry.subscriber_count(handle.topic()).await;
            tracing::info!(
                "Connection '{}' left '{}' ({} subscriber(s) remaining)",
                handle.connection_id(),
                handle.topic(),
                remaining
            );
        }
        removed
    }
}

//! InMemory Message Store 実装
//!
//! 追記専用のメッセージストア。トピックごとに永続化順でメッセージを保持します。

use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Identity, MessageBody, PersistenceGateway, RepositoryError, StoredMessage, Timestamp, Topic,
};

/// 時刻の取得元（Unix ミリ秒）
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

#[derive(Debug, Default)]
struct Store {
    next_id: u64,
    by_topic: HashMap<Topic, Vec<StoredMessage>>,
}

/// インメモリのメッセージストア
pub struct InMemoryMessageStore {
    store: Mutex<Store>,
    clock: Clock,
}

impl InMemoryMessageStore {
    /// システム時刻を使うストアを作成
    pub fn new() -> Self {
        Self::with_clock(Arc::new(plaza_shared::time::now_millis))
    }

    /// 任意の時刻取得元を使うストアを作成
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            store: Mutex::new(Store::default()),
            clock,
        }
    }

    /// トピックに保存されたメッセージ数
    pub async fn count(&self, topic: &Topic) -> usize {
        let store = self.store.lock().await;
        store.by_topic.get(topic).map_or(0, Vec::len)
    }

    /// 全トピックのメッセージ数
    pub async fn total(&self) -> usize {
        let store = self.store.lock().await;
        store.by_topic.values().map(Vec::len).sum()
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryMessageStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryMessageStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryMessageStore {
    async fn append(
        &self,
        topic: &Topic,
        author: &Identity,
        body: &MessageBody,
    ) -> Result<StoredMessage, RepositoryError> {
        let mut store = self.store.lock().await;
        store.next_id += 1;
        let message = StoredMessage {
            id: store.next_id,
            topic: topic.clone(),
            author: author.clone(),
            body: body.clone(),
            created_at: Timestamp::new((self.clock)()),
        };
        store
            .by_topic
            .entry(topic.clone())
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn history(&self, topic: &Topic) -> Result<Vec<StoredMessage>, RepositoryError> {
        let store = self.store.lock().await;
        Ok(store.by_topic.get(topic).cloned().unwrap_or_default())
    }

    async fn purge(&self, topic: &Topic) -> Result<usize, RepositoryError> {
        let mut store = self.store.lock().await;
        Ok(store.by_topic.remove(topic).map_or(0, |messages| messages.len()))
    }
}

//! InMemory Private Chat Repository 実装
//!
//! プライベートチャットと参加者の対応を保持します。
//! チャットの作成はメッセージングコアの外側（HTTP API）から行われます。

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ChatId, Identity, IdentityId, PrivateTopicStore, RepositoryError};

#[derive(Debug, Default)]
struct Chats {
    next_id: u64,
    participants: BTreeMap<ChatId, BTreeSet<IdentityId>>,
}

/// インメモリのプライベートチャットストア
#[derive(Debug, Default)]
pub struct InMemoryPrivateChatRepository {
    chats: Mutex<Chats>,
}

impl InMemoryPrivateChatRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 参加者を指定してチャットを作成（2 人以上）
    ///
    /// # Errors
    ///
    /// 重複を除いた参加者が 2 人未満の場合は `RepositoryError::InvalidParticipants`
    pub async fn create_chat(&self, members: &[Identity]) -> Result<ChatId, RepositoryError> {
        let participants: BTreeSet<IdentityId> = members.iter().map(|m| m.id).collect();
        if participants.len() < 2 {
            return Err(RepositoryError::InvalidParticipants);
        }

        let mut chats = self.chats.lock().await;
        Self::insert(&mut chats, participants)
    }

    /// 存在するチャット数
    pub async fn len(&self) -> usize {
        self.chats.lock().await.participants.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn insert(
        chats: &mut Chats,
        participants: BTreeSet<IdentityId>,
    ) -> Result<ChatId, RepositoryError> {
        chats.next_id += 1;
        let chat_id = ChatId::new(chats.next_id)
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;
        chats.participants.insert(chat_id, participants);
        Ok(chat_id)
    }
}

#[async_trait]
impl PrivateTopicStore for InMemoryPrivateChatRepository {
    async fn exists(&self, chat_id: ChatId) -> Result<bool, RepositoryError> {
        Ok(self.chats.lock().await.participants.contains_key(&chat_id))
    }

    async fn is_participant(
        &self,
        chat_id: ChatId,
        identity: &Identity,
    ) -> Result<bool, RepositoryError> {
        let chats = self.chats.lock().await;
        let participants = chats
            .participants
            .get(&chat_id)
            .ok_or(RepositoryError::ChatNotFound(chat_id.value()))?;
        Ok(participants.contains(&identity.id))
    }

    async fn open_between(
        &self,
        initiator: &Identity,
        target: &Identity,
    ) -> Result<ChatId, RepositoryError> {
        if initiator.id == target.id {
            return Err(RepositoryError::InvalidParticipants);
        }
        let pair: BTreeSet<IdentityId> = [initiator.id, target.id].into_iter().collect();

        let mut chats = self.chats.lock().await;
        if let Some((chat_id, _)) = chats
            .participants
            .iter()
            .find(|(_, participants)| **participants == pair)
        {
            return Ok(*chat_id);
        }

        let chat_id = Self::insert(&mut chats, pair)?;
        tracing::info!(
            "Created new private chat {} between '{}' and '{}'",
            chat_id,
            initiator.username,
            target.username
        );
        Ok(chat_id)
    }

    async fn list_for(&self, identity: &Identity) -> Result<Vec<ChatId>, RepositoryError> {
        let chats = self.chats.lock().await;
        Ok(chats
            .participants
            .iter()
            .filter(|(_, participants)| participants.contains(&identity.id))
            .map(|(chat_id, _)| *chat_id)
            .collect())
    }

    async fn delete(&self, chat_id: ChatId) -> Result<(), RepositoryError> {
        let mut chats = self.chats.lock().await;
        chats
            .participants
            .remove(&chat_id)
            .map(|_| ())
            .ok_or(RepositoryError::ChatNotFound(chat_id.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Username;

    fn identity(id: u64, name: &str) -> Identity {
        Identity::new(IdentityId::new(id), Username::new(name.to_string()).unwrap())
    }

    #[tokio::test]
    async fn test_open_between_reuses_existing_pair() {
        // テスト項目: 同じ 2 人の間のチャットは再利用される（順序は問わない）
        // given (前提条件):
        let repo = InMemoryPrivateChatRepository::new();
        let alice = identity(1, "alice");
        let bob = identity(2, "bob");

        // when (操作):
        let first = repo.open_between(&alice, &bob).await.unwrap();
        let second = repo.open_between(&bob, &alice).await.unwrap();

        // then (期待する結果):
        assert_eq!(first, second);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_open_between_ignores_group_chats() {
        // テスト項目: 3 人以上のチャットは 2 人用チャットとして再利用されない
        // given (前提条件):
        let repo = InMemoryPrivateChatRepository::new();
        let alice = identity(1, "alice");
        let bob = identity(2, "bob");
        let carol = identity(3, "carol");
        let group = repo
            .create_chat(&[alice.clone(), bob.clone(), carol])
            .await
            .unwrap();

        // when (操作):
        let pair = repo.open_between(&alice, &bob).await.unwrap();

        // then (期待する結果):
        assert_ne!(group, pair);
    }

    #[tokio::test]
    async fn test_open_between_self_fails() {
        // テスト項目: 自分自身とのチャットは作成できない
        // given (前提条件):
        let repo = InMemoryPrivateChatRepository::new();
        let alice = identity(1, "alice");

        // when (操作):
        let result = repo.open_between(&alice, &alice).await;

        // then (期待する結果):
        assert_eq!(result, Err(RepositoryError::InvalidParticipants));
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_exists_and_is_participant() {
        // テスト項目: 存在確認と参加者確認が正しく行われる
        // given (前提条件):
        let repo = InMemoryPrivateChatRepository::new();
        let alice = identity(1, "alice");
        let bob = identity(2, "bob");
        let mallory = identity(3, "mallory");
        let chat_id = repo.open_between(&alice, &bob).await.unwrap();

        // then (期待する結果):
        assert!(repo.exists(chat_id).await.unwrap());
        assert!(!repo.exists(ChatId::new(99).unwrap()).await.unwrap());
        assert!(repo.is_participant(chat_id, &alice).await.unwrap());
        assert!(!repo.is_participant(chat_id, &mallory).await.unwrap());
        assert_eq!(
            repo.is_participant(ChatId::new(99).unwrap(), &alice).await,
            Err(RepositoryError::ChatNotFound(99))
        );
    }

    #[tokio::test]
    async fn test_create_chat_requires_two_distinct_members() {
        // テスト項目: 重複を除いて 2 人未満のチャットは作成できない
        // given (前提条件):
        let repo = InMemoryPrivateChatRepository::new();
        let alice = identity(1, "alice");

        // when (操作):
        let result = repo.create_chat(&[alice.clone(), alice]).await;

        // then (期待する結果):
        assert_eq!(result, Err(RepositoryError::InvalidParticipants));
    }

    #[tokio::test]
    async fn test_list_for_returns_own_chats_in_id_order() {
        // テスト項目: 参加しているチャットだけが ID 順に返される
        // given (前提条件):
        let repo = InMemoryPrivateChatRepository::new();
        let alice = identity(1, "alice");
        let bob = identity(2, "bob");
        let carol = identity(3, "carol");
        let with_bob = repo.open_between(&alice, &bob).await.unwrap();
        repo.open_between(&bob, &carol).await.unwrap();
        let with_carol = repo.open_between(&carol, &alice).await.unwrap();

        // when (操作):
        let chats = repo.list_for(&alice).await.unwrap();

        // then (期待する結果):
        assert_eq!(chats, vec![with_bob, with_carol]);
        assert!(repo.list_for(&identity(9, "dave")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_chat_once() {
        // テスト項目: 削除したチャットは存在しなくなり、二度目の削除は ChatNotFound
        // given (前提条件):
        let repo = InMemoryPrivateChatRepository::new();
        let alice = identity(1, "alice");
        let bob = identity(2, "bob");
        let chat_id = repo.open_between(&alice, &bob).await.unwrap();

        // when (操作):
        let first = repo.delete(chat_id).await;
        let second = repo.delete(chat_id).await;

        // then (期待する結果):
        assert_eq!(first, Ok(()));
        assert_eq!(second, Err(RepositoryError::ChatNotFound(chat_id.value())));
        assert!(!repo.exists(chat_id).await.unwrap());
        assert_eq!(
            repo.is_participant(chat_id, &alice).await,
            Err(RepositoryError::ChatNotFound(chat_id.value()))
        );
        // 削除後に同じ 2 人で開くと新しい ID が割り当てられる
        let reopened = repo.open_between(&alice, &bob).await.unwrap();
        assert_ne!(reopened, chat_id);
    }
}

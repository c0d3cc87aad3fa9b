//! InMemory Identity Directory 実装

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Identity, IdentityId, IdentityResolver, RepositoryError, Username};

#[derive(Debug, Default)]
struct Directory {
    next_id: u64,
    by_username: HashMap<Username, Identity>,
}

/// インメモリのユーザーディレクトリ
#[derive(Debug, Default)]
pub struct InMemoryIdentityDirectory {
    directory: Mutex<Directory>,
}

impl InMemoryIdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登録済みユーザー数
    pub async fn len(&self) -> usize {
        self.directory.lock().await.by_username.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl IdentityResolver for InMemoryIdentityDirectory {
    async fn resolve_or_create(&self, username: &Username) -> Result<Identity, RepositoryError> {
        let mut directory = self.directory.lock().await;
        if let Some(identity) = directory.by_username.get(username) {
            return Ok(identity.clone());
        }

        directory.next_id += 1;
        let identity = Identity::new(IdentityId::new(directory.next_id), username.clone());
        directory
            .by_username
            .insert(username.clone(), identity.clone());
        tracing::info!("Created identity '{}' ({})", username, identity.id);
        Ok(identity)
    }

    async fn resolve_strict(&self, username: &Username) -> Result<Identity, RepositoryError> {
        let directory = self.directory.lock().await;
        directory
            .by_username
            .get(username)
            .cloned()
            .ok_or_else(|| RepositoryError::IdentityNotFound(username.as_str().to_string()))
    }
}

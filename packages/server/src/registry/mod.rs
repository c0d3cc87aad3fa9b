//! Connection registry and topic groups.
//!
//! The registry maps every live connection to the single topic it subscribed
//! to and owns one [`TopicGroup`] per topic that currently has subscribers.
//! It is constructed once at startup and shared through `Arc`; nothing here
//! is a process-wide global.

mod connection;
mod group;

pub use connection::{Connection, RegistrationHandle};
pub use group::TopicGroup;

use std::{collections::HashMap, sync::Arc};

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{ConnectionId, Timestamp, Topic};

/// Errors returned by the connection registry
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The connection id is still registered
    #[error("Connection '{0}' is already registered")]
    AlreadyRegistered(ConnectionId),
}

/// Active topic with its subscriber count (diagnostics)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSummary {
    pub topic: Topic,
    pub subscribers: usize,
    /// Connection time of the longest-lived subscriber
    pub active_since: Timestamp,
}

/// Registry of live connections grouped by topic.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    groups: RwLock<HashMap<Topic, Arc<TopicGroup>>>,
    connections: Mutex<HashMap<ConnectionId, Topic>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection on a topic.
    ///
    /// The topic's group is created on first use.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::AlreadyRegistered` if the connection id is
    /// currently registered.
    pub async fn register(
        &self,
        connection: Connection,
        topic: Topic,
    ) -> Result<RegistrationHandle, RegistryError> {
        let connection_id = connection.id;

        {
            let mut connections = self.connections.lock().await;
            if connections.contains_key(&connection_id) {
                return Err(RegistryError::AlreadyRegistered(connection_id));
            }
            connections.insert(connection_id, topic.clone());
        }

        loop {
            let group = self.group_or_create(&topic).await;
            if group.join(connection.clone()).await {
                break;
            }
            // The group retired between lookup and join.
            self.drop_retired(&topic, &group).await;
        }

        tracing::debug!("Registered connection '{}' on '{}'", connection_id, topic);
        Ok(RegistrationHandle::new(connection_id, topic))
    }

    /// Unregister a connection.
    ///
    /// Idempotent: returns `false` when the handle was already unregistered.
    pub async fn unregister(&self, handle: &RegistrationHandle) -> bool {
        let connection_id = handle.connection_id();
        let known = self
            .connections
            .lock()
            .await
            .remove(&connection_id)
            .is_some();
        if !known {
            return false;
        }

        let Some(group) = self.group(handle.topic()).await else {
            return true;
        };
        let (_, retired) = group.leave(&connection_id).await;
        if retired {
            self.drop_retired(handle.topic(), &group).await;
            tracing::debug!("Topic group '{}' is empty and was dropped", handle.topic());
        }

        tracing::debug!(
            "Unregistered connection '{}' from '{}'",
            connection_id,
            handle.topic()
        );
        true
    }

    /// Deliver `payload` to every connection subscribed to `topic` right now.
    ///
    /// Members that join after the snapshot is taken do not receive it.
    /// Returns the number of connections the payload was enqueued for.
    pub async fn broadcast(&self, topic: &Topic, payload: &str) -> usize {
        let Some(group) = self.group(topic).await else {
            return 0;
        };

        let mut delivered = 0;
        for connection in group.snapshot().await {
            if connection.deliver(payload.to_string()) {
                delivered += 1;
            } else {
                tracing::warn!(
                    "Failed to enqueue message for connection '{}' on '{}'",
                    connection.id,
                    topic
                );
            }
        }
        delivered
    }

    /// Drop a topic's group and ask every subscriber to close.
    ///
    /// Evicted connections are unregistered here, so their own `unregister`
    /// becomes a no-op. Returns the number of connections evicted.
    pub async fn evict(&self, topic: &Topic) -> usize {
        let Some(group) = self.groups.write().await.remove(topic) else {
            return 0;
        };
        let members = group.retire().await;

        {
            let mut connections = self.connections.lock().await;
            for connection in &members {
                connections.remove(&connection.id);
            }
        }
        for connection in &members {
            connection.request_close();
        }

        tracing::info!(
            "Topic group '{}' evicted with {} subscriber(s)",
            topic,
            members.len()
        );
        members.len()
    }

    /// Look up the live group of a topic.
    pub async fn group(&self, topic: &Topic) -> Option<Arc<TopicGroup>> {
        self.groups.read().await.get(topic).cloned()
    }

    pub async fn subscriber_count(&self, topic: &Topic) -> usize {
        match self.group(topic).await {
            Some(group) => group.len().await,
            None => 0,
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }

    /// Active topics ordered by group name.
    pub async fn topics(&self) -> Vec<TopicSummary> {
        let groups: Vec<Arc<TopicGroup>> = self.groups.read().await.values().cloned().collect();

        let mut summaries = Vec::with_capacity(groups.len());
        for group in groups {
            let members = group.snapshot().await;
            if let Some(active_since) = members.iter().map(|c| c.connected_at).min() {
                summaries.push(TopicSummary {
                    topic: group.topic().clone(),
                    subscribers: members.len(),
                    active_since,
                });
            }
        }
        summaries.sort_by_key(|summary| summary.topic.group_name());
        summaries
    }

    async fn group_or_create(&self, topic: &Topic) -> Arc<TopicGroup> {
        if let Some(group) = self.group(topic).await {
            return group;
        }
        let mut groups = self.groups.write().await;
        groups
            .entry(topic.clone())
            .or_insert_with(|| Arc::new(TopicGroup::new(topic.clone())))
            .clone()
    }

    async fn drop_retired(&self, topic: &Topic, retired: &Arc<TopicGroup>) {
        let mut groups = self.groups.write().await;
        let stale = match groups.get(topic) {
            Some(current) => Arc::ptr_eq(current, retired) && current.is_retired().await,
            None => false,
        };
        if stale {
            groups.remove(topic);
        }
    }
}

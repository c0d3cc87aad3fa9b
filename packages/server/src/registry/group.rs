//! Topic group: the subscriber set of one topic.

use std::collections::HashMap;

use tokio::sync::{Mutex, MutexGuard};

use super::connection::Connection;
use crate::domain::{ConnectionId, Topic};

#[derive(Debug, Default)]
struct Members {
    connections: HashMap<ConnectionId, Connection>,
    /// Set once the last member left; a retired group never accepts members again.
    retired: bool,
}

/// Broadcast group for a single topic.
#[derive(Debug)]
pub struct TopicGroup {
    topic: Topic,
    members: Mutex<Members>,
    publish_turn: Mutex<()>,
}

impl TopicGroup {
    pub(super) fn new(topic: Topic) -> Self {
        Self {
            topic,
            members: Mutex::new(Members::default()),
            publish_turn: Mutex::new(()),
        }
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Add a member. Returns `false` if the group has been retired.
    pub(super) async fn join(&self, connection: Connection) -> bool {
        let mut members = self.members.lock().await;
        if members.retired {
            return false;
        }
        members.connections.insert(connection.id, connection);
        true
    }

    /// Remove a member.
    ///
    /// Returns `(removed, retired)`; the group retires when it becomes empty.
    pub(super) async fn leave(&self, connection_id: &ConnectionId) -> (bool, bool) {
        let mut members = self.members.lock().await;
        let removed = members.connections.remove(connection_id).is_some();
        if members.connections.is_empty() {
            members.retired = true;
        }
        (removed, members.retired)
    }

    /// Retire the group immediately and hand back its members.
    pub(super) async fn retire(&self) -> Vec<Connection> {
        let mut members = self.members.lock().await;
        members.retired = true;
        members.connections.drain().map(|(_, c)| c).collect()
    }

    pub(super) async fn is_retired(&self) -> bool {
        self.members.lock().await.retired
    }

    /// Snapshot of the current members.
    pub async fn snapshot(&self) -> Vec<Connection> {
        let members = self.members.lock().await;
        members.connections.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.members.lock().await.connections.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Acquire the topic's publish turn.
    ///
    /// Holding the guard across persist and broadcast keeps broadcast order
    /// equal to persistence order within the topic.
    pub async fn publish_turn(&self) -> MutexGuard<'_, ()> {
        self.publish_turn.lock().await
    }
}

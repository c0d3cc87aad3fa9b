//! Domain layer for the messaging core.
//!
//! This module contains business logic that is independent of
//! data transfer objects (DTOs) and infrastructure concerns.

pub mod entity;
pub mod error;
pub mod factory;
pub mod repository;
pub mod value_object;

pub use entity::{Identity, StoredMessage, Topic, TopicKind};
pub use error::{RepositoryError, ValueObjectError};
pub use factory::ConnectionIdFactory;
pub use repository::{IdentityResolver, PersistenceGateway, PrivateTopicStore};
pub use value_object::{
    ChatId, ConnectionId, IdentityId, MessageBody, RoomName, Timestamp, Username,
};

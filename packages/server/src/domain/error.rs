//! Domain layer error definitions.

use thiserror::Error;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// RoomName validation error
    #[error("RoomName cannot be empty")]
    RoomNameEmpty,

    /// RoomName too long error
    #[error("RoomName cannot exceed {max} characters (got {actual})")]
    RoomNameTooLong { max: usize, actual: usize },

    /// RoomName contains characters outside `[A-Za-z0-9_]`
    #[error("RoomName must contain only letters, digits or underscores (got: {0})")]
    RoomNameInvalidFormat(String),

    /// ChatId is zero
    #[error("ChatId must be a positive integer")]
    ChatIdNotPositive,

    /// ChatId is not a decimal integer
    #[error("ChatId must be a positive integer (got: {0})")]
    ChatIdInvalidFormat(String),

    /// Username validation error
    #[error("Username cannot be empty")]
    UsernameEmpty,

    /// Username too long error
    #[error("Username cannot exceed {max} characters (got {actual})")]
    UsernameTooLong { max: usize, actual: usize },

    /// MessageBody validation error
    #[error("MessageBody cannot be empty or whitespace only")]
    MessageBodyEmpty,

    /// MessageBody too long error
    #[error("MessageBody cannot exceed {max} characters (got {actual})")]
    MessageBodyTooLong { max: usize, actual: usize },
}

/// Errors reported by the collaborator stores (identity directory, message
/// store, private chat store).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The requested identity does not exist
    #[error("Identity not found: {0}")]
    IdentityNotFound(String),

    /// The requested private chat does not exist
    #[error("Private chat not found: {0}")]
    ChatNotFound(u64),

    /// A private chat needs at least two distinct participants
    #[error("Private chat requires two distinct participants")]
    InvalidParticipants,

    /// The backing store failed
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

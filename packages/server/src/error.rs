//! Server startup errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid bind address: {0}")]
    InvalidAddress(#[from] std::net::AddrParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

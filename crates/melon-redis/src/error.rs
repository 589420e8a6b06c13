//! Error types for the store façade

use thiserror::Error;

/// Errors that can occur while talking to the store
///
/// Store failures are carried through untouched in [`StoreError::Redis`];
/// the remaining variants cover what happens on this side of the wire.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Redis(#[from] redis::RedisError),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid address '{0}', expected host:port")]
    InvalidAddress(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Expire time out of range: {0:?}")]
    TtlOutOfRange(std::time::Duration),

    #[error("Command not supported by this backend: {0}")]
    Unsupported(String),

    #[error("Subscriber lagged behind by {0} messages")]
    Lagged(u64),
}

impl StoreError {
    /// Whether this error is the store's "no such key" reply
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::KeyNotFound(_))
    }
}

//! Store backends
//!
//! [`StoreBackend`] is the collaborator contract the façade depends on.
//! Every key and channel a backend receives is already namespaced.

mod memory;
mod redis;

pub use self::memory::MemoryBackend;
pub use self::redis::RedisBackend;

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::StoreError;
use crate::pubsub::PubMessage;

/// Stream of messages for one store subscription
pub type MessageStream = BoxStream<'static, Result<PubMessage, StoreError>>;

/// Remaining lifetime of a key, as reported by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// The key does not exist
    Missing,
    /// The key exists and has no expiry
    Persistent,
    /// The key expires after this much time
    Expires(Duration),
}

impl Ttl {
    /// Decode a `PTTL` reply (-2 missing, -1 no expiry)
    pub fn from_millis(reply: i64) -> Self {
        match reply {
            -2 => Ttl::Missing,
            r if r < 0 => Ttl::Persistent,
            r => Ttl::Expires(Duration::from_millis(r as u64)),
        }
    }
}

/// Argument for an expiry command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExpireArg {
    /// `EXPIRE key <seconds>`
    Seconds(i64),
    /// `PEXPIRE key <milliseconds>`
    Millis(i64),
}

impl ExpireArg {
    /// Pick the expiry command for a duration
    ///
    /// Whole seconds use `EXPIRE`, everything else `PEXPIRE` with at least
    /// 1ms so a short positive timeout never turns into a delete. Zero is
    /// sent as `EXPIRE 0`, which the store treats as a delete.
    pub(crate) fn from_duration(ttl: Duration) -> Result<Self, StoreError> {
        let out_of_range = |_| StoreError::TtlOutOfRange(ttl);

        if ttl.subsec_nanos() == 0 {
            return Ok(ExpireArg::Seconds(
                i64::try_from(ttl.as_secs()).map_err(out_of_range)?,
            ));
        }

        let millis = i64::try_from(ttl.as_millis()).map_err(out_of_range)?;
        Ok(ExpireArg::Millis(millis.max(1)))
    }
}

/// Primitives the façade needs from a key-value/pub-sub store
#[async_trait]
pub trait StoreBackend: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    /// `None` when the key does not exist
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store a value without expiration
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Returns whether a key was removed
    async fn del(&self, key: &str) -> Result<bool, StoreError>;

    /// Returns whether the timeout was applied
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    async fn ttl(&self, key: &str) -> Result<Ttl, StoreError>;

    /// Returns the number of subscribers that received the message
    async fn publish(&self, channel: &str, payload: &str) -> Result<u64, StoreError>;

    /// Open a subscription; the stream ends when the subscription is lost
    async fn subscribe(&self, channel: &str) -> Result<MessageStream, StoreError>;

    /// Run a command the façade does not cover
    async fn command(&self, name: &str, args: &[String]) -> Result<::redis::Value, StoreError>;
}

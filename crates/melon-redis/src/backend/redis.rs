//! Redis implementation of the store backend

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Msg};
use tracing::{debug, error, info};

use super::{ExpireArg, MessageStream, StoreBackend, Ttl};
use crate::config::RedisOptions;
use crate::error::StoreError;
use crate::pubsub::PubMessage;

/// Redis-backed store
///
/// Commands share one multiplexed [`ConnectionManager`]; every
/// subscription gets its own pub/sub connection from the client.
pub struct RedisBackend {
    client: Client,
    connection: ConnectionManager,
}

impl RedisBackend {
    /// Connect to Redis
    ///
    /// Fails as soon as a first connection cannot be established; the
    /// connection manager only reconnects after that first success.
    pub async fn connect(options: &RedisOptions) -> Result<Self, StoreError> {
        debug!(
            "Connecting to Redis at {} (db {})",
            options.address, options.db
        );

        let client = Client::open(options.connection_info()?).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            e
        })?;

        // ConnectionManager retries its first connect with backoff, so
        // check reachability with a single plain connection first
        client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!("Failed to connect to Redis at {}: {}", options.address, e);
                e
            })?;

        let connection = ConnectionManager::new(client.clone()).await.map_err(|e| {
            error!("Failed to connect to Redis at {}: {}", options.address, e);
            e
        })?;

        info!("Connected to Redis at {}", options.address);

        Ok(Self { client, connection })
    }

    fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }
}

fn to_message(msg: Msg) -> Result<PubMessage, StoreError> {
    Ok(message_from_parts(
        msg.get_channel_name(),
        msg.get_payload_bytes(),
    ))
}

/// Payloads are arbitrary bytes; invalid UTF-8 is replaced, not rejected
fn message_from_parts(channel: &str, payload: &[u8]) -> PubMessage {
    PubMessage {
        channel: channel.to_string(),
        payload: String::from_utf8_lossy(payload).into_owned(),
    }
}

#[async_trait]
impl StoreBackend for RedisBackend {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.connection();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection();
        let removed: u64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.connection();

        let applied: bool = match ExpireArg::from_duration(ttl)? {
            ExpireArg::Seconds(seconds) => conn.expire(key, seconds).await?,
            ExpireArg::Millis(millis) => conn.pexpire(key, millis).await?,
        };

        Ok(applied)
    }

    async fn ttl(&self, key: &str) -> Result<Ttl, StoreError> {
        let mut conn = self.connection();
        let reply: i64 = conn.pttl(key).await?;
        Ok(Ttl::from_millis(reply))
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<u64, StoreError> {
        let mut conn = self.connection();
        let receivers: u64 = conn.publish(channel, payload).await?;
        Ok(receivers)
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, StoreError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;

        debug!("Subscribed to Redis channel {}", channel);

        Ok(pubsub.into_on_message().map(to_message).boxed())
    }

    async fn command(&self, name: &str, args: &[String]) -> Result<redis::Value, StoreError> {
        let mut conn = self.connection();

        let mut cmd = redis::cmd(name);
        for arg in args {
            cmd.arg(arg);
        }

        let value: redis::Value = cmd.query_async(&mut conn).await?;
        Ok(value)
    }
}

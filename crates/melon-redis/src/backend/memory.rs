//! In-process store with Redis-like semantics
//!
//! Time comes from `tokio::time`, so tests can pause and advance the
//! clock to observe expiry. Expired keys are evicted lazily on access.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;
use tracing::debug;

use super::{ExpireArg, MessageStream, StoreBackend, Ttl};
use crate::error::StoreError;
use crate::pubsub::PubMessage;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

#[derive(Default)]
struct MemoryState {
    entries: HashMap<String, Entry>,
    channels: HashMap<String, broadcast::Sender<PubMessage>>,
}

impl MemoryState {
    /// Live entry for a key, evicting it first if it has expired
    fn live_entry(&mut self, key: &str) -> Option<&mut Entry> {
        let now = Instant::now();
        if self.entries.get(key).is_some_and(|e| e.is_expired(now)) {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    /// Forget channels nobody is subscribed to any more
    fn prune_channels(&mut self) {
        self.channels.retain(|_, sender| sender.receiver_count() > 0);
    }
}

/// In-memory backend for tests and local development
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every subscription on a channel, as a lost connection would
    pub async fn close_channel(&self, channel: &str) {
        let mut state = self.state.lock().await;
        if state.channels.remove(channel).is_some() {
            debug!("Closed in-memory channel {}", channel);
        }
    }

    /// Number of channels with at least one subscription
    pub async fn channel_count(&self) -> usize {
        let mut state = self.state.lock().await;
        state.prune_channels();
        state.channels.len()
    }

    /// Number of live subscriptions on a channel
    pub async fn subscriber_count(&self, channel: &str) -> usize {
        let state = self.state.lock().await;
        state
            .channels
            .get(channel)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state.live_entry(key).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let existed = state.live_entry(key).is_some();
        state.entries.remove(key);
        Ok(existed)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        // Same range Redis accepts from us
        ExpireArg::from_duration(ttl)?;

        let mut state = self.state.lock().await;

        let Some(entry) = state.live_entry(key) else {
            return Ok(false);
        };

        // A zero timeout deletes the key, as Redis does
        if ttl.is_zero() {
            state.entries.remove(key);
        } else {
            let deadline = Instant::now()
                .checked_add(ttl)
                .ok_or(StoreError::TtlOutOfRange(ttl))?;
            entry.expires_at = Some(deadline);
        }

        Ok(true)
    }

    async fn ttl(&self, key: &str) -> Result<Ttl, StoreError> {
        let mut state = self.state.lock().await;
        let ttl = match state.live_entry(key) {
            None => Ttl::Missing,
            Some(Entry {
                expires_at: None, ..
            }) => Ttl::Persistent,
            Some(Entry {
                expires_at: Some(deadline),
                ..
            }) => Ttl::Expires(deadline.saturating_duration_since(Instant::now())),
        };
        Ok(ttl)
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        state.prune_channels();

        let Some(sender) = state.channels.get(channel) else {
            return Ok(0);
        };

        let message = PubMessage {
            channel: channel.to_string(),
            payload: payload.to_string(),
        };

        // send only fails when nobody is listening
        Ok(sender.send(message).unwrap_or(0) as u64)
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, StoreError> {
        let mut state = self.state.lock().await;
        state.prune_channels();

        let receiver = state
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe();

        let messages = stream::unfold(receiver, |mut receiver| async move {
            match receiver.recv().await {
                Ok(message) => Some((Ok(message), receiver)),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    Some((Err(StoreError::Lagged(n)), receiver))
                }
                Err(broadcast::error::RecvError::Closed) => None,
            }
        });

        Ok(messages.boxed())
    }

    async fn command(&self, name: &str, args: &[String]) -> Result<redis::Value, StoreError> {
        let arity = |n: usize| {
            if args.len() == n {
                Ok(())
            } else {
                Err(StoreError::Unsupported(format!(
                    "{} expects {} argument(s), got {}",
                    name,
                    n,
                    args.len()
                )))
            }
        };

        match name.to_ascii_uppercase().as_str() {
            "PING" => Ok(redis::Value::SimpleString("PONG".to_string())),
            "GET" => {
                arity(1)?;
                Ok(match self.get(&args[0]).await? {
                    Some(value) => redis::Value::BulkString(value.into_bytes()),
                    None => redis::Value::Nil,
                })
            }
            "SET" => {
                arity(2)?;
                self.set(&args[0], &args[1]).await?;
                Ok(redis::Value::Okay)
            }
            "DEL" => {
                arity(1)?;
                Ok(redis::Value::Int(self.del(&args[0]).await? as i64))
            }
            "EXISTS" => {
                arity(1)?;
                let exists = self.get(&args[0]).await?.is_some();
                Ok(redis::Value::Int(exists as i64))
            }
            _ => Err(StoreError::Unsupported(name.to_string())),
        }
    }
}

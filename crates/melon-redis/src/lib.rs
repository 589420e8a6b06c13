//! melon-redis: namespaced Redis access layer for Melonbot
//!
//! Wraps a key-value/pub-sub store behind a narrow façade:
//! every key and channel is prefixed with a namespace, commands are
//! passed through to the store unchanged, and subscriptions are relayed
//! into an in-process channel by a cancellable background task.
//!
//! ## Example
//!
//! ```rust,no_run
//! use melon_redis::{Key, RedisInstance, RedisOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), melon_redis::StoreError> {
//! let redis = RedisInstance::create(RedisOptions::default()).await?;
//!
//! redis.set(&Key::from("x"), "1").await?;
//! assert_eq!(redis.get(&Key::from("x")).await?, "1");
//!
//! let mut sub = redis.subscribe(&Key::from("ch"), CancellationToken::new()).await?;
//! redis.publish(&Key::from("ch"), "hello").await?;
//! let message = sub.recv().await;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod instance;
pub mod key;
pub mod pubsub;

pub use backend::{MemoryBackend, RedisBackend, StoreBackend, Ttl};
pub use config::RedisOptions;
pub use error::StoreError;
pub use instance::RedisInstance;
pub use key::{Key, Namespace, DEFAULT_NAMESPACE};
pub use pubsub::{Envelope, PubJson, PubMessage, ReceivedEnvelope, Subscription};

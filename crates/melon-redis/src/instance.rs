//! Namespaced command façade over a store backend

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::backend::{RedisBackend, StoreBackend, Ttl};
use crate::config::RedisOptions;
use crate::error::StoreError;
use crate::key::{Key, Namespace};

/// Handle to the store, shared by the whole process
///
/// Every key passes through the instance's [`Namespace`] exactly once
/// before it reaches the backend; results and errors come back unchanged.
/// Cloning is cheap and shares the underlying connection.
#[derive(Clone)]
pub struct RedisInstance {
    pub(crate) backend: Arc<dyn StoreBackend>,
    pub(crate) namespace: Namespace,
}

impl RedisInstance {
    /// Connect to Redis and verify the connection with a ping
    ///
    /// Any failure is returned as-is; retrying is up to the caller.
    pub async fn create(options: RedisOptions) -> Result<Self, StoreError> {
        let backend = RedisBackend::connect(&options).await?;
        Self::connect(Arc::new(backend), Namespace::new(options.namespace)).await
    }

    /// Wrap an existing backend after checking that it answers a ping
    pub async fn connect(
        backend: Arc<dyn StoreBackend>,
        namespace: Namespace,
    ) -> Result<Self, StoreError> {
        let instance = Self::with_backend(backend, namespace);
        instance.ping().await.map_err(|e| {
            error!("Store did not answer ping: {}", e);
            e
        })?;
        Ok(instance)
    }

    /// Wrap an existing backend without checking it
    pub fn with_backend(backend: Arc<dyn StoreBackend>, namespace: Namespace) -> Self {
        Self { backend, namespace }
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.backend.ping().await
    }

    /// Prefix applied to every key and channel
    pub fn prefix(&self) -> &str {
        self.namespace.prefix()
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The backend behind this instance, for commands the façade does not
    /// cover (see [`StoreBackend::command`]). Keys passed there are not
    /// namespaced automatically.
    pub fn backend(&self) -> Arc<dyn StoreBackend> {
        self.backend.clone()
    }

    /// Get the value of a key
    ///
    /// A missing key is reported as [`StoreError::KeyNotFound`].
    pub async fn get(&self, key: &Key) -> Result<String, StoreError> {
        let physical = self.namespace.format(key);
        debug!("GET {}", physical);

        self.backend
            .get(&physical)
            .await?
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))
    }

    /// Set the value of a key, with no expiration
    pub async fn set(&self, key: &Key, value: &str) -> Result<(), StoreError> {
        let physical = self.namespace.format(key);
        debug!("SET {}", physical);

        self.backend.set(&physical, value).await
    }

    /// Delete a key. Deleting a missing key is not an error.
    pub async fn del(&self, key: &Key) -> Result<bool, StoreError> {
        let physical = self.namespace.format(key);
        debug!("DEL {}", physical);

        self.backend.del(&physical).await
    }

    /// Set a time-to-live on a key
    ///
    /// The duration is handed to the store as given; a zero duration
    /// deletes the key. Returns `false` if the key does not exist.
    pub async fn expire(&self, key: &Key, ttl: Duration) -> Result<bool, StoreError> {
        let physical = self.namespace.format(key);
        debug!("EXPIRE {} {:?}", physical, ttl);

        self.backend.expire(&physical, ttl).await
    }

    pub async fn ttl(&self, key: &Key) -> Result<Ttl, StoreError> {
        let physical = self.namespace.format(key);
        debug!("PTTL {}", physical);

        self.backend.ttl(&physical).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;

    use crate::backend::{MemoryBackend, MessageStream};

    mock! {
        Backend {}
        #[async_trait]
        impl StoreBackend for Backend {
            async fn ping(&self) -> Result<(), StoreError>;
            async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
            async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
            async fn del(&self, key: &str) -> Result<bool, StoreError>;
            async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;
            async fn ttl(&self, key: &str) -> Result<Ttl, StoreError>;
            async fn publish(&self, channel: &str, payload: &str) -> Result<u64, StoreError>;
            async fn subscribe(&self, channel: &str) -> Result<MessageStream, StoreError>;
            async fn command(&self, name: &str, args: &[String]) -> Result<redis::Value, StoreError>;
        }
    }

    fn io_error() -> StoreError {
        StoreError::Redis(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "connection reset",
        )))
    }

    fn memory_instance() -> RedisInstance {
        RedisInstance::with_backend(Arc::new(MemoryBackend::new()), Namespace::default())
    }

    #[tokio::test]
    async fn test_set_get_del_round_trip() {
        let redis = memory_instance();
        let x = Key::from("x");

        redis.set(&x, "1").await.unwrap();
        assert_eq!(redis.get(&x).await.unwrap(), "1");

        assert!(redis.del(&x).await.unwrap());
        let err = redis.get(&x).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Key not found: x");
    }

    #[tokio::test]
    async fn test_del_missing_key_is_ok() {
        let redis = memory_instance();
        assert!(!redis.del(&Key::from("missing")).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_makes_key_unavailable() {
        let redis = memory_instance();
        let key = Key::from("session");

        redis.set(&key, "abc").await.unwrap();
        assert!(redis.expire(&key, Duration::from_secs(30)).await.unwrap());
        assert_eq!(
            redis.ttl(&key).await.unwrap(),
            Ttl::Expires(Duration::from_secs(30))
        );

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(redis.get(&key).await.unwrap(), "abc");

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(redis.get(&key).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_keys_are_namespaced() {
        let backend = Arc::new(MemoryBackend::new());
        let redis = RedisInstance::with_backend(backend.clone(), Namespace::new("test:"));

        redis.set(&Key::from("x"), "1").await.unwrap();

        assert_eq!(redis.prefix(), "test:");
        assert_eq!(backend.get("test:x").await.unwrap().as_deref(), Some("1"));
        assert_eq!(backend.get("x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_instances_with_different_namespaces_are_isolated() {
        let backend = Arc::new(MemoryBackend::new());
        let a = RedisInstance::with_backend(backend.clone(), Namespace::new("a:"));
        let b = RedisInstance::with_backend(backend.clone(), Namespace::new("b:"));
        let key = Key::from("shared");

        a.set(&key, "from a").await.unwrap();
        b.set(&key, "from b").await.unwrap();

        assert_eq!(a.get(&key).await.unwrap(), "from a");
        assert_eq!(b.get(&key).await.unwrap(), "from b");
    }

    #[tokio::test]
    async fn test_commands_receive_physical_keys() {
        let mut backend = MockBackend::new();
        backend
            .expect_get()
            .withf(|key| key == "Melonbot:x")
            .times(1)
            .returning(|_| Ok(Some("1".to_string())));
        backend
            .expect_set()
            .withf(|key, value| key == "Melonbot:x" && value == "1")
            .times(1)
            .returning(|_, _| Ok(()));
        backend
            .expect_del()
            .withf(|key| key == "Melonbot:x")
            .times(1)
            .returning(|_| Ok(true));
        backend
            .expect_expire()
            .withf(|key, ttl| key == "Melonbot:x" && *ttl == Duration::from_secs(5))
            .times(1)
            .returning(|_, _| Ok(true));
        backend
            .expect_publish()
            .withf(|channel, payload| channel == "Melonbot:ch" && payload == "hi")
            .times(1)
            .returning(|_, _| Ok(2));

        let redis = RedisInstance::with_backend(Arc::new(backend), Namespace::default());
        let x = Key::from("x");

        redis.set(&x, "1").await.unwrap();
        assert_eq!(redis.get(&x).await.unwrap(), "1");
        assert!(redis.expire(&x, Duration::from_secs(5)).await.unwrap());
        assert!(redis.del(&x).await.unwrap());
        assert_eq!(redis.publish(&Key::from("ch"), "hi").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_zero_expire_is_passed_through() {
        let mut backend = MockBackend::new();
        backend
            .expect_expire()
            .withf(|_, ttl| ttl.is_zero())
            .times(1)
            .returning(|_, _| Ok(true));

        let redis = RedisInstance::with_backend(Arc::new(backend), Namespace::default());
        assert!(redis.expire(&Key::from("x"), Duration::ZERO).await.unwrap());
    }

    #[tokio::test]
    async fn test_store_errors_pass_through() {
        let mut backend = MockBackend::new();
        backend.expect_get().returning(|_| Err(io_error()));
        backend.expect_set().returning(|_, _| Err(io_error()));

        let redis = RedisInstance::with_backend(Arc::new(backend), Namespace::default());
        let expected = io_error().to_string();

        let err = redis.get(&Key::from("x")).await.unwrap_err();
        assert!(matches!(err, StoreError::Redis(_)));
        assert_eq!(err.to_string(), expected);

        let err = redis.set(&Key::from("x"), "1").await.unwrap_err();
        assert_eq!(err.to_string(), expected);
    }

    #[tokio::test]
    async fn test_connect_fails_when_ping_fails() {
        let mut backend = MockBackend::new();
        backend.expect_ping().times(1).returning(|| Err(io_error()));

        let result = RedisInstance::connect(Arc::new(backend), Namespace::default()).await;
        assert!(matches!(result, Err(StoreError::Redis(_))));
    }

    #[tokio::test]
    async fn test_connect_succeeds_when_ping_succeeds() {
        let mut backend = MockBackend::new();
        backend.expect_ping().times(2).returning(|| Ok(()));

        let redis = RedisInstance::connect(Arc::new(backend), Namespace::default())
            .await
            .unwrap();
        redis.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_backend_extension_point() {
        let redis = memory_instance();
        redis.set(&Key::from("x"), "1").await.unwrap();

        let value = redis
            .backend()
            .command("EXISTS", &["Melonbot:x".to_string()])
            .await
            .unwrap();
        assert_eq!(value, redis::Value::Int(1));
    }
}

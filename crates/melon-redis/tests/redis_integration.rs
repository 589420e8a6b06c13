//! Tests against a live Redis on localhost:6379
//!
//! Run with `cargo test -p melon-redis -- --ignored`.

use std::time::Duration;

use melon_redis::{Key, PubJson, RedisInstance, RedisOptions, StoreError, Ttl};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

fn options(namespace: &str) -> RedisOptions {
    RedisOptions {
        address: "localhost:6379".to_string(),
        username: None,
        password: None,
        db: 0,
        namespace: namespace.to_string(),
    }
}

#[derive(Serialize)]
struct StreamOnline {
    broadcaster: String,
}

impl PubJson for StreamOnline {
    fn event_type(&self) -> Key {
        Key::from("stream.online")
    }
}

#[tokio::test]
async fn test_create_fails_for_unreachable_store() {
    let options = RedisOptions {
        address: "127.0.0.1:1".to_string(),
        ..Default::default()
    };

    // Connecting must fail fast instead of retrying in the background
    let result = tokio::time::timeout(Duration::from_secs(10), RedisInstance::create(options))
        .await
        .expect("create kept retrying an unreachable store");
    assert!(matches!(result, Err(StoreError::Redis(_))));
}

#[tokio::test]
#[ignore] // Requires Redis on localhost:6379
async fn test_set_get_del() {
    let redis = RedisInstance::create(options("melon-test:crud:"))
        .await
        .expect("Failed to connect to Redis");
    let x = Key::from("x");

    redis.set(&x, "1").await.unwrap();
    assert_eq!(redis.get(&x).await.unwrap(), "1");

    redis.del(&x).await.unwrap();
    assert!(redis.get(&x).await.unwrap_err().is_not_found());
}

#[tokio::test]
#[ignore] // Requires Redis on localhost:6379
async fn test_expire() {
    let redis = RedisInstance::create(options("melon-test:expire:"))
        .await
        .expect("Failed to connect to Redis");
    let key = Key::from("short-lived");

    redis.set(&key, "v").await.unwrap();
    assert_eq!(redis.ttl(&key).await.unwrap(), Ttl::Persistent);

    assert!(redis.expire(&key, Duration::from_millis(200)).await.unwrap());
    assert!(matches!(redis.ttl(&key).await.unwrap(), Ttl::Expires(_)));

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(redis.get(&key).await.unwrap_err().is_not_found());
    assert!(!redis.expire(&key, Duration::from_secs(1)).await.unwrap());
}

#[tokio::test]
#[ignore] // Requires Redis on localhost:6379
async fn test_publish_subscribe() {
    let redis = RedisInstance::create(options("melon-test:pubsub:"))
        .await
        .expect("Failed to connect to Redis");
    let ch = Key::from("ch");
    let token = CancellationToken::new();

    let mut sub = redis.subscribe(&ch, token.clone()).await.unwrap();

    redis.publish(&ch, "hello").await.unwrap();
    redis
        .publish_json(
            &ch,
            &StreamOnline {
                broadcaster: "melon095".to_string(),
            },
        )
        .await
        .unwrap();

    let first = tokio::time::timeout(Duration::from_secs(5), sub.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.channel, "ch");
    assert_eq!(first.payload, "hello");

    let second = tokio::time::timeout(Duration::from_secs(5), sub.recv())
        .await
        .unwrap()
        .unwrap();
    let envelope = second.envelope().unwrap();
    assert_eq!(envelope.event_type, Key::from("stream.online"));
    assert_eq!(envelope.data["broadcaster"], "melon095");

    token.cancel();
    let end = tokio::time::timeout(Duration::from_secs(5), sub.recv())
        .await
        .unwrap();
    assert!(end.is_none());
}

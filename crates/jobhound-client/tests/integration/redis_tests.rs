use std::time::Duration;

use jobhound_client::RedisStore;
use jobhound_core::cache::ResultCache;
use jobhound_core::models::Job;
use jobhound_core::traits::KeyValueStore;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage};

/// Start a throwaway Redis and connect to it.
async fn setup_redis() -> (RedisStore, ContainerAsync<GenericImage>) {
    let container = GenericImage::new("redis", "7-alpine")
        .with_exposed_port(ContainerPort::Tcp(6379))
        .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"))
        .start()
        .await
        .expect("Failed to start Redis container");

    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(6379)
        .await
        .expect("Failed to get port");

    let store = RedisStore::connect(&format!("redis://{host}:{port}"))
        .await
        .expect("Failed to connect to Redis");
    (store, container)
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn redis_store_round_trips_and_expires() {
    let (store, _container) = setup_redis().await;

    assert_eq!(store.get("missing").await.unwrap(), None);

    store
        .set("k", b"value".to_vec(), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(store.get("k").await.unwrap(), Some(b"value".to_vec()));

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(store.get("k").await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn result_cache_over_redis() {
    let (store, _container) = setup_redis().await;
    let cache = ResultCache::new(store, Duration::from_secs(60));
    let jobs = vec![Job {
        title: "Rust Dev".into(),
        url: "https://x.test/1".into(),
        source: "Gupy".into(),
        ..Default::default()
    }];

    cache.set("Gupy", "rust", "", &jobs).await.unwrap();
    assert_eq!(cache.get("gupy", "RUST", "").await, Some(jobs));
}

#[tokio::test]
async fn unreachable_redis_fails_fast() {
    let start = std::time::Instant::now();
    let result = RedisStore::connect("redis://127.0.0.1:9").await;
    assert!(result.is_err());
    assert!(start.elapsed() < Duration::from_secs(10));
}

//! Read-through behaviour across the memory, disk and remote tiers.

mod common;

use std::sync::Arc;
use std::time::Duration;

use datalayer::{
    CacheError, CacheTier, ChangeFeed, Config, Credentials, DataLayerCache, RemoteConfigOverrides,
};
use serde_json::{Value, json};
use tempfile::TempDir;

use common::fixtures::{cache_file, open_cache, seeded_cache, seeded_remote};
use common::rpc_stub::RpcStub;

#[tokio::test]
async fn test_each_tier_answers_in_turn() {
    let t = seeded_cache();

    let first = t.cache.lookup_value("S1", "K1").await.unwrap();
    let second = t.cache.lookup_value("S1", "K1").await.unwrap();
    t.cache.flush_write_backs().await;
    t.cache.memory().clear();
    let third = t.cache.lookup_value("S1", "K1").await.unwrap();

    assert_eq!(first.source(), CacheTier::Remote);
    assert_eq!(second.source(), CacheTier::Memory);
    assert_eq!(third.source(), CacheTier::Disk);
    assert_eq!(**third.value(), json!({"a": 1}));
    assert_eq!(t.remote.value_calls(), 1);
}

#[tokio::test]
async fn test_disk_survives_restart() {
    let root = TempDir::new().unwrap();
    let remote = seeded_remote();

    {
        let cache = open_cache(root.path(), remote.clone(), Arc::new(ChangeFeed::default()));
        cache.get_value("S1", "K1").await.unwrap();
        cache.get_keys("S1").await.unwrap();
        cache.flush_write_backs().await;
    }

    let restarted = open_cache(root.path(), remote.clone(), Arc::new(ChangeFeed::default()));
    let value = restarted.lookup_value("S1", "K1").await.unwrap();
    let keys = restarted.lookup_keys("S1").await.unwrap();

    assert_eq!(value.source(), CacheTier::Disk);
    assert_eq!(keys.source(), CacheTier::Disk);
    assert_eq!(remote.total_calls(), 2);
}

#[tokio::test]
async fn test_files_written_under_cache_directory() {
    let t = seeded_cache();

    t.cache.get_value("S1", "K1").await.unwrap();
    t.cache.get_value("S1", "K2").await.unwrap();
    t.cache.get_keys("S1").await.unwrap();
    assert_eq!(t.cache.flush_write_backs().await, 3);

    assert_eq!(
        t.cache.cache_directory().unwrap(),
        cache_file(t.root.path(), &[])
    );
    let k2: Value = serde_json::from_slice(&std::fs::read(t.file(&["S1", "K2"])).unwrap()).unwrap();
    assert_eq!(k2, json!([1, 2, 3]));
    let keys: Vec<String> =
        serde_json::from_slice(&std::fs::read(t.file(&["S1", ".keys"])).unwrap()).unwrap();
    assert_eq!(keys, vec!["K1", "K2"]);

    let stores = t.cache.disk().store_ids().await.unwrap();
    assert_eq!(stores.len(), 1);
    assert_eq!(stores[0].as_str(), "S1");
}

#[tokio::test]
async fn test_not_found_vs_infrastructure() {
    let t = seeded_cache();

    let missing = t.cache.get_value("S1", "nope").await.unwrap_err();
    assert!(missing.is_not_found());

    std::fs::create_dir_all(t.file(&["S2"])).unwrap();
    std::fs::write(t.file(&["S2", "K1"]), b"\xff\xfe").unwrap();
    let corrupt = t.cache.get_value("S2", "K1").await.unwrap_err();
    assert!(matches!(corrupt, CacheError::CorruptEntry { .. }));
    assert!(corrupt.is_infrastructure());
}

#[tokio::test]
async fn test_concurrent_readers_share_a_fetch() {
    let t = seeded_cache();
    t.remote.set_delay(Some(Duration::from_millis(50)));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let cache = Arc::clone(&t.cache);
            tokio::spawn(async move { cache.get_value("S1", "K2").await })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        assert_eq!(*result.unwrap().unwrap(), json!([1, 2, 3]));
    }
    assert_eq!(t.remote.value_calls(), 1);
}

#[tokio::test]
async fn test_rpc_remote_end_to_end() {
    let stub = RpcStub::spawn().await;
    stub.insert_value("S1", "K1", json!({"a": 1}));
    stub.insert_listing("S1", &["K1"]);

    let root = TempDir::new().unwrap();
    let mut config = Config {
        storage_root: Some(root.path().to_path_buf()),
        ..Config::default()
    };
    config.remote.endpoint = stub.url().to_string();
    config.remote.timeout = Duration::from_secs(5);

    let feed = Arc::new(ChangeFeed::default());
    let cache = DataLayerCache::connect(&config, feed.clone()).unwrap();

    assert_eq!(*cache.get_value("S1", "K1").await.unwrap(), json!({"a": 1}));
    assert_eq!(cache.get_keys("S1").await.unwrap().keys(), &["K1".to_string()]);
    assert_eq!(stub.requests(), 2);
    assert!(feed.registered_stores().iter().any(|s| s.as_str() == "S1"));

    let missing = cache.get_value("S1", "K9").await.unwrap_err();
    assert!(missing.is_not_found());
    let unknown_store = cache.get_keys("S9").await.unwrap_err();
    assert!(unknown_store.is_not_found());

    cache.flush_write_backs().await;
    assert!(cache_file(root.path(), &["S1", "K1"]).exists());
}

#[tokio::test]
async fn test_configure_applies_to_next_request() {
    let stub = RpcStub::spawn().await;
    stub.insert_value("S1", "K1", json!("from stub"));

    let root = TempDir::new().unwrap();
    let config = Config {
        storage_root: Some(root.path().to_path_buf()),
        ..Config::default()
    };
    let cache = DataLayerCache::connect(&config, Arc::new(ChangeFeed::default())).unwrap();

    cache.configure(
        RemoteConfigOverrides::default()
            .endpoint(stub.url())
            .credentials(Credentials::bearer("abc123")),
    );

    assert_eq!(*cache.get_value("S1", "K1").await.unwrap(), json!("from stub"));
    assert_eq!(stub.last_authorization().as_deref(), Some("Bearer abc123"));
    assert_eq!(cache.remote_config().endpoint, stub.url());
}

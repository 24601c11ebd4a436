use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use datalayer::{ChangeFeed, Config, DataLayerCache, MockDataLayerCache, MockRemoteSource};
use serde_json::json;
use tempfile::TempDir;

pub struct TestCache {
    pub cache: Arc<MockDataLayerCache>,
    pub remote: MockRemoteSource,
    pub feed: Arc<ChangeFeed>,
    pub root: TempDir,
}

impl TestCache {
    pub fn file(&self, parts: &[&str]) -> PathBuf {
        cache_file(self.root.path(), parts)
    }
}

/// A remote with two stores:
/// `S1 = {K1: {"a": 1}, K2: [1, 2, 3]}` and `S2 = {K1: "other"}`.
pub fn seeded_remote() -> MockRemoteSource {
    let remote = MockRemoteSource::new();
    remote.insert_value("S1", "K1", json!({"a": 1}));
    remote.insert_value("S1", "K2", json!([1, 2, 3]));
    remote.insert_value("S2", "K1", json!("other"));
    remote.insert_listing("S1", ["K1", "K2"]);
    remote.insert_listing("S2", ["K1"]);
    remote
}

pub fn seeded_cache() -> TestCache {
    let root = TempDir::new().expect("Failed to create temp dir");
    let remote = seeded_remote();
    let feed = Arc::new(ChangeFeed::default());
    let cache = open_cache(root.path(), remote.clone(), Arc::clone(&feed));

    TestCache {
        cache,
        remote,
        feed,
        root,
    }
}

/// Opens a cache over an existing storage root (e.g. to simulate a restart).
pub fn open_cache(
    root: &Path,
    remote: MockRemoteSource,
    feed: Arc<ChangeFeed>,
) -> Arc<MockDataLayerCache> {
    let config = Config {
        storage_root: Some(root.to_path_buf()),
        ..Config::default()
    };
    Arc::new(
        DataLayerCache::new_mock_with_config(&config, remote, feed).expect("should create cache"),
    )
}

pub fn cache_file(root: &Path, parts: &[&str]) -> PathBuf {
    let mut path = root.join("data_layer").join("cache");
    for part in parts {
        path.push(part);
    }
    path
}

/// Polls `check` until it holds, panicking after two seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

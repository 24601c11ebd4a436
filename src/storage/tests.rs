use super::*;
use serde_json::json;
use tempfile::TempDir;

fn create_test_tier() -> (DiskTier, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let tier = DiskTier::new(PathResolver::fixed(dir.path()));
    (tier, dir)
}

fn store(id: &str) -> StoreId {
    StoreId::new(id).expect("valid store id")
}

fn key(k: &str) -> EntryKey {
    EntryKey::new(k).expect("valid key")
}

#[test]
fn test_layout_paths() {
    let (tier, dir) = create_test_tier();
    let cache = dir.path().join("data_layer").join("cache");

    assert_eq!(tier.cache_directory().unwrap(), cache);
    assert_eq!(tier.store_path(&store("S1")).unwrap(), cache.join("S1"));
    assert_eq!(
        tier.entry_path(&store("S1"), &key("K1")).unwrap(),
        cache.join("S1").join("K1")
    );
    assert_eq!(
        tier.listing_path(&store("S1")).unwrap(),
        cache.join("S1").join(".keys")
    );
}

#[tokio::test]
async fn test_write_and_read_value() {
    let (tier, _dir) = create_test_tier();
    let value = json!({"a": 1, "nested": {"b": [1, 2, 3]}});

    let path = tier
        .write_value(&store("S1"), &key("K1"), &value)
        .await
        .expect("Failed to write");

    assert!(path.exists());
    let on_disk = std::fs::read_to_string(&path).expect("read back");
    assert_eq!(serde_json::from_str::<Value>(&on_disk).unwrap(), value);

    let read = tier
        .read_value(&store("S1"), &key("K1"))
        .await
        .expect("Failed to read");
    assert_eq!(read, value);
}

#[tokio::test]
async fn test_read_missing_is_not_found() {
    let (tier, _dir) = create_test_tier();

    let result = tier.read_value(&store("S1"), &key("missing")).await;
    assert!(matches!(result, Err(DiskError::NotFound { .. })));

    let result = tier.read_listing(&store("S1")).await;
    assert!(result.as_ref().is_err_and(|e| e.is_not_found()));
}

#[tokio::test]
async fn test_read_corrupt_file() {
    let (tier, _dir) = create_test_tier();
    let path = tier.entry_path(&store("S1"), &key("K1")).unwrap();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"{not json").unwrap();

    let result = tier.read_value(&store("S1"), &key("K1")).await;
    assert!(matches!(result, Err(DiskError::Corrupt { .. })));
}

#[tokio::test]
async fn test_read_directory_is_io_error() {
    let (tier, _dir) = create_test_tier();
    let path = tier.entry_path(&store("S1"), &key("K1")).unwrap();
    std::fs::create_dir_all(&path).unwrap();

    let result = tier.read_value(&store("S1"), &key("K1")).await;
    assert!(matches!(result, Err(DiskError::Io { .. })));
}

#[tokio::test]
async fn test_listing_and_same_named_entry_use_distinct_files() {
    let (tier, _dir) = create_test_tier();
    let s1 = store("S1");

    tier.write_listing(&s1, &KeyListing::new(vec!["S1".into(), "K2".into()]))
        .await
        .unwrap();
    tier.write_value(&s1, &key("S1"), &json!("entry named after store"))
        .await
        .unwrap();

    assert_eq!(
        tier.read_listing(&s1).await.unwrap().keys(),
        &["S1".to_string(), "K2".to_string()]
    );
    assert_eq!(
        tier.read_value(&s1, &key("S1")).await.unwrap(),
        json!("entry named after store")
    );
}

#[tokio::test]
async fn test_overwrite_replaces_file() {
    let (tier, _dir) = create_test_tier();

    tier.write_value(&store("S1"), &key("K1"), &json!(1))
        .await
        .unwrap();
    tier.write_value(&store("S1"), &key("K1"), &json!(2))
        .await
        .unwrap();

    assert_eq!(
        tier.read_value(&store("S1"), &key("K1")).await.unwrap(),
        json!(2)
    );

    let leftovers: Vec<_> = std::fs::read_dir(tier.store_path(&store("S1")).unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_delete_single_entry() {
    let (tier, _dir) = create_test_tier();
    let s1 = store("S1");

    tier.write_value(&s1, &key("a"), &json!(1)).await.unwrap();
    tier.write_value(&s1, &key("b"), &json!(2)).await.unwrap();

    assert!(tier.delete(&s1, Some(&key("a"))).await.unwrap());
    assert!(!tier.contains_value(&s1, &key("a")).await.unwrap());
    assert!(tier.contains_value(&s1, &key("b")).await.unwrap());
}

#[tokio::test]
async fn test_delete_whole_store() {
    let (tier, _dir) = create_test_tier();
    let s1 = store("S1");

    tier.write_value(&s1, &key("a"), &json!(1)).await.unwrap();
    tier.write_listing(&s1, &KeyListing::new(vec!["a".into()]))
        .await
        .unwrap();

    assert!(tier.delete(&s1, None).await.unwrap());
    assert!(!tier.store_path(&s1).unwrap().exists());
}

#[tokio::test]
async fn test_delete_missing_is_ok() {
    let (tier, _dir) = create_test_tier();

    assert!(!tier.delete(&store("S1"), Some(&key("a"))).await.unwrap());
    assert!(!tier.delete(&store("S1"), None).await.unwrap());
}

#[tokio::test]
async fn test_store_ids_and_clear() {
    let (tier, _dir) = create_test_tier();

    assert!(tier.store_ids().await.unwrap().is_empty());

    tier.write_value(&store("S2"), &key("a"), &json!(1))
        .await
        .unwrap();
    tier.write_value(&store("S1"), &key("a"), &json!(1))
        .await
        .unwrap();

    assert_eq!(tier.store_ids().await.unwrap(), vec![store("S1"), store("S2")]);

    assert!(tier.clear().await.unwrap());
    assert!(tier.store_ids().await.unwrap().is_empty());
    assert!(!tier.clear().await.unwrap());
}

#[tokio::test]
async fn test_concurrent_writes_to_same_key() {
    let (tier, _dir) = create_test_tier();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let tier = tier.clone();
            tokio::spawn(async move {
                tier.write_value(&store("S1"), &key("K1"), &json!(i)).await
            })
        })
        .collect();

    for handle in handles {
        handle.await.expect("join").expect("write");
    }

    let value = tier.read_value(&store("S1"), &key("K1")).await.unwrap();
    assert!(value.as_i64().is_some_and(|v| (0..8).contains(&v)));
}

//! Warm-cache round trips: persist, restart, hydrate, and the stale-file
//! age gate.

use std::collections::BTreeSet;

use serde_json::json;
use tempfile::TempDir;

use plexus_cache::{CacheFabric, MemoKey, WarmCache};
use plexus_core::config::{CacheConfig, WarmCacheConfig};
use plexus_core::model::{Direction, Node};

fn props(value: serde_json::Value) -> plexus_core::PropertyMap {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn user(id: &str, properties: serde_json::Value) -> Node {
    Node::new(id, "user", props(properties), vec!["read".into()])
}

fn warm_config(dir: &TempDir) -> WarmCacheConfig {
    WarmCacheConfig {
        directory: dir.path().to_path_buf(),
        ..WarmCacheConfig::default()
    }
}

#[tokio::test]
async fn persist_then_hydrate_restores_state() {
    let dir = TempDir::new().unwrap();
    let fabric = CacheFabric::new(CacheConfig::default());

    fabric.cache_node(user("u1", json!({"city": "NYC"})));
    fabric.cache_node(user("u2", json!({"city": "LA"})));
    // Push u1 over the popularity threshold (strictly greater than 5).
    for _ in 0..6 {
        fabric.get_node("u1");
    }
    let memo_key = MemoKey::new("u1", "KNOWS", Direction::Out);
    fabric.memo_put(memo_key.clone(), BTreeSet::from(["u2".to_string()]));
    for _ in 0..6 {
        fabric.memo_get(&memo_key);
    }

    let warm = WarmCache::new(warm_config(&dir));
    warm.persist(&fabric).await.unwrap();

    // A fresh instance over the same directory.
    let restarted = CacheFabric::new(CacheConfig::default());
    let warm = WarmCache::new(warm_config(&dir));
    warm.hydrate(&restarted).await;

    // Indexes and adjacency are back.
    let mut ids = restarted.ids_by_type("user");
    ids.sort();
    assert_eq!(ids, vec!["u1".to_string(), "u2".to_string()]);
    assert_eq!(
        restarted.ids_by_property("user", "city", &json!("NYC")),
        vec!["u1"]
    );
    // Popular node is materialized; the unpopular one is index-only.
    assert!(restarted.get_node("u1").is_some());
    assert!(restarted.get_node("u2").is_none());
    // Popular memo survives.
    assert_eq!(restarted.memo_get(&memo_key), Some(vec!["u2".to_string()]));
    // Access counters were restored to anchor popularity.
    assert!(restarted.stats().node_access_count("u1") >= 6);
}

#[tokio::test]
async fn missing_directory_hydrates_to_empty() {
    let dir = TempDir::new().unwrap();
    let fabric = CacheFabric::new(CacheConfig::default());
    let warm = WarmCache::new(WarmCacheConfig {
        directory: dir.path().join("never-written"),
        ..WarmCacheConfig::default()
    });
    warm.hydrate(&fabric).await;
    assert_eq!(fabric.node_count(), 0);
}

#[tokio::test]
async fn stale_files_are_deleted_and_ignored() {
    let dir = TempDir::new().unwrap();
    let fabric = CacheFabric::new(CacheConfig::default());
    fabric.cache_node(user("u1", json!({})));

    let warm = WarmCache::new(warm_config(&dir));
    warm.persist(&fabric).await.unwrap();

    // Age everything out instantly.
    let strict = WarmCache::new(WarmCacheConfig {
        directory: dir.path().to_path_buf(),
        max_cache_age_secs: 0,
        ..WarmCacheConfig::default()
    });
    let restarted = CacheFabric::new(CacheConfig::default());
    strict.hydrate(&restarted).await;

    assert_eq!(restarted.node_count(), 0);
    assert!(restarted.ids_by_type("user").is_empty());
    assert!(!dir.path().join("indexes.cache.json").exists());
    assert!(!dir.path().join("nodes.cache.json").exists());
    assert!(!dir.path().join("traversal.cache.json").exists());
}

#[tokio::test]
async fn corrupt_files_are_ignored() {
    let dir = TempDir::new().unwrap();
    tokio::fs::write(dir.path().join("indexes.cache.json"), b"not json")
        .await
        .unwrap();

    let fabric = CacheFabric::new(CacheConfig::default());
    let warm = WarmCache::new(warm_config(&dir));
    warm.hydrate(&fabric).await;
    assert_eq!(fabric.node_count(), 0);
}

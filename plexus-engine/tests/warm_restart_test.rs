//! Warm-cache restarts through the engine: persist, reopen, and answer
//! queries identically, over the filesystem backend.

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use plexus_core::config::{CacheConfig, WarmCacheConfig};
use plexus_engine::{Direction, FsBackend, GraphConfig, GraphEngine, PropertyMap};

fn props(value: serde_json::Value) -> PropertyMap {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn warm_config(store: &TempDir, warm: &TempDir) -> (Arc<FsBackend>, GraphConfig) {
    let backend = Arc::new(FsBackend::new(store.path()));
    let config = GraphConfig {
        cache: CacheConfig {
            warm: Some(WarmCacheConfig {
                directory: warm.path().to_path_buf(),
                ..WarmCacheConfig::default()
            }),
            ..CacheConfig::default()
        },
        ..GraphConfig::default()
    };
    (backend, config)
}

#[tokio::test]
async fn restart_with_warm_cache_answers_identically() {
    let store = TempDir::new().unwrap();
    let warm = TempDir::new().unwrap();

    let (backend, config) = warm_config(&store, &warm);
    let engine = GraphEngine::open(backend, config).await;

    let mut ids = Vec::new();
    for city in ["NYC", "LA", "NYC"] {
        let node = engine
            .create_node("user", props(json!({ "city": city })), vec!["read".into()], None)
            .await
            .unwrap();
        ids.push(node.id);
    }
    let rel_target = engine
        .create_node("user", props(json!({"city": "SF"})), vec!["read".into()], None)
        .await
        .unwrap();
    engine
        .create_relationship(&ids[0], &rel_target.id, "KNOWS", None, None, None)
        .await
        .unwrap();
    // Drive some traffic so ids[0] and its memo become popular.
    for _ in 0..7 {
        engine.get_node(&ids[0], None).await.unwrap();
        engine
            .query_related_nodes(&ids[0], "KNOWS", Some(Direction::Out), false, None)
            .await
            .unwrap();
    }

    let warm_answers = engine.query_nodes("user", None, None).await.unwrap();
    engine.flush_warm().await.unwrap();
    drop(engine);

    // Fresh engine, same backend and warm directory.
    let (backend, config) = warm_config(&store, &warm);
    let restarted = GraphEngine::open(backend, config).await;

    // Hydration brought the indexes back before any operation ran.
    assert!(restarted.fabric().has_type("user"));
    assert!(restarted.fabric().stats().node_access_count(&ids[0]) > 5);

    let cold_answers = restarted.query_nodes("user", None, None).await.unwrap();
    assert_eq!(sorted_ids(&warm_answers), sorted_ids(&cold_answers));

    // The hydrated memo answers the popular traversal.
    let related = restarted
        .query_related_nodes(&ids[0], "KNOWS", Some(Direction::Out), false, None)
        .await
        .unwrap();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].id, rel_target.id);
}

#[tokio::test]
async fn cold_start_without_warm_directory_is_correct() {
    let store = TempDir::new().unwrap();
    let warm = TempDir::new().unwrap();

    let (backend, config) = warm_config(&store, &warm);
    let engine = GraphEngine::open(backend, config).await;
    let node = engine
        .create_node("user", props(json!({})), vec!["read".into()], None)
        .await
        .unwrap();
    drop(engine);

    // Restart pointing at an empty warm directory: slower, never wrong.
    let empty_warm = TempDir::new().unwrap();
    let (backend, config) = warm_config(&store, &empty_warm);
    let restarted = GraphEngine::open(backend, config).await;

    let results = restarted.query_nodes("user", None, None).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, node.id);
}

fn sorted_ids(nodes: &[plexus_engine::Node]) -> Vec<String> {
    let mut ids: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
    ids.sort();
    ids
}

//! Filesystem backend: CRUD round-trips, not-found signaling, type and
//! key listings over a real temp directory.

use serde_json::json;
use tempfile::TempDir;

use plexus_core::model::{Node, Relationship};
use plexus_core::traits::GraphBackend;
use plexus_store::{FsBackend, KeyLayout};

fn props(value: serde_json::Value) -> plexus_core::PropertyMap {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn make_node(id: &str, node_type: &str) -> Node {
    Node::new(
        id,
        node_type,
        props(json!({"name": id})),
        vec!["read".into()],
    )
}

#[tokio::test]
async fn node_write_read_delete_roundtrip() {
    let dir = TempDir::new().unwrap();
    let backend = FsBackend::new(dir.path());
    let layout = KeyLayout::default();

    let node = make_node("n1", "user");
    let key = layout.node_key("user", "n1");

    backend.write_node(&key, &node).await.unwrap();
    let loaded = backend.read_node(&key).await.unwrap().expect("should exist");
    assert_eq!(loaded, node);

    assert!(backend.remove_node(&key).await.unwrap());
    assert!(backend.read_node(&key).await.unwrap().is_none());
    // Deleting again reports nothing was there.
    assert!(!backend.remove_node(&key).await.unwrap());
}

#[tokio::test]
async fn missing_key_is_none_not_error() {
    let dir = TempDir::new().unwrap();
    let backend = FsBackend::new(dir.path());
    let layout = KeyLayout::default();

    let key = layout.node_key("user", "ghost");
    assert!(backend.read_node(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn listings_cover_types_and_entities() {
    let dir = TempDir::new().unwrap();
    let backend = FsBackend::new(dir.path());
    let layout = KeyLayout::default();

    for id in ["a", "b", "c"] {
        let node = make_node(id, "user");
        backend
            .write_node(&layout.node_key("user", id), &node)
            .await
            .unwrap();
    }
    backend
        .write_node(&layout.node_key("group", "g1"), &make_node("g1", "group"))
        .await
        .unwrap();

    let mut types = backend.list_node_types().await.unwrap();
    types.sort();
    assert_eq!(types, vec!["group".to_string(), "user".to_string()]);

    let mut users: Vec<String> = backend
        .list_nodes_of_type("user")
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();
    users.sort();
    assert_eq!(users, vec!["a".to_string(), "b".to_string(), "c".to_string()]);

    let keys = backend.list_keys("nodes/user/").await.unwrap();
    assert_eq!(keys.len(), 3);
    assert!(keys.iter().all(|k| k.starts_with("nodes/user/")));
}

#[tokio::test]
async fn relationship_roundtrip_and_type_listing() {
    let dir = TempDir::new().unwrap();
    let backend = FsBackend::new(dir.path());
    let layout = KeyLayout::default();

    let mut rel = Relationship::new("alice", "bob", "FOLLOWS");
    rel.properties = Some(props(json!({"since": 2024})));
    let key = layout.relationship_key("FOLLOWS", "alice", "bob");

    backend.write_relationship(&key, &rel).await.unwrap();
    let loaded = backend
        .read_relationship(&key)
        .await
        .unwrap()
        .expect("should exist");
    assert_eq!(loaded, rel);

    assert_eq!(
        backend.list_relationship_types().await.unwrap(),
        vec!["FOLLOWS".to_string()]
    );
    let all = backend.list_relationships_of_type("FOLLOWS").await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].from, "alice");
}

#[tokio::test]
async fn empty_store_lists_nothing() {
    let dir = TempDir::new().unwrap();
    let backend = FsBackend::new(dir.path());

    assert!(backend.list_node_types().await.unwrap().is_empty());
    assert!(backend.list_nodes_of_type("user").await.unwrap().is_empty());
    assert!(backend.list_keys("nodes/").await.unwrap().is_empty());
}

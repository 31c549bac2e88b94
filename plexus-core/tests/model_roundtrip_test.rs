//! Serde round-trip guarantees for the wire contract: a node or
//! relationship survives serialize → deserialize unchanged.

use proptest::prelude::*;
use serde_json::json;

use plexus_core::{Node, Relationship};

fn props(value: serde_json::Value) -> plexus_core::PropertyMap {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[test]
fn node_round_trips_through_json() {
    let node = Node::new(
        "test-id-123",
        "user",
        props(json!({
            "name": "Alice",
            "age": 30,
            "tags": ["a", "b"],
            "nested": {"city": "NYC", "zip": null}
        })),
        vec!["read".into(), "write".into()],
    );

    let encoded = serde_json::to_string(&node).unwrap();
    let decoded: Node = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, node);
}

#[test]
fn node_wire_field_names_match_layout() {
    let node = Node::new("n1", "user", props(json!({})), vec!["read".into()]);
    let value = serde_json::to_value(&node).unwrap();
    assert_eq!(value["id"], "n1");
    assert_eq!(value["type"], "user");
    assert_eq!(value["version"], 1);
    assert!(value.get("node_type").is_none());
}

#[test]
fn relationship_round_trips_and_omits_absent_fields() {
    let rel = Relationship::new("a", "b", "FOLLOWS");
    let value = serde_json::to_value(&rel).unwrap();
    assert_eq!(value["from"], "a");
    assert_eq!(value["to"], "b");
    assert_eq!(value["type"], "FOLLOWS");
    assert!(value.get("properties").is_none());
    assert!(value.get("permissions").is_none());

    let decoded: Relationship = serde_json::from_value(value).unwrap();
    assert_eq!(decoded, rel);
}

proptest! {
    #[test]
    fn prop_node_json_roundtrip(
        id in "[a-z0-9-]{1,32}",
        node_type in "[A-Za-z0-9_-]{1,20}",
        name in ".*",
        count in any::<i64>(),
    ) {
        let node = Node::new(
            &id,
            &node_type,
            props(json!({"name": name, "count": count})),
            vec!["read".to_string()],
        );
        let encoded = serde_json::to_string(&node).unwrap();
        let decoded: Node = serde_json::from_str(&encoded).unwrap();
        prop_assert_eq!(decoded, node);
    }
}

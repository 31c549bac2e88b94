//! Structural and safety checks on entities and query limits.
//!
//! Every failure names the offending field so the error payload is
//! actionable at the boundary.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::constants::{
    DEFAULT_QUERY_LIMIT, MAX_PERMISSION_TOKEN_LEN, MAX_PROPERTY_DEPTH, MAX_PROPERTY_KEYS,
    MAX_PROPERTY_KEY_LEN, MAX_PROPERTY_VALUE_BYTES, MAX_QUERY_LIMIT, MAX_TYPE_TAG_LEN,
    RESERVED_PROPERTY_KEYS,
};
use crate::errors::{GraphError, GraphResult};
use crate::model::{Node, NodeUpdate, PropertyMap, Relationship, RelationshipUpdate};

fn type_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap())
}

fn property_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").unwrap())
}

/// Validate a type tag (node or relationship).
pub fn type_tag(tag: &str, field: &str) -> GraphResult<()> {
    if tag.is_empty() {
        return Err(GraphError::validation(field, "type tag must not be empty"));
    }
    if tag.len() > MAX_TYPE_TAG_LEN {
        return Err(GraphError::validation(
            field,
            format!("type tag exceeds {MAX_TYPE_TAG_LEN} characters"),
        ));
    }
    if !type_tag_re().is_match(tag) {
        return Err(GraphError::Validation {
            field: field.to_string(),
            reason: "type tag must match [A-Za-z0-9_-]+".to_string(),
            value: Some(Value::String(tag.to_string())),
        });
    }
    Ok(())
}

/// Validate a permission set that must be present and non-empty.
pub fn permission_set(permissions: &[String], field: &str) -> GraphResult<()> {
    if permissions.is_empty() {
        return Err(GraphError::validation(
            field,
            "permission set must not be empty",
        ));
    }
    for token in permissions {
        if token.is_empty() || token.len() > MAX_PERMISSION_TOKEN_LEN {
            return Err(GraphError::Validation {
                field: field.to_string(),
                reason: format!(
                    "permission tokens must be 1-{MAX_PERMISSION_TOKEN_LEN} characters"
                ),
                value: Some(Value::String(token.clone())),
            });
        }
    }
    Ok(())
}

/// Validate a full property map: key shape, reserved keys, value sizes,
/// and nesting depth, recursively.
pub fn property_map(properties: &PropertyMap, field: &str) -> GraphResult<()> {
    if properties.len() > MAX_PROPERTY_KEYS {
        return Err(GraphError::validation(
            field,
            format!("property map exceeds {MAX_PROPERTY_KEYS} top-level keys"),
        ));
    }
    for (key, value) in properties {
        property_key(key, field)?;
        let serialized = serde_json::to_string(value)?;
        if serialized.len() > MAX_PROPERTY_VALUE_BYTES {
            return Err(GraphError::validation(
                format!("{field}.{key}"),
                format!("serialized value exceeds {MAX_PROPERTY_VALUE_BYTES} bytes"),
            ));
        }
        property_value(value, &format!("{field}.{key}"), 1)?;
    }
    Ok(())
}

fn property_key(key: &str, field: &str) -> GraphResult<()> {
    if key.is_empty() || key.len() > MAX_PROPERTY_KEY_LEN {
        return Err(GraphError::Validation {
            field: field.to_string(),
            reason: format!("property keys must be 1-{MAX_PROPERTY_KEY_LEN} characters"),
            value: Some(Value::String(key.to_string())),
        });
    }
    if RESERVED_PROPERTY_KEYS.contains(&key) {
        return Err(GraphError::Validation {
            field: field.to_string(),
            reason: "property key is reserved".to_string(),
            value: Some(Value::String(key.to_string())),
        });
    }
    if !property_key_re().is_match(key) {
        return Err(GraphError::Validation {
            field: field.to_string(),
            reason: "property key must match [A-Za-z0-9_.-]+".to_string(),
            value: Some(Value::String(key.to_string())),
        });
    }
    Ok(())
}

/// Reserved-key and depth checks apply through nested maps and lists.
fn property_value(value: &Value, field: &str, depth: usize) -> GraphResult<()> {
    if depth > MAX_PROPERTY_DEPTH {
        return Err(GraphError::validation(
            field,
            format!("nesting exceeds {MAX_PROPERTY_DEPTH} levels"),
        ));
    }
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                property_key(key, field)?;
                property_value(nested, &format!("{field}.{key}"), depth + 1)?;
            }
        }
        Value::Array(items) => {
            for item in items {
                property_value(item, field, depth + 1)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Validate a node for creation.
pub fn node_for_create(node: &Node) -> GraphResult<()> {
    type_tag(&node.node_type, "type")?;
    property_map(&node.properties, "properties")?;
    permission_set(&node.permissions, "permissions")?;
    Ok(())
}

/// Validate a node update payload. Identity fields are unrepresentable in
/// `NodeUpdate`, so only emptiness and payload shape need checking.
pub fn node_for_update(update: &NodeUpdate) -> GraphResult<()> {
    if update.is_empty() {
        return Err(GraphError::validation(
            "update",
            "update payload must not be empty",
        ));
    }
    if let Some(props) = &update.properties {
        property_map(props, "properties")?;
    }
    if let Some(perms) = &update.permissions {
        permission_set(perms, "permissions")?;
    }
    Ok(())
}

/// Validate a relationship for creation.
pub fn relationship(rel: &Relationship) -> GraphResult<()> {
    type_tag(&rel.rel_type, "type")?;
    if rel.from.is_empty() {
        return Err(GraphError::validation("from", "source id must not be empty"));
    }
    if rel.to.is_empty() {
        return Err(GraphError::validation("to", "target id must not be empty"));
    }
    if let Some(props) = &rel.properties {
        property_map(props, "properties")?;
    }
    if let Some(perms) = &rel.permissions {
        permission_set(perms, "permissions")?;
    }
    Ok(())
}

/// Validate a relationship update payload.
pub fn relationship_for_update(update: &RelationshipUpdate) -> GraphResult<()> {
    if update.is_empty() {
        return Err(GraphError::validation(
            "update",
            "update payload must not be empty",
        ));
    }
    if let Some(props) = &update.properties {
        property_map(props, "properties")?;
    }
    if let Some(perms) = &update.permissions {
        permission_set(perms, "permissions")?;
    }
    Ok(())
}

/// Resolve and validate a query limit. `None` takes the default; zero is
/// rejected; values above the ceiling fail with the limit payload.
pub fn query_limit(limit: Option<usize>) -> GraphResult<usize> {
    let limit = limit.unwrap_or(DEFAULT_QUERY_LIMIT);
    if limit == 0 {
        return Err(GraphError::validation("limit", "limit must be positive"));
    }
    if limit > MAX_QUERY_LIMIT {
        return Err(GraphError::QueryLimitExceeded {
            requested: limit,
            max: MAX_QUERY_LIMIT,
        });
    }
    Ok(limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> PropertyMap {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn valid_node() -> Node {
        Node::new(
            "n1",
            "user",
            props(json!({"name": "Alice"})),
            vec!["read".into()],
        )
    }

    #[test]
    fn accepts_a_plain_node() {
        assert!(node_for_create(&valid_node()).is_ok());
    }

    #[test]
    fn rejects_empty_type_tag() {
        let mut node = valid_node();
        node.node_type = String::new();
        let err = node_for_create(&node).unwrap_err();
        assert!(matches!(err, GraphError::Validation { ref field, .. } if field == "type"));
    }

    #[test]
    fn rejects_type_tag_with_spaces() {
        let mut node = valid_node();
        node.node_type = "user profile".into();
        assert!(node_for_create(&node).is_err());
    }

    #[test]
    fn rejects_reserved_keys_at_depth() {
        let mut node = valid_node();
        node.properties = props(json!({"meta": {"__proto__": 1}}));
        let err = node_for_create(&node).unwrap_err();
        assert!(matches!(err, GraphError::Validation { ref reason, .. }
            if reason.contains("reserved")));
    }

    #[test]
    fn rejects_reserved_keys_inside_lists() {
        let mut node = valid_node();
        node.properties = props(json!({"items": [{"constructor": true}]}));
        assert!(node_for_create(&node).is_err());
    }

    #[test]
    fn rejects_empty_permission_set() {
        let mut node = valid_node();
        node.permissions.clear();
        assert!(node_for_create(&node).is_err());
    }

    #[test]
    fn rejects_oversized_permission_token() {
        let mut node = valid_node();
        node.permissions = vec!["x".repeat(51)];
        assert!(node_for_create(&node).is_err());
    }

    #[test]
    fn rejects_empty_update() {
        let err = node_for_update(&NodeUpdate::default()).unwrap_err();
        assert!(matches!(err, GraphError::Validation { ref field, .. } if field == "update"));
    }

    #[test]
    fn rejects_excessive_nesting() {
        let mut value = json!(1);
        for _ in 0..40 {
            value = json!({ "n": value });
        }
        let mut node = valid_node();
        node.properties = props(json!({ "deep": value }));
        assert!(node_for_create(&node).is_err());
    }

    #[test]
    fn query_limit_defaults_and_caps() {
        assert_eq!(query_limit(None).unwrap(), 1000);
        assert_eq!(query_limit(Some(10_000)).unwrap(), 10_000);
        assert!(query_limit(Some(0)).is_err());
        let err = query_limit(Some(10_001)).unwrap_err();
        assert!(matches!(
            err,
            GraphError::QueryLimitExceeded {
                requested: 10_001,
                max: 10_000
            }
        ));
    }

    #[test]
    fn relationship_requires_endpoints() {
        let rel = Relationship::new("", "b", "KNOWS");
        assert!(relationship(&rel).is_err());
        let rel = Relationship::new("a", "b", "KNOWS");
        assert!(relationship(&rel).is_ok());
    }
}

use serde::{Deserialize, Serialize};

use super::PropertyMap;

/// A typed, permissioned, versioned vertex.
///
/// The id and type are immutable after creation; only properties and
/// permissions move through the update path, which bumps `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Opaque identifier, unique across the store.
    pub id: String,
    /// Short type tag, immutable after creation.
    #[serde(rename = "type")]
    pub node_type: String,
    /// Open-ended property map.
    #[serde(default)]
    pub properties: PropertyMap,
    /// Non-empty set of permission tokens.
    pub permissions: Vec<String>,
    /// Monotonic version counter, starts at 1.
    pub version: u64,
}

impl Node {
    /// Build a version-1 node. The engine assigns ids; tests use this too.
    pub fn new(
        id: impl Into<String>,
        node_type: impl Into<String>,
        properties: PropertyMap,
        permissions: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            properties,
            permissions,
            version: 1,
        }
    }
}

/// Mutable slice of a node carried by the update path. Identity fields are
/// unrepresentable here, so an update can never retarget id or type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeUpdate {
    /// Replacement property map, merged key-by-key over the stored one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertyMap>,
    /// Replacement permission set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    /// Optimistic concurrency check; `None` updates unconditionally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
}

impl NodeUpdate {
    /// Whether the update carries any change at all.
    pub fn is_empty(&self) -> bool {
        self.properties.is_none() && self.permissions.is_none()
    }
}

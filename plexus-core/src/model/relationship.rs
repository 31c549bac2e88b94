use serde::{Deserialize, Serialize};

use super::PropertyMap;

/// A typed, directed, permissioned, versioned edge.
///
/// Identity is the (from, to, type) triple; at most one relationship
/// exists per triple. Endpoints and type are immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Source node id.
    pub from: String,
    /// Target node id.
    pub to: String,
    /// Relationship type tag.
    #[serde(rename = "type")]
    pub rel_type: String,
    /// Optional property map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertyMap>,
    /// Optional permission set. Absent means unrestricted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    /// Monotonic version counter, starts at 1.
    pub version: u64,
}

impl Relationship {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        rel_type: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            rel_type: rel_type.into(),
            properties: None,
            permissions: None,
            version: 1,
        }
    }

    /// Canonical `from|to|type` key used by the relationship cache.
    pub fn triple_key(&self) -> String {
        format!("{}|{}|{}", self.from, self.to, self.rel_type)
    }
}

/// Mutable slice of a relationship carried by the update path. Only
/// properties and permissions may change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationshipUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertyMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    /// Optimistic concurrency check; `None` updates unconditionally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
}

impl RelationshipUpdate {
    /// Whether the update carries any change at all.
    pub fn is_empty(&self) -> bool {
        self.properties.is_none() && self.permissions.is_none()
    }
}

//! The graph data model: typed, permissioned, versioned nodes and
//! directed relationships with open-ended JSON property maps.

mod node;
mod relationship;

pub use node::{Node, NodeUpdate};
pub use relationship::{Relationship, RelationshipUpdate};

use serde::{Deserialize, Serialize};

/// Open property map. `serde_json::Value` is the canonical sum type over
/// scalar / string / number / bool / null / list / nested map, and JSON
/// round-tripping is the wire contract.
pub type PropertyMap = serde_json::Map<String, serde_json::Value>;

/// Traversal direction relative to the source node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Endpoints the source points to.
    Out,
    /// Endpoints that point to the source.
    In,
    /// Union of both.
    Both,
}

impl Direction {
    /// Stable label used in memo keys and warm-cache files.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Out => "out",
            Direction::In => "in",
            Direction::Both => "both",
        }
    }
}

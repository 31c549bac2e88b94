//! Error taxonomy for the graph store. Every kind carries the structured
//! payload that surfaces verbatim at the engine boundary.

use serde_json::Value;

/// Convenience alias used across the workspace.
pub type GraphResult<T> = Result<T, GraphError>;

/// All failure kinds the engine distinguishes.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("validation failed on `{field}`: {reason}")]
    Validation {
        field: String,
        reason: String,
        /// The offending value, when one exists and is cheap to carry.
        value: Option<Value>,
    },

    #[error("permission denied on {resource}: requires one of {required:?}, caller holds {actual:?}")]
    PermissionDenied {
        required: Vec<String>,
        actual: Vec<String>,
        resource: String,
    },

    #[error("node not found: {id}")]
    NodeNotFound { id: String },

    #[error("relationship not found: {from} -[{rel_type}]-> {to}")]
    RelationshipNotFound {
        from: String,
        to: String,
        rel_type: String,
    },

    #[error("relationship already exists: {from} -[{rel_type}]-> {to}")]
    DuplicateRelationship {
        from: String,
        to: String,
        rel_type: String,
    },

    #[error("concurrent modification on {resource}: expected version {expected}, actual {actual}")]
    ConcurrentModification {
        resource: String,
        expected: u64,
        actual: u64,
    },

    #[error("query limit {requested} exceeds maximum {max}")]
    QueryLimitExceeded { requested: usize, max: usize },

    #[error("backend {op} failed: {message}")]
    Backend { op: String, message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    /// Build a backend error from any IO-ish failure, tagging the operation.
    pub fn backend(op: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Backend {
            op: op.into(),
            message: err.to_string(),
        }
    }

    /// Build a validation error naming the offending field.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
            value: None,
        }
    }
}

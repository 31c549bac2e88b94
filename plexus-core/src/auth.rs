//! Permission gate: admin bypass plus permission-set intersection.
//!
//! Pure functions only — the gate never suspends and never touches IO.

use serde::{Deserialize, Serialize};

use crate::errors::{GraphError, GraphResult};

/// Caller identity for every engine operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthContext {
    /// Permission tokens the caller holds.
    pub permissions: Vec<String>,
    /// Admin callers bypass all permission checks.
    pub is_admin: bool,
}

impl AuthContext {
    /// An admin context.
    pub fn admin() -> Self {
        Self {
            permissions: Vec::new(),
            is_admin: true,
        }
    }

    /// A non-admin context holding the given tokens.
    pub fn with_permissions(permissions: Vec<String>) -> Self {
        Self {
            permissions,
            is_admin: false,
        }
    }

    /// Admin, or non-empty intersection with the entity's permission set.
    pub fn can_access(&self, entity_permissions: &[String]) -> bool {
        if self.is_admin {
            return true;
        }
        entity_permissions
            .iter()
            .any(|p| self.permissions.iter().any(|own| own == p))
    }

    /// Visibility for entities whose permission set is optional.
    /// An absent or empty set is unrestricted.
    pub fn can_access_opt(&self, entity_permissions: Option<&Vec<String>>) -> bool {
        match entity_permissions {
            Some(perms) if !perms.is_empty() => self.can_access(perms),
            _ => true,
        }
    }

    /// Gate a mutating call, producing the structured denial payload.
    pub fn require_access(
        &self,
        entity_permissions: &[String],
        resource: &str,
    ) -> GraphResult<()> {
        if self.can_access(entity_permissions) {
            Ok(())
        } else {
            Err(GraphError::PermissionDenied {
                required: entity_permissions.to_vec(),
                actual: self.permissions.clone(),
                resource: resource.to_string(),
            })
        }
    }
}

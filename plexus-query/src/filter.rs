//! Recursive filter trees. Leaves compare a resolved field against a
//! value; non-leaves combine children with and/or/not. An absent filter
//! matches everything; a missing field makes any comparison leaf false.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use plexus_core::model::Node;

/// Leaf comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Contains,
    StartsWith,
    EndsWith,
}

/// Logical combinators for non-leaf filter nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicOp {
    And,
    Or,
    Not,
}

/// A filter tree node. The two shapes are distinguished by their fields,
/// so the JSON form needs no tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Filter {
    Logic { logic: LogicOp, filters: Vec<Filter> },
    Leaf {
        field: String,
        op: FilterOp,
        value: Value,
    },
}

impl Filter {
    /// Shorthand for an equality leaf.
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Filter::Leaf {
            field: field.into(),
            op: FilterOp::Eq,
            value,
        }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::Logic {
            logic: LogicOp::And,
            filters,
        }
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Logic {
            logic: LogicOp::Or,
            filters,
        }
    }

    pub fn not(filters: Vec<Filter>) -> Self {
        Filter::Logic {
            logic: LogicOp::Not,
            filters,
        }
    }

    /// Evaluate this tree against a node.
    pub fn matches(&self, node: &Node) -> bool {
        match self {
            Filter::Logic { logic, filters } => match logic {
                LogicOp::And => filters.iter().all(|f| f.matches(node)),
                LogicOp::Or => filters.iter().any(|f| f.matches(node)),
                LogicOp::Not => !filters.iter().all(|f| f.matches(node)),
            },
            Filter::Leaf { field, op, value } => match resolve_field(node, field) {
                Some(resolved) => eval_leaf(&resolved, *op, value),
                None => false,
            },
        }
    }
}

/// Resolve a field path against a node: `type`, or `properties.<dotted>`.
/// A missing intermediate yields `None`.
pub fn resolve_field(node: &Node, path: &str) -> Option<Value> {
    if path == "type" {
        return Some(Value::String(node.node_type.clone()));
    }
    let rest = path.strip_prefix("properties.")?;
    let mut segments = rest.split('.');
    let first = segments.next()?;
    let mut current = node.properties.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current.clone())
}

/// Numeric equality is by value, so `30` and `30.0` compare equal the way
/// they do in JSON-producing clients.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Ordering for gt/gte/lt/lte. Incomparable kinds yield `None`, which
/// makes the leaf false.
fn compare_values(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => Some(a.as_f64()?.total_cmp(&b.as_f64()?)),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn eval_leaf(resolved: &Value, op: FilterOp, value: &Value) -> bool {
    use std::cmp::Ordering::*;
    match op {
        FilterOp::Eq => values_equal(resolved, value),
        FilterOp::Ne => !values_equal(resolved, value),
        FilterOp::Gt => matches!(compare_values(resolved, value), Some(Greater)),
        FilterOp::Gte => matches!(compare_values(resolved, value), Some(Greater | Equal)),
        FilterOp::Lt => matches!(compare_values(resolved, value), Some(Less)),
        FilterOp::Lte => matches!(compare_values(resolved, value), Some(Less | Equal)),
        FilterOp::In => value
            .as_array()
            .is_some_and(|items| items.iter().any(|item| values_equal(resolved, item))),
        FilterOp::Nin => value
            .as_array()
            .is_some_and(|items| !items.iter().any(|item| values_equal(resolved, item))),
        FilterOp::Contains => match (resolved, value) {
            (Value::String(s), Value::String(needle)) => s.contains(needle.as_str()),
            _ => false,
        },
        FilterOp::StartsWith => match (resolved, value) {
            (Value::String(s), Value::String(prefix)) => s.starts_with(prefix.as_str()),
            _ => false,
        },
        FilterOp::EndsWith => match (resolved, value) {
            (Value::String(s), Value::String(suffix)) => s.ends_with(suffix.as_str()),
            _ => false,
        },
    }
}

/// The type this filter pins with a top-level `type = T` equality, if any.
/// Only `and` conjunctions are searched; `or`/`not` cannot restrict
/// candidates safely.
pub fn implied_type(filter: &Filter) -> Option<String> {
    match filter {
        Filter::Leaf { field, op, value } if field == "type" && *op == FilterOp::Eq => {
            value.as_str().map(str::to_string)
        }
        Filter::Logic {
            logic: LogicOp::And,
            filters,
        } => filters.iter().find_map(implied_type),
        _ => None,
    }
}

/// A top-level `properties.<name> = V` equality usable against the
/// property index. Only single-segment paths are indexed.
pub fn implied_property_eq(filter: &Filter) -> Option<(String, Value)> {
    match filter {
        Filter::Leaf { field, op, value } if *op == FilterOp::Eq => {
            let prop = field.strip_prefix("properties.")?;
            if prop.is_empty() || prop.contains('.') {
                return None;
            }
            Some((prop.to_string(), value.clone()))
        }
        Filter::Logic {
            logic: LogicOp::And,
            filters,
        } => filters.iter().find_map(implied_property_eq),
        _ => None,
    }
}

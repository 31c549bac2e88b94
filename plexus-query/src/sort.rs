//! Stable multi-key sort over resolved field values. Nulls and missing
//! fields sort before non-nulls in ascending order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use plexus_core::model::Node;

use crate::filter::resolve_field;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One sort key: a field path plus a direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Sort in place. `Vec::sort_by` is stable, so equal keys keep their
/// input order across all sort keys.
pub fn sort_nodes(nodes: &mut [Node], specs: &[SortSpec]) {
    if specs.is_empty() {
        return;
    }
    nodes.sort_by(|a, b| {
        for spec in specs {
            let va = resolve_field(a, &spec.field);
            let vb = resolve_field(b, &spec.field);
            let ordering = compare_resolved(va.as_ref(), vb.as_ref());
            let ordering = match spec.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Missing and null are the lowest values; across kinds, a fixed rank
/// applies; within a kind, natural ordering with a JSON-text fallback.
fn compare_resolved(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (normalize(a), normalize(b)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare_present(x, y),
    }
}

fn normalize(value: Option<&Value>) -> Option<&Value> {
    match value {
        Some(Value::Null) | None => None,
        other => other,
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_present(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => {
            let x = a.as_f64().unwrap_or(f64::NAN);
            let y = b.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => kind_rank(a)
            .cmp(&kind_rank(b))
            .then_with(|| a.to_string().cmp(&b.to_string())),
    }
}

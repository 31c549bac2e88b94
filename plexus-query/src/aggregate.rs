//! Aggregations: count/sum/avg/min/max over resolved fields, with
//! optional group-by. Non-numeric and absent values are skipped, and the
//! average's denominator counts only the values that participated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use plexus_core::model::Node;

use crate::filter::resolve_field;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateOp {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateOp {
    fn name(self) -> &'static str {
        match self {
            AggregateOp::Count => "count",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
        }
    }
}

/// One requested aggregation. `field` is ignored for count; the alias
/// defaults to `op` or `op_field`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aggregation {
    pub op: AggregateOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Aggregation {
    pub fn new(op: AggregateOp, field: impl Into<String>) -> Self {
        Self {
            op,
            field: Some(field.into()),
            alias: None,
        }
    }

    pub fn count() -> Self {
        Self {
            op: AggregateOp::Count,
            field: None,
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    fn output_name(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        match &self.field {
            Some(field) => format!("{}_{}", self.op.name(), field.replace('.', "_")),
            None => self.op.name().to_string(),
        }
    }
}

/// Compute aggregations over a matched node set. Without group-by the
/// result is `{alias: value}`; with group-by it is keyed by the composite
/// group key and carries both the group values and the aggregates.
pub fn compute(nodes: &[Node], aggregations: &[Aggregation], group_by: &[String]) -> Value {
    if group_by.is_empty() {
        return Value::Object(aggregate_set(nodes, aggregations));
    }

    let mut groups: BTreeMap<String, (Map<String, Value>, Vec<&Node>)> = BTreeMap::new();
    for node in nodes {
        let mut key_parts = Vec::with_capacity(group_by.len());
        let mut group_values = Map::new();
        for field in group_by {
            let value = resolve_field(node, field).unwrap_or(Value::Null);
            key_parts.push(match &value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
            group_values.insert(field.clone(), value);
        }
        let key = key_parts.join("__");
        groups
            .entry(key)
            .or_insert_with(|| (group_values, Vec::new()))
            .1
            .push(node);
    }

    let mut out = Map::new();
    for (key, (group_values, members)) in groups {
        let mut entry = Map::new();
        entry.insert("group".to_string(), Value::Object(group_values));
        let members: Vec<Node> = members.into_iter().cloned().collect();
        for (name, value) in aggregate_set(&members, aggregations) {
            entry.insert(name, value);
        }
        out.insert(key, Value::Object(entry));
    }
    Value::Object(out)
}

fn aggregate_set(nodes: &[Node], aggregations: &[Aggregation]) -> Map<String, Value> {
    let mut out = Map::new();
    for agg in aggregations {
        out.insert(agg.output_name(), aggregate_one(nodes, agg));
    }
    out
}

fn aggregate_one(nodes: &[Node], agg: &Aggregation) -> Value {
    if agg.op == AggregateOp::Count {
        return json!(nodes.len());
    }
    let Some(field) = &agg.field else {
        return Value::Null;
    };
    let values: Vec<f64> = nodes
        .iter()
        .filter_map(|node| resolve_field(node, field).and_then(|v| v.as_f64()))
        .collect();
    if values.is_empty() {
        return Value::Null;
    }
    let result = match agg.op {
        AggregateOp::Count => unreachable!(),
        AggregateOp::Sum => values.iter().sum(),
        AggregateOp::Avg => values.iter().sum::<f64>() / values.len() as f64,
        AggregateOp::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        AggregateOp::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    };
    json!(result)
}

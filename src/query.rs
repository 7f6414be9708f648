//! Structured pattern queries over a snapshot.
//!
//! A query matches relationships by optional source/relationship/target
//! kind, then applies attribute filters. Kind values are plain strings so
//! callers can pass anything; unknown kinds simply match nothing. Results
//! are a lazy iterator over a pre-ordered match list, so re-running the
//! same query against the same snapshot yields identical rows.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::ContextGraphError;
use crate::graph::{Entity, GraphSnapshot, Relationship, RelationshipId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Contains,
    IsNull,
    IsNotNull,
}

impl FilterOp {
    pub fn parse(value: &str) -> Result<FilterOp, ContextGraphError> {
        match value.to_ascii_lowercase().as_str() {
            "eq" => Ok(FilterOp::Eq),
            "neq" => Ok(FilterOp::Neq),
            "contains" => Ok(FilterOp::Contains),
            "isnull" | "is_null" => Ok(FilterOp::IsNull),
            "isnotnull" | "is_not_null" => Ok(FilterOp::IsNotNull),
            other => Err(ContextGraphError::unsupported_operator(other)),
        }
    }

    fn needs_value(&self) -> bool {
        matches!(self, FilterOp::Eq | FilterOp::Neq | FilterOp::Contains)
    }
}

/// One attribute predicate. `field` may be scoped with a `source.`,
/// `target.`, or `rel.` prefix; an unscoped field is satisfied when any of
/// the three attribute maps satisfies the predicate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttributeFilter {
    pub field: String,
    pub op: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

impl AttributeFilter {
    pub fn new(field: &str, op: &str, value: serde_json::Value) -> Self {
        Self {
            field: field.to_string(),
            op: op.to_string(),
            value: Some(value),
        }
    }

    pub fn without_value(field: &str, op: &str) -> Self {
        Self {
            field: field.to_string(),
            op: op.to_string(),
            value: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatternQuery {
    #[serde(default)]
    pub source_kind: Option<String>,
    #[serde(default)]
    pub relationship_kind: Option<String>,
    #[serde(default)]
    pub target_kind: Option<String>,
    #[serde(default)]
    pub filters: Vec<AttributeFilter>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryRow {
    pub source: Entity,
    pub relationship: Relationship,
    pub target: Entity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterScope {
    Source,
    Target,
    Relationship,
    Any,
}

struct CompiledFilter {
    scope: FilterScope,
    field: String,
    op: FilterOp,
    value: Option<serde_json::Value>,
}

/// Lazy, restartable row sequence. Cloning restarts from the beginning.
#[derive(Clone, Debug)]
pub struct QueryRows {
    snapshot: Arc<GraphSnapshot>,
    matched: Arc<Vec<RelationshipId>>,
    cursor: usize,
}

impl QueryRows {
    pub fn len(&self) -> usize {
        self.matched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matched.is_empty()
    }

    pub fn restart(&self) -> QueryRows {
        QueryRows {
            snapshot: self.snapshot.clone(),
            matched: self.matched.clone(),
            cursor: 0,
        }
    }
}

impl Iterator for QueryRows {
    type Item = QueryRow;

    fn next(&mut self) -> Option<QueryRow> {
        while self.cursor < self.matched.len() {
            let rel_id = self.matched[self.cursor];
            self.cursor += 1;
            let Some(rel) = self.snapshot.relationship(rel_id) else {
                continue;
            };
            let (Some(source), Some(target)) = (
                self.snapshot.entity(rel.source_id),
                self.snapshot.entity(rel.target_id),
            ) else {
                continue;
            };
            return Some(QueryRow {
                source: source.clone(),
                relationship: rel.clone(),
                target: target.clone(),
            });
        }
        None
    }
}

/// Evaluate `query` against `snapshot`. Filter operators are validated up
/// front; everything else degrades to an empty result rather than an error.
pub fn run_query(
    snapshot: &Arc<GraphSnapshot>,
    query: &PatternQuery,
) -> Result<QueryRows, ContextGraphError> {
    let compiled = compile_filters(&query.filters)?;
    let mut matched: Vec<RelationshipId> = Vec::new();
    for rel_id in snapshot.relationship_ids() {
        let Some(rel) = snapshot.relationship(*rel_id) else {
            continue;
        };
        let (Some(source), Some(target)) = (
            snapshot.entity(rel.source_id),
            snapshot.entity(rel.target_id),
        ) else {
            continue;
        };
        if let Some(kind) = &query.source_kind {
            if source.kind.as_str() != kind {
                continue;
            }
        }
        if let Some(kind) = &query.relationship_kind {
            if rel.kind.as_str() != kind {
                continue;
            }
        }
        if let Some(kind) = &query.target_kind {
            if target.kind.as_str() != kind {
                continue;
            }
        }
        if compiled
            .iter()
            .all(|filter| filter_matches(filter, source, rel, target))
        {
            matched.push(*rel_id);
        }
    }
    let mut keyed: Vec<(&str, &str, RelationshipId)> = matched
        .into_iter()
        .map(|rel_id| row_key(snapshot, rel_id))
        .collect();
    keyed.sort();
    let matched: Vec<RelationshipId> = keyed.into_iter().map(|(_, _, rel_id)| rel_id).collect();
    tracing::debug!(rows = matched.len(), "pattern query evaluated");
    Ok(QueryRows {
        snapshot: snapshot.clone(),
        matched: Arc::new(matched),
        cursor: 0,
    })
}

fn row_key(snapshot: &GraphSnapshot, rel_id: RelationshipId) -> (&str, &str, RelationshipId) {
    let rel = snapshot.relationship(rel_id);
    let source_name = rel
        .and_then(|r| snapshot.entity(r.source_id))
        .map(|e| e.name.as_str())
        .unwrap_or_default();
    let target_name = rel
        .and_then(|r| snapshot.entity(r.target_id))
        .map(|e| e.name.as_str())
        .unwrap_or_default();
    (source_name, target_name, rel_id)
}

fn compile_filters(
    filters: &[AttributeFilter],
) -> Result<Vec<CompiledFilter>, ContextGraphError> {
    filters
        .iter()
        .map(|filter| {
            let op = FilterOp::parse(&filter.op)?;
            if op.needs_value() && filter.value.is_none() {
                return Err(ContextGraphError::invalid_parameter(format!(
                    "filter on '{}' requires a value for operator '{}'",
                    filter.field, filter.op
                )));
            }
            let (scope, field) = if let Some(rest) = filter.field.strip_prefix("source.") {
                (FilterScope::Source, rest.to_string())
            } else if let Some(rest) = filter.field.strip_prefix("target.") {
                (FilterScope::Target, rest.to_string())
            } else if let Some(rest) = filter.field.strip_prefix("rel.") {
                (FilterScope::Relationship, rest.to_string())
            } else {
                (FilterScope::Any, filter.field.clone())
            };
            Ok(CompiledFilter {
                scope,
                field,
                op,
                value: filter.value.clone(),
            })
        })
        .collect()
}

fn filter_matches(
    filter: &CompiledFilter,
    source: &Entity,
    rel: &Relationship,
    target: &Entity,
) -> bool {
    match filter.scope {
        FilterScope::Source => predicate(filter, source.attributes.get(&filter.field)),
        FilterScope::Target => predicate(filter, target.attributes.get(&filter.field)),
        FilterScope::Relationship => predicate(filter, rel.metadata.get(&filter.field)),
        FilterScope::Any => {
            predicate(filter, source.attributes.get(&filter.field))
                || predicate(filter, target.attributes.get(&filter.field))
                || predicate(filter, rel.metadata.get(&filter.field))
        }
    }
}

fn predicate(filter: &CompiledFilter, found: Option<&serde_json::Value>) -> bool {
    let found = found.filter(|v| !v.is_null());
    match filter.op {
        FilterOp::Eq => found.is_some_and(|v| Some(v) == filter.value.as_ref()),
        FilterOp::Neq => match found {
            Some(v) => Some(v) != filter.value.as_ref(),
            None => true,
        },
        FilterOp::Contains => found.is_some_and(|v| value_contains(v, filter.value.as_ref())),
        FilterOp::IsNull => found.is_none(),
        FilterOp::IsNotNull => found.is_some(),
    }
}

// Substring match for strings, membership for arrays.
fn value_contains(haystack: &serde_json::Value, needle: Option<&serde_json::Value>) -> bool {
    let Some(needle) = needle else {
        return false;
    };
    match haystack {
        serde_json::Value::String(text) => needle
            .as_str()
            .is_some_and(|fragment| text.contains(fragment)),
        serde_json::Value::Array(items) => items.iter().any(|item| item == needle),
        _ => false,
    }
}

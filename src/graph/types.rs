use serde::{Deserialize, Serialize};

use crate::errors::ContextGraphError;

pub type EntityId = i64;
pub type RelationshipId = i64;

/// Architecture entity categories. String form is kebab-case; unknown
/// strings are handled by callers (queries treat them as matching nothing).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Capability,
    Application,
    Technology,
    Team,
    Initiative,
    SecurityControl,
    DataObject,
    Process,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Capability,
        EntityKind::Application,
        EntityKind::Technology,
        EntityKind::Team,
        EntityKind::Initiative,
        EntityKind::SecurityControl,
        EntityKind::DataObject,
        EntityKind::Process,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Capability => "capability",
            EntityKind::Application => "application",
            EntityKind::Technology => "technology",
            EntityKind::Team => "team",
            EntityKind::Initiative => "initiative",
            EntityKind::SecurityControl => "security-control",
            EntityKind::DataObject => "data-object",
            EntityKind::Process => "process",
        }
    }

    pub fn parse(value: &str) -> Option<EntityKind> {
        EntityKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipKind {
    DependsOn,
    Supports,
    Uses,
    Owns,
    Implements,
    Serves,
    Manages,
    Realizes,
}

impl RelationshipKind {
    pub const ALL: [RelationshipKind; 8] = [
        RelationshipKind::DependsOn,
        RelationshipKind::Supports,
        RelationshipKind::Uses,
        RelationshipKind::Owns,
        RelationshipKind::Implements,
        RelationshipKind::Serves,
        RelationshipKind::Manages,
        RelationshipKind::Realizes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::DependsOn => "depends-on",
            RelationshipKind::Supports => "supports",
            RelationshipKind::Uses => "uses",
            RelationshipKind::Owns => "owns",
            RelationshipKind::Implements => "implements",
            RelationshipKind::Serves => "serves",
            RelationshipKind::Manages => "manages",
            RelationshipKind::Realizes => "realizes",
        }
    }

    pub fn parse(value: &str) -> Option<RelationshipKind> {
        RelationshipKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleStatus {
    Planned,
    Active,
    Deprecated,
    Retired,
}

impl LifecycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::Planned => "planned",
            LifecycleStatus::Active => "active",
            LifecycleStatus::Deprecated => "deprecated",
            LifecycleStatus::Retired => "retired",
        }
    }

    /// Deprecated and retired targets are candidates for removal
    /// suggestions.
    pub fn is_sunset(&self) -> bool {
        matches!(self, LifecycleStatus::Deprecated | LifecycleStatus::Retired)
    }
}

/// Node of the context graph. Ids are caller-assigned and immutable;
/// timestamps are unix-epoch milliseconds stamped by the store unless the
/// ingesting caller supplies historical values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    #[serde(default = "empty_object")]
    pub attributes: serde_json::Value,
    pub status: LifecycleStatus,
    #[serde(default)]
    pub created_at_ms: i64,
    #[serde(default)]
    pub updated_at_ms: i64,
}

/// Directed edge with a confidence/criticality strength in [0,100].
/// An id of 0 marks an unassigned record; the store assigns real ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    pub id: RelationshipId,
    pub source_id: EntityId,
    pub target_id: EntityId,
    pub kind: RelationshipKind,
    pub strength: f64,
    #[serde(default = "empty_object")]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub created_at_ms: i64,
    #[serde(default)]
    pub updated_at_ms: i64,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

pub fn validate_entity(entity: &Entity) -> Result<(), ContextGraphError> {
    if entity.id <= 0 {
        return Err(ContextGraphError::invalid_parameter(
            "entity id must be positive",
        ));
    }
    if entity.name.trim().is_empty() {
        return Err(ContextGraphError::invalid_parameter(
            "entity name must be set",
        ));
    }
    if !entity.attributes.is_object() {
        return Err(ContextGraphError::invalid_parameter(
            "entity attributes must be a JSON object",
        ));
    }
    Ok(())
}

pub fn validate_relationship(rel: &Relationship) -> Result<(), ContextGraphError> {
    if rel.source_id <= 0 || rel.target_id <= 0 {
        return Err(ContextGraphError::invalid_parameter(
            "relationship endpoints must be positive ids",
        ));
    }
    if !rel.strength.is_finite() || rel.strength < 0.0 || rel.strength > 100.0 {
        return Err(ContextGraphError::invalid_parameter(
            "relationship strength must be within [0,100]",
        ));
    }
    if !rel.metadata.is_object() {
        return Err(ContextGraphError::invalid_parameter(
            "relationship metadata must be a JSON object",
        ));
    }
    Ok(())
}

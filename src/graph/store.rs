//! Owned mutable graph store with snapshot issuance.
//!
//! Single-writer / multi-reader: mutations take the write lock and are
//! validated before anything is touched, so a rejected mutation leaves the
//! store unchanged. Readers work against immutable snapshots and never
//! observe partial writes.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::errors::ContextGraphError;

use super::snapshot::{GraphSnapshot, SnapshotManager};
use super::types::{
    Entity, EntityId, Relationship, RelationshipId, RelationshipKind, validate_entity,
    validate_relationship,
};

#[derive(Default)]
struct GraphState {
    entities: AHashMap<EntityId, Entity>,
    relationships: AHashMap<RelationshipId, Relationship>,
    outgoing: AHashMap<EntityId, Vec<RelationshipId>>,
    incoming: AHashMap<EntityId, Vec<RelationshipId>>,
    next_relationship_id: RelationshipId,
    version: u64,
}

pub struct ContextGraph {
    state: RwLock<GraphState>,
    snapshots: SnapshotManager,
}

impl ContextGraph {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(GraphState {
                next_relationship_id: 1,
                ..GraphState::default()
            }),
            snapshots: SnapshotManager::new(),
        }
    }

    pub fn insert_entity(&self, entity: &Entity) -> Result<EntityId, ContextGraphError> {
        validate_entity(entity)?;
        let mut state = self.state.write();
        if state.entities.contains_key(&entity.id) {
            return Err(ContextGraphError::DuplicateId(entity.id));
        }
        let mut stored = entity.clone();
        let now = now_ms();
        if stored.created_at_ms <= 0 {
            stored.created_at_ms = now;
        }
        if stored.updated_at_ms <= 0 {
            stored.updated_at_ms = stored.created_at_ms;
        }
        state.entities.insert(stored.id, stored);
        state.version += 1;
        Ok(entity.id)
    }

    /// Update name, attributes, and lifecycle status. Id and kind are
    /// immutable.
    pub fn update_entity(&self, entity: &Entity) -> Result<(), ContextGraphError> {
        validate_entity(entity)?;
        let mut state = self.state.write();
        let existing = state
            .entities
            .get(&entity.id)
            .ok_or_else(|| ContextGraphError::unknown_entity(format!("entity {}", entity.id)))?;
        if existing.kind != entity.kind {
            return Err(ContextGraphError::invalid_parameter(
                "entity kind is immutable",
            ));
        }
        let created_at_ms = existing.created_at_ms;
        let mut stored = entity.clone();
        stored.created_at_ms = created_at_ms;
        stored.updated_at_ms = now_ms();
        state.entities.insert(stored.id, stored);
        state.version += 1;
        Ok(())
    }

    /// Remove an entity and cascade over every relationship touching it.
    /// Returns the number of cascaded relationships.
    pub fn remove_entity(&self, id: EntityId) -> Result<usize, ContextGraphError> {
        let mut state = self.state.write();
        if !state.entities.contains_key(&id) {
            return Err(ContextGraphError::unknown_entity(format!("entity {id}")));
        }
        let mut touched: Vec<RelationshipId> = Vec::new();
        touched.extend(state.outgoing.get(&id).into_iter().flatten().copied());
        touched.extend(state.incoming.get(&id).into_iter().flatten().copied());
        touched.sort_unstable();
        touched.dedup();
        for rel_id in &touched {
            detach_relationship(&mut state, *rel_id);
        }
        state.entities.remove(&id);
        state.outgoing.remove(&id);
        state.incoming.remove(&id);
        state.version += 1;
        Ok(touched.len())
    }

    pub fn get_entity(&self, id: EntityId) -> Result<Entity, ContextGraphError> {
        self.state
            .read()
            .entities
            .get(&id)
            .cloned()
            .ok_or_else(|| ContextGraphError::unknown_entity(format!("entity {id}")))
    }

    pub fn insert_relationship(&self, rel: &Relationship) -> Result<RelationshipId, ContextGraphError> {
        validate_relationship(rel)?;
        if rel.source_id == rel.target_id {
            return Err(ContextGraphError::SelfLoop(rel.source_id));
        }
        let mut state = self.state.write();
        if !state.entities.contains_key(&rel.source_id) {
            return Err(ContextGraphError::unknown_entity(format!(
                "source entity {}",
                rel.source_id
            )));
        }
        if !state.entities.contains_key(&rel.target_id) {
            return Err(ContextGraphError::unknown_entity(format!(
                "target entity {}",
                rel.target_id
            )));
        }
        if find_triple(&state, rel.source_id, rel.target_id, rel.kind).is_some() {
            return Err(ContextGraphError::duplicate_edge(format!(
                "{} -{}-> {}",
                rel.source_id,
                rel.kind.as_str(),
                rel.target_id
            )));
        }
        let id = state.next_relationship_id;
        state.next_relationship_id += 1;
        let mut stored = rel.clone();
        stored.id = id;
        let now = now_ms();
        if stored.created_at_ms <= 0 {
            stored.created_at_ms = now;
        }
        if stored.updated_at_ms <= 0 {
            stored.updated_at_ms = stored.created_at_ms;
        }
        state.relationships.insert(id, stored);
        let GraphState {
            relationships,
            outgoing,
            incoming,
            ..
        } = &mut *state;
        attach_adjacency(outgoing, relationships, rel.source_id, id, |r| r.target_id);
        attach_adjacency(incoming, relationships, rel.target_id, id, |r| r.source_id);
        state.version += 1;
        Ok(id)
    }

    pub fn get_relationship(&self, id: RelationshipId) -> Result<Relationship, ContextGraphError> {
        self.state
            .read()
            .relationships
            .get(&id)
            .cloned()
            .ok_or_else(|| ContextGraphError::unknown_entity(format!("relationship {id}")))
    }

    pub fn update_strength(
        &self,
        id: RelationshipId,
        strength: f64,
    ) -> Result<(), ContextGraphError> {
        if !strength.is_finite() || !(0.0..=100.0).contains(&strength) {
            return Err(ContextGraphError::invalid_parameter(
                "relationship strength must be within [0,100]",
            ));
        }
        let mut state = self.state.write();
        let rel = state
            .relationships
            .get_mut(&id)
            .ok_or_else(|| ContextGraphError::unknown_entity(format!("relationship {id}")))?;
        rel.strength = strength;
        rel.updated_at_ms = now_ms();
        state.version += 1;
        Ok(())
    }

    pub fn remove_relationship(&self, id: RelationshipId) -> Result<(), ContextGraphError> {
        let mut state = self.state.write();
        if !state.relationships.contains_key(&id) {
            return Err(ContextGraphError::unknown_entity(format!(
                "relationship {id}"
            )));
        }
        detach_relationship(&mut state, id);
        state.version += 1;
        Ok(())
    }

    /// Relationship id for an exact (source, target, kind) triple, if any.
    pub fn find_relationship(
        &self,
        source_id: EntityId,
        target_id: EntityId,
        kind: RelationshipKind,
    ) -> Option<RelationshipId> {
        find_triple(&self.state.read(), source_id, target_id, kind)
    }

    /// All entity ids, ascending.
    pub fn entity_ids(&self) -> Vec<EntityId> {
        let state = self.state.read();
        let mut ids: Vec<EntityId> = state.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Outgoing relationship ids of `id` (empty when unknown).
    pub fn outgoing(&self, id: EntityId) -> Vec<RelationshipId> {
        self.state.read().outgoing.get(&id).cloned().unwrap_or_default()
    }

    /// Incoming relationship ids of `id` (empty when unknown).
    pub fn incoming(&self, id: EntityId) -> Vec<RelationshipId> {
        self.state.read().incoming.get(&id).cloned().unwrap_or_default()
    }

    pub fn entity_count(&self) -> usize {
        self.state.read().entities.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.state.read().relationships.len()
    }

    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    /// Acquire the current snapshot. Re-acquisition without an intervening
    /// mutation returns the already-published `Arc`; after a mutation the
    /// live state is cloned once and republished.
    pub fn snapshot(&self) -> Arc<GraphSnapshot> {
        let state = self.state.read();
        let published = self.snapshots.acquire();
        if published.version() == state.version {
            return published;
        }
        self.snapshots.publish(GraphSnapshot::build(
            state.version,
            &state.entities,
            &state.relationships,
            &state.outgoing,
            &state.incoming,
        ))
    }
}

impl Default for ContextGraph {
    fn default() -> Self {
        Self::new()
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn find_triple(
    state: &GraphState,
    source_id: EntityId,
    target_id: EntityId,
    kind: RelationshipKind,
) -> Option<RelationshipId> {
    state.outgoing.get(&source_id)?.iter().copied().find(|rel_id| {
        state
            .relationships
            .get(rel_id)
            .is_some_and(|rel| rel.target_id == target_id && rel.kind == kind)
    })
}

// Adjacency lists stay sorted by (neighbor id, relationship id) regardless
// of insertion order, so traversal order is deterministic.
fn attach_adjacency(
    index: &mut AHashMap<EntityId, Vec<RelationshipId>>,
    relationships: &AHashMap<RelationshipId, Relationship>,
    owner: EntityId,
    rel_id: RelationshipId,
    neighbor_of: impl Fn(&Relationship) -> EntityId,
) {
    let key = relationships
        .get(&rel_id)
        .map(|rel| (neighbor_of(rel), rel_id))
        .unwrap_or((EntityId::MAX, rel_id));
    let list = index.entry(owner).or_default();
    let position = list
        .binary_search_by_key(&key, |existing| {
            relationships
                .get(existing)
                .map(|rel| (neighbor_of(rel), *existing))
                .unwrap_or((EntityId::MAX, *existing))
        })
        .unwrap_err();
    list.insert(position, rel_id);
}

fn detach_relationship(state: &mut GraphState, rel_id: RelationshipId) {
    if let Some(rel) = state.relationships.remove(&rel_id) {
        if let Some(list) = state.outgoing.get_mut(&rel.source_id) {
            list.retain(|id| *id != rel_id);
        }
        if let Some(list) = state.incoming.get_mut(&rel.target_id) {
            list.retain(|id| *id != rel_id);
        }
    }
}

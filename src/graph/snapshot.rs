//! Immutable, versioned snapshots of the context graph.
//!
//! Snapshots hold full clones of the entity, relationship, and adjacency
//! maps. Publication goes through `ArcSwap`, so acquiring the current
//! snapshot is lock-free and two acquisitions without an intervening
//! mutation return the same `Arc`. Every analytics computation runs against
//! one snapshot and is therefore isolated from concurrent writes.

use std::sync::Arc;

use ahash::AHashMap;
use arc_swap::ArcSwap;

use super::types::{Entity, EntityId, Relationship, RelationshipId};

#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    version: u64,
    entities: AHashMap<EntityId, Entity>,
    relationships: AHashMap<RelationshipId, Relationship>,
    // relationship ids, sorted by (neighbor id, relationship id)
    outgoing: AHashMap<EntityId, Vec<RelationshipId>>,
    incoming: AHashMap<EntityId, Vec<RelationshipId>>,
    entity_ids: Vec<EntityId>,
    relationship_ids: Vec<RelationshipId>,
}

impl GraphSnapshot {
    pub(crate) fn build(
        version: u64,
        entities: &AHashMap<EntityId, Entity>,
        relationships: &AHashMap<RelationshipId, Relationship>,
        outgoing: &AHashMap<EntityId, Vec<RelationshipId>>,
        incoming: &AHashMap<EntityId, Vec<RelationshipId>>,
    ) -> Self {
        let mut entity_ids: Vec<EntityId> = entities.keys().copied().collect();
        entity_ids.sort_unstable();
        let mut relationship_ids: Vec<RelationshipId> = relationships.keys().copied().collect();
        relationship_ids.sort_unstable();
        Self {
            version,
            entities: entities.clone(),
            relationships: relationships.clone(),
            outgoing: outgoing.clone(),
            incoming: incoming.clone(),
            entity_ids,
            relationship_ids,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    pub fn contains_entity(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn relationship(&self, id: RelationshipId) -> Option<&Relationship> {
        self.relationships.get(&id)
    }

    /// All entity ids, ascending. Iteration order for every deterministic
    /// computation.
    pub fn entity_ids(&self) -> &[EntityId] {
        &self.entity_ids
    }

    /// All relationship ids, ascending.
    pub fn relationship_ids(&self) -> &[RelationshipId] {
        &self.relationship_ids
    }

    /// Outgoing relationship ids of `id`, sorted by (target id, rel id).
    pub fn outgoing(&self, id: EntityId) -> &[RelationshipId] {
        self.outgoing.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Incoming relationship ids of `id`, sorted by (source id, rel id).
    pub fn incoming(&self, id: EntityId) -> &[RelationshipId] {
        self.incoming.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Distinct downstream neighbor ids, ascending.
    pub fn out_neighbors(&self, id: EntityId) -> Vec<EntityId> {
        let mut neighbors: Vec<EntityId> = self
            .outgoing(id)
            .iter()
            .filter_map(|rel_id| self.relationships.get(rel_id))
            .map(|rel| rel.target_id)
            .collect();
        neighbors.dedup();
        neighbors
    }

    /// Distinct upstream neighbor ids, ascending.
    pub fn in_neighbors(&self, id: EntityId) -> Vec<EntityId> {
        let mut neighbors: Vec<EntityId> = self
            .incoming(id)
            .iter()
            .filter_map(|rel_id| self.relationships.get(rel_id))
            .map(|rel| rel.source_id)
            .collect();
        neighbors.dedup();
        neighbors
    }
}

/// Lock-free publication point for the latest snapshot.
#[derive(Debug)]
pub struct SnapshotManager {
    current: ArcSwap<GraphSnapshot>,
}

impl SnapshotManager {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::new(Arc::new(GraphSnapshot::default())),
        }
    }

    pub fn publish(&self, snapshot: GraphSnapshot) -> Arc<GraphSnapshot> {
        let shared = Arc::new(snapshot);
        self.current.store(shared.clone());
        shared
    }

    pub fn acquire(&self) -> Arc<GraphSnapshot> {
        self.current.load_full()
    }
}

impl Default for SnapshotManager {
    fn default() -> Self {
        Self::new()
    }
}

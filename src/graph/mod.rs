pub mod snapshot;
pub mod store;
pub mod types;

pub use snapshot::{GraphSnapshot, SnapshotManager};
pub use store::ContextGraph;
pub use types::{
    Entity, EntityId, EntityKind, LifecycleStatus, Relationship, RelationshipId, RelationshipKind,
    validate_entity, validate_relationship,
};

//! Deterministic in-memory graph analytics for architecture context graphs.
//! Entities and typed, weighted relationships form a directed attributed
//! graph; centrality, blast-radius, pattern-query, and recommendation
//! engines all run over immutable versioned snapshots.

pub mod analytics;
pub mod cache;
pub mod cancel;
pub mod centrality;
pub mod dataset;
pub mod errors;
pub mod graph;
pub mod impact;
pub mod query;
pub mod recommend;

pub use crate::analytics::{ContextAnalytics, MutationResult};
pub use crate::cancel::CancelToken;
pub use crate::centrality::{
    CentralityConfig, CentralityReport, CentralityWeights, EntityScores, compute_centrality,
};
pub use crate::errors::ContextGraphError;
pub use crate::graph::{
    ContextGraph, Entity, EntityId, EntityKind, GraphSnapshot, LifecycleStatus, Relationship,
    RelationshipId, RelationshipKind,
};
pub use crate::impact::{
    AffectedEntity, ChangeKind, ImpactLevel, ImpactReport, analyze_impact,
};
pub use crate::query::{AttributeFilter, PatternQuery, QueryRow, QueryRows, run_query};
pub use crate::recommend::{
    Priority, Recommendation, RecommendationAction, RecommendConfig, recommend,
};

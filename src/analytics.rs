//! Read-mostly facade over the store and the analytics engines.
//!
//! Every computation runs against the current snapshot; results are cached
//! by (snapshot version, algorithm, parameter fingerprint) and dropped
//! wholesale when the version advances. Recommendations are recorded in a
//! ledger so `apply_recommendation` can later replay the suggested mutation
//! through the store.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::cache::{AnalyticsCache, CacheKey, CachedResult};
use crate::cancel::CancelToken;
use crate::centrality::{CentralityConfig, CentralityReport, CentralityWeights, compute_centrality};
use crate::errors::ContextGraphError;
use crate::graph::{ContextGraph, EntityId, Relationship, RelationshipId};
use crate::impact::{ChangeKind, DEFAULT_MAX_HOPS, ImpactReport, analyze_impact};
use crate::query::{PatternQuery, QueryRows, run_query};
use crate::recommend::{Recommendation, RecommendConfig, RecommendationAction, recommend};

/// Outcome of applying an issued recommendation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MutationResult {
    pub recommendation_id: i64,
    pub action: RecommendationAction,
    pub relationship_id: RelationshipId,
}

#[derive(Default)]
struct RecommendationLedger {
    next_id: i64,
    issued: AHashMap<i64, Recommendation>,
    applied: AHashSet<i64>,
}

pub struct ContextAnalytics {
    graph: ContextGraph,
    cache: AnalyticsCache,
    ledger: RwLock<RecommendationLedger>,
    cancel: CancelToken,
}

impl ContextAnalytics {
    pub fn new() -> Self {
        Self::with_graph(ContextGraph::new())
    }

    pub fn with_graph(graph: ContextGraph) -> Self {
        Self {
            graph,
            cache: AnalyticsCache::new(),
            ledger: RwLock::new(RecommendationLedger {
                next_id: 1,
                ..RecommendationLedger::default()
            }),
            cancel: CancelToken::new(),
        }
    }

    /// The owned store, for ingestion and direct mutation by the caller.
    pub fn graph(&self) -> &ContextGraph {
        &self.graph
    }

    /// Token shared with every computation started through this facade.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn centrality(&self) -> Result<Arc<CentralityReport>, ContextGraphError> {
        self.centrality_with(&CentralityConfig::default())
    }

    pub fn centrality_weighted(
        &self,
        weights: CentralityWeights,
    ) -> Result<Arc<CentralityReport>, ContextGraphError> {
        self.centrality_with(&CentralityConfig {
            weights,
            ..CentralityConfig::default()
        })
    }

    pub fn centrality_with(
        &self,
        config: &CentralityConfig,
    ) -> Result<Arc<CentralityReport>, ContextGraphError> {
        config.validate()?;
        let snapshot = self.graph.snapshot();
        let key = CacheKey {
            algorithm: "centrality",
            params: fingerprint(config)?,
        };
        if let Some(CachedResult::Centrality(report)) = self.cache.get(snapshot.version(), &key) {
            return Ok(report);
        }
        let report = Arc::new(compute_centrality(&snapshot, config, &self.cancel)?);
        self.cache.insert(
            snapshot.version(),
            key,
            CachedResult::Centrality(report.clone()),
        );
        Ok(report)
    }

    pub fn impact(
        &self,
        entity_id: EntityId,
        change: ChangeKind,
        max_hops: Option<u32>,
    ) -> Result<Arc<ImpactReport>, ContextGraphError> {
        let max_hops = max_hops.unwrap_or(DEFAULT_MAX_HOPS);
        let snapshot = self.graph.snapshot();
        let key = CacheKey {
            algorithm: "impact",
            params: format!("{entity_id}:{}:{max_hops}", change.as_str()),
        };
        if let Some(CachedResult::Impact(report)) = self.cache.get(snapshot.version(), &key) {
            return Ok(report);
        }
        let report = Arc::new(analyze_impact(
            &snapshot,
            entity_id,
            change,
            max_hops,
            &self.cancel,
        )?);
        self.cache.insert(
            snapshot.version(),
            key,
            CachedResult::Impact(report.clone()),
        );
        Ok(report)
    }

    /// Lazy query rows; uncached since evaluation is already deferred.
    pub fn query(&self, query: &PatternQuery) -> Result<QueryRows, ContextGraphError> {
        run_query(&self.graph.snapshot(), query)
    }

    pub fn recommendations(
        &self,
        config: Option<&RecommendConfig>,
    ) -> Result<Arc<Vec<Recommendation>>, ContextGraphError> {
        let default_config;
        let config = match config {
            Some(config) => config,
            None => {
                default_config = RecommendConfig::default();
                &default_config
            }
        };
        config.validate()?;
        let snapshot = self.graph.snapshot();
        let key = CacheKey {
            algorithm: "recommend",
            params: fingerprint(config)?,
        };
        if let Some(CachedResult::Recommendations(list)) = self.cache.get(snapshot.version(), &key)
        {
            return Ok(list);
        }
        let mut list = recommend(&snapshot, config, now_ms())?;
        {
            let mut ledger = self.ledger.write();
            for entry in list.iter_mut() {
                entry.id = ledger.next_id;
                ledger.next_id += 1;
                ledger.issued.insert(entry.id, entry.clone());
            }
        }
        let shared = Arc::new(list);
        self.cache.insert(
            snapshot.version(),
            key,
            CachedResult::Recommendations(shared.clone()),
        );
        Ok(shared)
    }

    /// Replay an issued recommendation as a store mutation. Each issued id
    /// can be applied once.
    pub fn apply_recommendation(&self, id: i64) -> Result<MutationResult, ContextGraphError> {
        let entry = {
            let mut ledger = self.ledger.write();
            if ledger.applied.contains(&id) {
                return Err(ContextGraphError::UnknownRecommendation(id));
            }
            let entry = ledger
                .issued
                .get(&id)
                .cloned()
                .ok_or(ContextGraphError::UnknownRecommendation(id))?;
            ledger.applied.insert(id);
            entry
        };
        let outcome = self.apply_entry(&entry);
        if outcome.is_err() {
            // the mutation was rejected; let the caller retry later
            self.ledger.write().applied.remove(&id);
        }
        let relationship_id = outcome?;
        tracing::debug!(
            recommendation = id,
            action = entry.action.as_str(),
            relationship = relationship_id,
            "recommendation applied"
        );
        Ok(MutationResult {
            recommendation_id: id,
            action: entry.action,
            relationship_id,
        })
    }

    fn apply_entry(&self, entry: &Recommendation) -> Result<RelationshipId, ContextGraphError> {
        match entry.action {
            RecommendationAction::Add => self.graph.insert_relationship(&Relationship {
                id: 0,
                source_id: entry.source_id,
                target_id: entry.target_id,
                kind: entry.kind,
                strength: entry.suggested_strength,
                metadata: serde_json::json!({ "origin": entry.algorithm }),
                created_at_ms: 0,
                updated_at_ms: 0,
            }),
            RecommendationAction::Strengthen => {
                let rel_id = self
                    .graph
                    .find_relationship(entry.source_id, entry.target_id, entry.kind)
                    .ok_or_else(|| {
                        ContextGraphError::unknown_entity(format!(
                            "relationship {} -{}-> {}",
                            entry.source_id,
                            entry.kind.as_str(),
                            entry.target_id
                        ))
                    })?;
                self.graph.update_strength(rel_id, entry.suggested_strength)?;
                Ok(rel_id)
            }
            RecommendationAction::Remove => {
                let rel_id = self
                    .graph
                    .find_relationship(entry.source_id, entry.target_id, entry.kind)
                    .ok_or_else(|| {
                        ContextGraphError::unknown_entity(format!(
                            "relationship {} -{}-> {}",
                            entry.source_id,
                            entry.kind.as_str(),
                            entry.target_id
                        ))
                    })?;
                self.graph.remove_relationship(rel_id)?;
                Ok(rel_id)
            }
        }
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache.hit_count()
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache.miss_count()
    }
}

impl Default for ContextAnalytics {
    fn default() -> Self {
        Self::new()
    }
}

fn fingerprint<T: Serialize>(value: &T) -> Result<String, ContextGraphError> {
    serde_json::to_string(value)
        .map_err(|e| ContextGraphError::invalid_parameter(e.to_string()))
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

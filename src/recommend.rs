//! Heuristic relationship recommendations.
//!
//! Deterministic, explainable scoring over a snapshot: no learning, no
//! randomness. The engine only proposes; applying a suggestion is the
//! caller's mutation through the store.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::errors::ContextGraphError;
use crate::graph::{EntityId, EntityKind, GraphSnapshot, RelationshipKind};

pub const DEFAULT_MISSING_LINK_THRESHOLD: f64 = 0.8;
pub const DEFAULT_HIGH_USAGE_COUNT: u64 = 100;
pub const DEFAULT_STALENESS_WINDOW_MS: i64 = 90 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationAction {
    Add,
    Strengthen,
    Remove,
}

impl RecommendationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationAction::Add => "add",
            RecommendationAction::Strengthen => "strengthen",
            RecommendationAction::Remove => "remove",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    /// Assigned by the facade ledger at issue time; 0 until then.
    pub id: i64,
    pub action: RecommendationAction,
    pub source_id: EntityId,
    pub target_id: EntityId,
    pub kind: RelationshipKind,
    pub suggested_strength: f64,
    pub confidence: f64,
    pub priority: Priority,
    pub evidence: Vec<String>,
    pub algorithm: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendConfig {
    /// Minimum fraction of same-kind entities sharing a link pattern before
    /// missing instances are flagged.
    pub missing_link_threshold: f64,
    /// `usage_count` metadata at or above this raises strengthen confidence.
    pub high_usage_count: u64,
    /// Relationships to sunset targets idle longer than this window are
    /// removal candidates.
    pub staleness_window_ms: i64,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            missing_link_threshold: DEFAULT_MISSING_LINK_THRESHOLD,
            high_usage_count: DEFAULT_HIGH_USAGE_COUNT,
            staleness_window_ms: DEFAULT_STALENESS_WINDOW_MS,
        }
    }
}

impl RecommendConfig {
    pub fn validate(&self) -> Result<(), ContextGraphError> {
        if !self.missing_link_threshold.is_finite()
            || self.missing_link_threshold <= 0.0
            || self.missing_link_threshold > 1.0
        {
            return Err(ContextGraphError::invalid_parameter(
                "missing_link_threshold must be within (0,1]",
            ));
        }
        if self.staleness_window_ms <= 0 {
            return Err(ContextGraphError::invalid_parameter(
                "staleness_window_ms must be positive",
            ));
        }
        Ok(())
    }
}

/// Produce all recommendations for `snapshot`. `now_ms` anchors the
/// staleness check so results are reproducible in tests.
pub fn recommend(
    snapshot: &GraphSnapshot,
    config: &RecommendConfig,
    now_ms: i64,
) -> Result<Vec<Recommendation>, ContextGraphError> {
    config.validate()?;
    let mut recommendations = Vec::new();
    missing_links(snapshot, config, &mut recommendations);
    strengthen_candidates(snapshot, config, &mut recommendations);
    removal_candidates(snapshot, config, now_ms, &mut recommendations);
    recommendations.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.source_id.cmp(&b.source_id))
            .then(a.target_id.cmp(&b.target_id))
            .then(a.algorithm.cmp(&b.algorithm))
    });
    tracing::debug!(count = recommendations.len(), "recommendations computed");
    Ok(recommendations)
}

// Per (source kind, target kind) pair: which sources link, how often each
// target is referenced, which relationship kind dominates, and the strength
// population.
#[derive(Default)]
struct PairStats {
    linked_sources: Vec<EntityId>,
    target_counts: AHashMap<EntityId, usize>,
    kind_counts: AHashMap<RelationshipKind, usize>,
    strengths: Vec<f64>,
}

fn missing_links(
    snapshot: &GraphSnapshot,
    config: &RecommendConfig,
    out: &mut Vec<Recommendation>,
) {
    let mut population: AHashMap<EntityKind, Vec<EntityId>> = AHashMap::new();
    for id in snapshot.entity_ids() {
        if let Some(entity) = snapshot.entity(*id) {
            population.entry(entity.kind).or_default().push(*id);
        }
    }

    let mut pairs: AHashMap<(EntityKind, EntityKind), PairStats> = AHashMap::new();
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
        let stats = pairs.entry((source.kind, target.kind)).or_default();
        stats.linked_sources.push(rel.source_id);
        *stats.target_counts.entry(rel.target_id).or_default() += 1;
        *stats.kind_counts.entry(rel.kind).or_default() += 1;
        stats.strengths.push(rel.strength);
    }

    let mut pair_keys: Vec<(EntityKind, EntityKind)> = pairs.keys().copied().collect();
    pair_keys.sort();
    for key in pair_keys {
        let (source_kind, target_kind) = key;
        let stats = pairs.get_mut(&key).expect("pair present");
        let Some(candidates) = population.get(&source_kind) else {
            continue;
        };
        if candidates.len() < 2 {
            continue;
        }
        stats.linked_sources.sort_unstable();
        stats.linked_sources.dedup();
        let frequency = stats.linked_sources.len() as f64 / candidates.len() as f64;
        if frequency < config.missing_link_threshold || frequency >= 1.0 {
            continue;
        }
        // dominant target and relationship kind; ties to the lowest id /
        // declaration order
        let suggested_target = stats
            .target_counts
            .iter()
            .map(|(id, count)| (*count, std::cmp::Reverse(*id)))
            .max()
            .map(|(_, std::cmp::Reverse(id))| id)
            .unwrap_or_default();
        let mut dominant_kind = RelationshipKind::Uses;
        let mut dominant_count = 0usize;
        for kind in RelationshipKind::ALL {
            let count = stats.kind_counts.get(&kind).copied().unwrap_or(0);
            if count > dominant_count {
                dominant_count = count;
                dominant_kind = kind;
            }
        }
        let suggested_strength = median(&mut stats.strengths);
        let confidence = frequency * 100.0;
        for source_id in candidates {
            if stats.linked_sources.binary_search(source_id).is_ok() {
                continue;
            }
            if *source_id == suggested_target {
                continue;
            }
            out.push(Recommendation {
                id: 0,
                action: RecommendationAction::Add,
                source_id: *source_id,
                target_id: suggested_target,
                kind: dominant_kind,
                suggested_strength,
                confidence,
                priority: priority_for(confidence, RecommendationAction::Add),
                evidence: vec![
                    format!(
                        "{} of {} {} entities link to a {} entity",
                        stats.linked_sources.len(),
                        candidates.len(),
                        source_kind.as_str(),
                        target_kind.as_str()
                    ),
                    format!(
                        "most referenced {} entity is {} ({} links)",
                        target_kind.as_str(),
                        suggested_target,
                        stats.target_counts.get(&suggested_target).copied().unwrap_or(0)
                    ),
                ],
                algorithm: "missing-link".to_string(),
            });
        }
    }
}

fn strengthen_candidates(
    snapshot: &GraphSnapshot,
    config: &RecommendConfig,
    out: &mut Vec<Recommendation>,
) {
    let mut by_kind: AHashMap<RelationshipKind, Vec<f64>> = AHashMap::new();
    for rel_id in snapshot.relationship_ids() {
        if let Some(rel) = snapshot.relationship(*rel_id) {
            by_kind.entry(rel.kind).or_default().push(rel.strength);
        }
    }
    let mut thresholds: AHashMap<RelationshipKind, (f64, f64)> = AHashMap::new();
    for (kind, strengths) in by_kind.iter_mut() {
        if strengths.len() < 2 {
            continue;
        }
        let med = median(strengths);
        let dev = std_deviation(strengths);
        if dev <= 0.0 {
            continue;
        }
        thresholds.insert(*kind, (med, dev));
    }

    for rel_id in snapshot.relationship_ids() {
        let Some(rel) = snapshot.relationship(*rel_id) else {
            continue;
        };
        let Some((med, dev)) = thresholds.get(&rel.kind) else {
            continue;
        };
        if rel.strength >= med - dev {
            continue;
        }
        let usage = rel
            .metadata
            .get("usage_count")
            .and_then(serde_json::Value::as_u64);
        let high_usage = usage.is_some_and(|count| count >= config.high_usage_count);
        let confidence = if high_usage { 85.0 } else { 60.0 };
        let mut evidence = vec![format!(
            "strength {:.1} is more than one standard deviation below the {} median {:.1}",
            rel.strength,
            rel.kind.as_str(),
            med
        )];
        if let Some(count) = usage {
            if high_usage {
                evidence.push(format!(
                    "usage_count {count} is at or above the high-usage mark {}",
                    config.high_usage_count
                ));
            }
        }
        out.push(Recommendation {
            id: 0,
            action: RecommendationAction::Strengthen,
            source_id: rel.source_id,
            target_id: rel.target_id,
            kind: rel.kind,
            suggested_strength: *med,
            confidence,
            priority: priority_for(confidence, RecommendationAction::Strengthen),
            evidence,
            algorithm: "strengthen".to_string(),
        });
    }
}

fn removal_candidates(
    snapshot: &GraphSnapshot,
    config: &RecommendConfig,
    now_ms: i64,
    out: &mut Vec<Recommendation>,
) {
    for rel_id in snapshot.relationship_ids() {
        let Some(rel) = snapshot.relationship(*rel_id) else {
            continue;
        };
        let Some(target) = snapshot.entity(rel.target_id) else {
            continue;
        };
        if !target.status.is_sunset() {
            continue;
        }
        let last_activity = rel
            .metadata
            .get("last_activity_ms")
            .and_then(serde_json::Value::as_i64)
            .unwrap_or(rel.updated_at_ms);
        let idle_ms = now_ms.saturating_sub(last_activity);
        if idle_ms <= config.staleness_window_ms {
            continue;
        }
        let confidence = match target.status {
            crate::graph::LifecycleStatus::Retired => 90.0,
            _ => 75.0,
        };
        out.push(Recommendation {
            id: 0,
            action: RecommendationAction::Remove,
            source_id: rel.source_id,
            target_id: rel.target_id,
            kind: rel.kind,
            suggested_strength: 0.0,
            confidence,
            priority: priority_for(confidence, RecommendationAction::Remove),
            evidence: vec![
                format!(
                    "target entity {} is {}",
                    rel.target_id,
                    target.status.as_str()
                ),
                format!(
                    "no activity for {} day(s), staleness window is {} day(s)",
                    idle_ms / 86_400_000,
                    config.staleness_window_ms / 86_400_000
                ),
            ],
            algorithm: "stale-removal".to_string(),
        });
    }
}

fn priority_for(confidence: f64, action: RecommendationAction) -> Priority {
    let base = if confidence >= 85.0 {
        Priority::High
    } else if confidence >= 60.0 {
        Priority::Medium
    } else {
        Priority::Low
    };
    // stale links to sunset targets always deserve attention
    if action == RecommendationAction::Remove && base == Priority::Low {
        return Priority::Medium;
    }
    base
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

fn std_deviation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values
        .iter()
        .map(|value| (value - mean) * (value - mean))
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

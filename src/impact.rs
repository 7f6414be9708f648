//! Blast-radius analysis: what is affected when an entity changes.
//!
//! Traversal runs over incoming relationships (dependents of the target),
//! bounded by a hop limit, with a visited set so dependency cycles
//! terminate. Pure function over a snapshot.

use std::collections::VecDeque;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::errors::ContextGraphError;
use crate::graph::{EntityId, GraphSnapshot};

pub const DEFAULT_MAX_HOPS: u32 = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    Delete,
    Replace,
    Deprecate,
    Move,
    Modify,
}

impl ChangeKind {
    pub const ALL: [ChangeKind; 5] = [
        ChangeKind::Delete,
        ChangeKind::Replace,
        ChangeKind::Deprecate,
        ChangeKind::Move,
        ChangeKind::Modify,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Delete => "delete",
            ChangeKind::Replace => "replace",
            ChangeKind::Deprecate => "deprecate",
            ChangeKind::Move => "move",
            ChangeKind::Modify => "modify",
        }
    }

    pub fn parse(value: &str) -> Option<ChangeKind> {
        ChangeKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == value)
    }

    /// Severity multiplier: delete/replace > deprecate/move > modify.
    pub fn severity(&self) -> f64 {
        match self {
            ChangeKind::Delete => 1.3,
            ChangeKind::Replace => 1.2,
            ChangeKind::Deprecate => 0.9,
            ChangeKind::Move => 0.8,
            ChangeKind::Modify => 0.5,
        }
    }
}

pub const MAX_SEVERITY: f64 = 1.3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum ImpactLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl ImpactLevel {
    pub fn from_score(score: f64) -> ImpactLevel {
        if score >= 75.0 {
            ImpactLevel::Critical
        } else if score >= 50.0 {
            ImpactLevel::High
        } else if score >= 25.0 {
            ImpactLevel::Medium
        } else {
            ImpactLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactLevel::Critical => "critical",
            ImpactLevel::High => "high",
            ImpactLevel::Medium => "medium",
            ImpactLevel::Low => "low",
        }
    }

    fn weight(&self) -> f64 {
        match self {
            ImpactLevel::Critical => 1.0,
            ImpactLevel::High => 0.75,
            ImpactLevel::Medium => 0.5,
            ImpactLevel::Low => 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AffectedEntity {
    pub entity_id: EntityId,
    pub hops: u32,
    pub score: f64,
    pub level: ImpactLevel,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    pub probability: f64,
    pub severity: ImpactLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImpactReport {
    pub snapshot_version: u64,
    pub target_id: EntityId,
    pub change: ChangeKind,
    pub max_hops: u32,
    /// Sorted by hop distance, then entity id.
    pub affected: Vec<AffectedEntity>,
    pub aggregate_score: f64,
    pub risk: RiskAssessment,
}

/// Analyze the blast radius of applying `change` to `target_id`.
///
/// Per affected entity: `score = severity(change) * mean path strength /
/// hops`, capped at 100, where the path is the hop-minimal chain of
/// incoming relationships discovered first in deterministic order.
/// Aggregate is the level-weighted score sum capped at 100.
pub fn analyze_impact(
    snapshot: &GraphSnapshot,
    target_id: EntityId,
    change: ChangeKind,
    max_hops: u32,
    cancel: &CancelToken,
) -> Result<ImpactReport, ContextGraphError> {
    if max_hops == 0 {
        return Err(ContextGraphError::invalid_parameter(
            "max_hops must be at least 1",
        ));
    }
    if !snapshot.contains_entity(target_id) {
        return Err(ContextGraphError::unknown_entity(format!(
            "entity {target_id}"
        )));
    }

    let severity = change.severity();
    let mut affected = Vec::new();
    let mut visited = AHashSet::new();
    visited.insert(target_id);
    // (entity, hops, strength accumulated along the discovery path)
    let mut queue = VecDeque::new();
    queue.push_back((target_id, 0u32, 0.0f64));
    while let Some((node, hops, strength_sum)) = queue.pop_front() {
        cancel.check("impact")?;
        if hops >= max_hops {
            continue;
        }
        for rel_id in snapshot.incoming(node) {
            let Some(rel) = snapshot.relationship(*rel_id) else {
                continue;
            };
            let dependent = rel.source_id;
            if !visited.insert(dependent) {
                continue;
            }
            let next_hops = hops + 1;
            let next_sum = strength_sum + rel.strength;
            let mean_strength = next_sum / next_hops as f64;
            let score = (severity * mean_strength / next_hops as f64).min(100.0);
            let level = ImpactLevel::from_score(score);
            affected.push(AffectedEntity {
                entity_id: dependent,
                hops: next_hops,
                score,
                level,
                reason: format!(
                    "{} hop(s) upstream of entity {target_id}, mean path strength {:.1}, {} severity {:.2}",
                    next_hops,
                    mean_strength,
                    change.as_str(),
                    severity
                ),
            });
            queue.push_back((dependent, next_hops, next_sum));
        }
    }

    affected.sort_by(|a, b| a.hops.cmp(&b.hops).then(a.entity_id.cmp(&b.entity_id)));

    let aggregate_score = affected
        .iter()
        .map(|entry| entry.score * entry.level.weight())
        .sum::<f64>()
        .min(100.0);
    let probability = (aggregate_score / 100.0 * severity / MAX_SEVERITY).min(1.0);
    Ok(ImpactReport {
        snapshot_version: snapshot.version(),
        target_id,
        change,
        max_hops,
        affected,
        aggregate_score,
        risk: RiskAssessment {
            probability,
            severity: ImpactLevel::from_score(aggregate_score),
        },
    })
}

//! Structural-importance metrics over a graph snapshot.
//!
//! Direction semantics: betweenness and PageRank treat relationships as
//! directed; closeness and eigenvector centrality run over the undirected
//! (weakly-connected) view so pure sources and sinks in the typical
//! architecture graph keep nonzero scores. All functions iterate entities
//! in ascending-id order, so results are deterministic for a fixed
//! snapshot and parameter set.

use std::collections::VecDeque;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::errors::ContextGraphError;
use crate::graph::{EntityId, GraphSnapshot};

pub const DEFAULT_DAMPING: f64 = 0.85;
pub const DEFAULT_TOLERANCE: f64 = 1e-6;
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CentralityWeights {
    pub degree: f64,
    pub closeness: f64,
    pub betweenness: f64,
    pub eigenvector: f64,
    pub pagerank: f64,
}

impl Default for CentralityWeights {
    fn default() -> Self {
        Self {
            degree: 1.0,
            closeness: 1.0,
            betweenness: 1.0,
            eigenvector: 1.0,
            pagerank: 1.0,
        }
    }
}

impl CentralityWeights {
    fn sum(&self) -> f64 {
        self.degree + self.closeness + self.betweenness + self.eigenvector + self.pagerank
    }

    fn validate(&self) -> Result<(), ContextGraphError> {
        let parts = [
            self.degree,
            self.closeness,
            self.betweenness,
            self.eigenvector,
            self.pagerank,
        ];
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ContextGraphError::invalid_parameter(
                "centrality weights must be finite and non-negative",
            ));
        }
        if self.sum() <= 0.0 {
            return Err(ContextGraphError::invalid_parameter(
                "centrality weights must not all be zero",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CentralityConfig {
    pub weights: CentralityWeights,
    pub damping: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl Default for CentralityConfig {
    fn default() -> Self {
        Self {
            weights: CentralityWeights::default(),
            damping: DEFAULT_DAMPING,
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl CentralityConfig {
    pub fn validate(&self) -> Result<(), ContextGraphError> {
        self.weights.validate()?;
        if !self.damping.is_finite() || !(0.0..1.0).contains(&self.damping) {
            return Err(ContextGraphError::invalid_parameter(
                "damping must be within [0,1)",
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(ContextGraphError::invalid_parameter(
                "tolerance must be positive",
            ));
        }
        if self.max_iterations == 0 {
            return Err(ContextGraphError::invalid_parameter(
                "max_iterations must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Per-entity normalized scores in [0,100], per-metric ranks (1 = highest,
/// ties broken by entity id ascending), and the composite strategic value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityScores {
    pub entity_id: EntityId,
    pub degree: f64,
    pub closeness: f64,
    pub betweenness: f64,
    pub eigenvector: f64,
    pub pagerank: f64,
    pub degree_rank: u32,
    pub closeness_rank: u32,
    pub betweenness_rank: u32,
    pub eigenvector_rank: u32,
    pub pagerank_rank: u32,
    pub strategic_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CentralityReport {
    pub snapshot_version: u64,
    /// Set when eigenvector or PageRank fell back to a best-effort or
    /// uniform result instead of converging.
    pub partial: bool,
    /// Sorted by entity id ascending.
    pub scores: Vec<EntityScores>,
}

impl CentralityReport {
    pub fn score(&self, entity_id: EntityId) -> Option<&EntityScores> {
        self.scores
            .binary_search_by_key(&entity_id, |s| s.entity_id)
            .ok()
            .map(|idx| &self.scores[idx])
    }
}

// Dense index over a snapshot: position i corresponds to the i-th entity id
// in ascending order. Neighbor lists hold distinct positions, ascending.
struct DenseGraph {
    ids: Vec<EntityId>,
    out: Vec<Vec<usize>>,
    undirected: Vec<Vec<usize>>,
}

fn index_snapshot(snapshot: &GraphSnapshot) -> DenseGraph {
    let ids: Vec<EntityId> = snapshot.entity_ids().to_vec();
    let mut index_of: AHashMap<EntityId, usize> = AHashMap::with_capacity(ids.len());
    for (idx, id) in ids.iter().enumerate() {
        index_of.insert(*id, idx);
    }
    let mut out = Vec::with_capacity(ids.len());
    let mut undirected = Vec::with_capacity(ids.len());
    for id in &ids {
        let outgoing: Vec<usize> = snapshot
            .out_neighbors(*id)
            .into_iter()
            .filter_map(|n| index_of.get(&n).copied())
            .collect();
        let incoming: Vec<usize> = snapshot
            .in_neighbors(*id)
            .into_iter()
            .filter_map(|n| index_of.get(&n).copied())
            .collect();
        let mut merged: Vec<usize> = outgoing.iter().chain(incoming.iter()).copied().collect();
        merged.sort_unstable();
        merged.dedup();
        out.push(outgoing);
        undirected.push(merged);
    }
    DenseGraph {
        ids,
        out,
        undirected,
    }
}

fn weak_component_count(adjacency: &[Vec<usize>]) -> usize {
    let mut seen = vec![false; adjacency.len()];
    let mut components = 0;
    for start in 0..adjacency.len() {
        if seen[start] {
            continue;
        }
        components += 1;
        seen[start] = true;
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(node) = queue.pop_front() {
            for &next in &adjacency[node] {
                if !seen[next] {
                    seen[next] = true;
                    queue.push_back(next);
                }
            }
        }
    }
    components
}

/// Raw degree centrality: (in + out relationship count) / (N - 1).
/// Parallel relationships of different kinds both count.
pub fn degree(snapshot: &GraphSnapshot) -> Vec<(EntityId, f64)> {
    let ids = snapshot.entity_ids();
    let n = ids.len();
    ids.iter()
        .map(|id| {
            let count = snapshot.outgoing(*id).len() + snapshot.incoming(*id).len();
            let raw = if n > 1 {
                count as f64 / (n - 1) as f64
            } else {
                0.0
            };
            (*id, raw)
        })
        .collect()
}

/// Raw closeness centrality over undirected reachability:
/// (reachable - 1) / sum of shortest-path lengths, 0 for isolated entities.
pub fn closeness(
    snapshot: &GraphSnapshot,
    cancel: &CancelToken,
) -> Result<Vec<(EntityId, f64)>, ContextGraphError> {
    let dense = index_snapshot(snapshot);
    let n = dense.ids.len();
    let mut result = Vec::with_capacity(n);
    let mut dist = vec![-1i64; n];
    for source in 0..n {
        cancel.check("closeness")?;
        dist.fill(-1);
        dist[source] = 0;
        let mut queue = VecDeque::new();
        queue.push_back(source);
        let mut reachable = 0u64;
        let mut total = 0i64;
        while let Some(node) = queue.pop_front() {
            for &next in &dense.undirected[node] {
                if dist[next] < 0 {
                    dist[next] = dist[node] + 1;
                    reachable += 1;
                    total += dist[next];
                    queue.push_back(next);
                }
            }
        }
        let raw = if reachable > 0 && total > 0 {
            reachable as f64 / total as f64
        } else {
            0.0
        };
        result.push((dense.ids[source], raw));
    }
    Ok(result)
}

/// Raw betweenness via Brandes' algorithm over directed relationships:
/// accumulated pair dependencies, not yet normalized.
pub fn betweenness(
    snapshot: &GraphSnapshot,
    cancel: &CancelToken,
) -> Result<Vec<(EntityId, f64)>, ContextGraphError> {
    let dense = index_snapshot(snapshot);
    let n = dense.ids.len();
    let mut scores = vec![0.0f64; n];
    for source in 0..n {
        cancel.check("betweenness")?;
        let mut stack = Vec::with_capacity(n);
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0f64; n];
        let mut dist = vec![-1i64; n];
        sigma[source] = 1.0;
        dist[source] = 0;
        let mut queue = VecDeque::new();
        queue.push_back(source);
        while let Some(node) = queue.pop_front() {
            stack.push(node);
            for &next in &dense.out[node] {
                if dist[next] < 0 {
                    dist[next] = dist[node] + 1;
                    queue.push_back(next);
                }
                if dist[next] == dist[node] + 1 {
                    sigma[next] += sigma[node];
                    preds[next].push(node);
                }
            }
        }
        let mut delta = vec![0.0f64; n];
        while let Some(node) = stack.pop() {
            for &pred in &preds[node] {
                delta[pred] += (sigma[pred] / sigma[node]) * (1.0 + delta[node]);
            }
            if node != source {
                scores[node] += delta[node];
            }
        }
    }
    Ok(dense.ids.iter().copied().zip(scores).collect())
}

/// Eigenvector centrality by power iteration over the undirected view.
/// Returns `(raw scores, converged)`. A disconnected graph or a vanishing
/// iterate falls back to uniform scores with `converged = false`; hitting
/// the iteration cap returns the last iterate with `converged = false`.
pub fn eigenvector(
    snapshot: &GraphSnapshot,
    tolerance: f64,
    max_iterations: u32,
    cancel: &CancelToken,
) -> Result<(Vec<(EntityId, f64)>, bool), ContextGraphError> {
    let dense = index_snapshot(snapshot);
    let n = dense.ids.len();
    if n == 0 {
        return Ok((Vec::new(), true));
    }
    if n == 1 {
        return Ok((vec![(dense.ids[0], 1.0)], true));
    }
    let components = weak_component_count(&dense.undirected);
    if components > 1 {
        tracing::warn!(components, "eigenvector fallback: graph is disconnected");
        let uniform = 1.0 / (n as f64).sqrt();
        return Ok((
            dense.ids.iter().map(|id| (*id, uniform)).collect(),
            false,
        ));
    }
    let uniform = 1.0 / (n as f64).sqrt();
    let mut current = vec![uniform; n];
    let mut next = vec![0.0f64; n];
    for iteration in 0..max_iterations {
        cancel.check("eigenvector")?;
        for node in 0..n {
            next[node] = dense.undirected[node]
                .iter()
                .map(|&peer| current[peer])
                .sum();
        }
        let norm = next.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm < 1e-12 {
            tracing::warn!("eigenvector fallback: iterate vanished");
            return Ok((
                dense.ids.iter().map(|id| (*id, uniform)).collect(),
                false,
            ));
        }
        for value in next.iter_mut() {
            *value /= norm;
        }
        let delta = current
            .iter()
            .zip(next.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt();
        std::mem::swap(&mut current, &mut next);
        if delta < tolerance {
            tracing::debug!(iteration, "eigenvector converged");
            return Ok((dense.ids.iter().copied().zip(current).collect(), true));
        }
    }
    tracing::warn!(max_iterations, "eigenvector did not converge");
    Ok((dense.ids.iter().copied().zip(current).collect(), false))
}

/// PageRank over directed relationships with dangling-mass redistribution.
/// Returns `(raw scores summing to 1.0, converged)`.
pub fn pagerank(
    snapshot: &GraphSnapshot,
    damping: f64,
    tolerance: f64,
    max_iterations: u32,
    cancel: &CancelToken,
) -> Result<(Vec<(EntityId, f64)>, bool), ContextGraphError> {
    let dense = index_snapshot(snapshot);
    let n = dense.ids.len();
    if n == 0 {
        return Ok((Vec::new(), true));
    }
    let count = n as f64;
    let base = (1.0 - damping) / count;
    let mut scores = vec![1.0 / count; n];
    let mut next = vec![0.0f64; n];
    let mut converged = false;
    for iteration in 0..max_iterations {
        cancel.check("pagerank")?;
        let dangling: f64 = (0..n)
            .filter(|node| dense.out[*node].is_empty())
            .map(|node| scores[node])
            .sum();
        let shared = base + damping * dangling / count;
        for value in next.iter_mut() {
            *value = shared;
        }
        for node in 0..n {
            let out_degree = dense.out[node].len();
            if out_degree > 0 {
                let contribution = damping * scores[node] / out_degree as f64;
                for &next_node in &dense.out[node] {
                    next[next_node] += contribution;
                }
            }
        }
        let delta: f64 = scores
            .iter()
            .zip(next.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();
        std::mem::swap(&mut scores, &mut next);
        if delta < tolerance {
            tracing::debug!(iteration, "pagerank converged");
            converged = true;
            break;
        }
    }
    if !converged {
        tracing::warn!(max_iterations, "pagerank did not converge");
    }
    let total: f64 = scores.iter().sum();
    if total > 0.0 {
        for value in scores.iter_mut() {
            *value /= total;
        }
    }
    Ok((dense.ids.iter().copied().zip(scores).collect(), converged))
}

/// Full centrality report: all five metrics normalized to [0,100], ranks,
/// and the weighted strategic value.
pub fn compute_centrality(
    snapshot: &GraphSnapshot,
    config: &CentralityConfig,
    cancel: &CancelToken,
) -> Result<CentralityReport, ContextGraphError> {
    config.validate()?;
    let n = snapshot.entity_count();
    if n == 0 {
        return Ok(CentralityReport {
            snapshot_version: snapshot.version(),
            partial: false,
            scores: Vec::new(),
        });
    }

    let degree_raw = degree(snapshot);
    let closeness_raw = closeness(snapshot, cancel)?;
    let betweenness_raw = betweenness(snapshot, cancel)?;
    let (eigenvector_raw, eigen_converged) =
        eigenvector(snapshot, config.tolerance, config.max_iterations, cancel)?;
    let (pagerank_raw, pagerank_converged) = pagerank(
        snapshot,
        config.damping,
        config.tolerance,
        config.max_iterations,
        cancel,
    )?;

    let degree_scores: Vec<f64> = degree_raw
        .iter()
        .map(|(_, raw)| (raw * 100.0).min(100.0))
        .collect();
    let closeness_scores: Vec<f64> = closeness_raw.iter().map(|(_, raw)| raw * 100.0).collect();
    let pair_count = if n > 2 { ((n - 1) * (n - 2)) as f64 } else { 0.0 };
    let betweenness_scores: Vec<f64> = betweenness_raw
        .iter()
        .map(|(_, raw)| {
            if pair_count > 0.0 {
                (raw / pair_count * 100.0).min(100.0)
            } else {
                0.0
            }
        })
        .collect();
    let eigenvector_scores = scale_by_max(&eigenvector_raw);
    let pagerank_scores = scale_by_max(&pagerank_raw);

    let degree_ranks = ranks(&degree_scores);
    let closeness_ranks = ranks(&closeness_scores);
    let betweenness_ranks = ranks(&betweenness_scores);
    let eigenvector_ranks = ranks(&eigenvector_scores);
    let pagerank_ranks = ranks(&pagerank_scores);

    let weights = &config.weights;
    let weight_sum = weights.sum();
    let mut scores = Vec::with_capacity(n);
    for idx in 0..n {
        let strategic_value = (degree_scores[idx] * weights.degree
            + closeness_scores[idx] * weights.closeness
            + betweenness_scores[idx] * weights.betweenness
            + eigenvector_scores[idx] * weights.eigenvector
            + pagerank_scores[idx] * weights.pagerank)
            / weight_sum;
        scores.push(EntityScores {
            entity_id: degree_raw[idx].0,
            degree: degree_scores[idx],
            closeness: closeness_scores[idx],
            betweenness: betweenness_scores[idx],
            eigenvector: eigenvector_scores[idx],
            pagerank: pagerank_scores[idx],
            degree_rank: degree_ranks[idx],
            closeness_rank: closeness_ranks[idx],
            betweenness_rank: betweenness_ranks[idx],
            eigenvector_rank: eigenvector_ranks[idx],
            pagerank_rank: pagerank_ranks[idx],
            strategic_value,
        });
    }
    Ok(CentralityReport {
        snapshot_version: snapshot.version(),
        partial: !eigen_converged || !pagerank_converged,
        scores,
    })
}

fn scale_by_max(raw: &[(EntityId, f64)]) -> Vec<f64> {
    let max = raw.iter().map(|(_, v)| *v).fold(0.0f64, f64::max);
    raw.iter()
        .map(|(_, v)| if max > 0.0 { v / max * 100.0 } else { 0.0 })
        .collect()
}

// Rank 1 is the highest score; equal scores rank by position, which is
// ascending entity id.
fn ranks(scores: &[f64]) -> Vec<u32> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|a, b| {
        scores[*b]
            .partial_cmp(&scores[*a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(b))
    });
    let mut result = vec![0u32; scores.len()];
    for (rank, idx) in order.into_iter().enumerate() {
        result[idx] = rank as u32 + 1;
    }
    result
}

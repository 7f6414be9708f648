use serde_json::json;

use contextgraph::{
    CancelToken, CentralityConfig, CentralityWeights, ContextGraph, ContextGraphError, Entity,
    EntityKind, LifecycleStatus, Relationship, RelationshipKind, compute_centrality,
};
use contextgraph::centrality::{betweenness, pagerank};

fn sample_entity(id: i64) -> Entity {
    Entity {
        id,
        kind: EntityKind::Application,
        name: format!("app_{id}"),
        attributes: json!({}),
        status: LifecycleStatus::Active,
        created_at_ms: 0,
        updated_at_ms: 0,
    }
}

fn sample_relationship(source: i64, target: i64) -> Relationship {
    Relationship {
        id: 0,
        source_id: source,
        target_id: target,
        kind: RelationshipKind::Uses,
        strength: 50.0,
        metadata: json!({}),
        created_at_ms: 0,
        updated_at_ms: 0,
    }
}

fn build_graph(node_count: i64, links: &[(i64, i64)]) -> ContextGraph {
    let graph = ContextGraph::new();
    for id in 1..=node_count {
        graph.insert_entity(&sample_entity(id)).unwrap();
    }
    for &(from, to) in links {
        graph.insert_relationship(&sample_relationship(from, to)).unwrap();
    }
    graph
}

#[test]
fn test_cycle_has_uniform_degree_and_betweenness() {
    // A→B→C→D→E→A
    let graph = build_graph(5, &[(1, 2), (2, 3), (3, 4), (4, 5), (5, 1)]);
    let report = compute_centrality(
        &graph.snapshot(),
        &CentralityConfig::default(),
        &CancelToken::new(),
    )
    .expect("centrality");
    assert_eq!(report.scores.len(), 5);
    let first = &report.scores[0];
    for scores in &report.scores {
        assert_eq!(scores.degree, first.degree);
        assert_eq!(scores.betweenness, first.betweenness);
        assert_eq!(scores.closeness, first.closeness);
    }
    assert!(!report.partial);
}

#[test]
fn test_chain_middle_has_highest_betweenness() {
    let graph = build_graph(5, &[(1, 2), (2, 3), (3, 4), (4, 5)]);
    let raw = betweenness(&graph.snapshot(), &CancelToken::new()).expect("betweenness");
    let by_id: std::collections::HashMap<i64, f64> = raw.into_iter().collect();
    assert!(by_id[&3] > by_id[&2]);
    assert!(by_id[&3] > by_id[&4]);
    // chain endpoints carry no shortest path
    assert_eq!(by_id[&1], 0.0);
    assert_eq!(by_id[&5], 0.0);
}

#[test]
fn test_degree_zero_entity_has_zero_betweenness() {
    let graph = build_graph(4, &[(1, 2), (2, 3)]);
    let raw = betweenness(&graph.snapshot(), &CancelToken::new()).expect("betweenness");
    let isolated = raw.iter().find(|(id, _)| *id == 4).expect("entity 4");
    assert_eq!(isolated.1, 0.0);
}

#[test]
fn test_pagerank_raw_scores_sum_to_one() {
    let graph = build_graph(6, &[(1, 2), (2, 3), (3, 1), (4, 2), (5, 2), (6, 5)]);
    let (raw, converged) = pagerank(
        &graph.snapshot(),
        0.85,
        1e-6,
        100,
        &CancelToken::new(),
    )
    .expect("pagerank");
    assert!(converged);
    let total: f64 = raw.iter().map(|(_, score)| score).sum();
    assert!((total - 1.0).abs() < 1e-9, "sum was {total}");
}

#[test]
fn test_identical_adjacency_gets_identical_scores() {
    // 2 and 3 both only receive one relationship from 1
    let graph = build_graph(3, &[(1, 2), (1, 3)]);
    let report = compute_centrality(
        &graph.snapshot(),
        &CentralityConfig::default(),
        &CancelToken::new(),
    )
    .expect("centrality");
    let b = report.score(2).unwrap();
    let c = report.score(3).unwrap();
    assert_eq!(b.degree, c.degree);
    assert_eq!(b.pagerank, c.pagerank);
    assert_eq!(b.strategic_value, c.strategic_value);
    // ranks on tied scores fall back to ascending entity id
    assert!(b.degree_rank < c.degree_rank);
}

#[test]
fn test_disconnected_graph_falls_back_to_uniform_eigenvector() {
    let graph = build_graph(4, &[(1, 2), (3, 4)]);
    let report = compute_centrality(
        &graph.snapshot(),
        &CentralityConfig::default(),
        &CancelToken::new(),
    )
    .expect("centrality");
    assert!(report.partial);
    let eigen: Vec<f64> = report.scores.iter().map(|s| s.eigenvector).collect();
    assert!(eigen.iter().all(|score| (*score - eigen[0]).abs() < 1e-9));
}

#[test]
fn test_closeness_is_undirected_so_sinks_stay_nonzero() {
    // directed chain; entity 3 has no outgoing relationships
    let graph = build_graph(3, &[(1, 2), (2, 3)]);
    let report = compute_centrality(
        &graph.snapshot(),
        &CentralityConfig::default(),
        &CancelToken::new(),
    )
    .expect("centrality");
    assert!(report.score(3).unwrap().closeness > 0.0);
    // the middle of the chain is closest to everything
    assert!(report.score(2).unwrap().closeness > report.score(1).unwrap().closeness);
}

#[test]
fn test_results_are_insertion_order_independent() {
    let links = [(1, 3), (1, 2), (2, 4), (2, 5), (5, 1)];
    let forward = build_graph(5, &links);
    let mut reversed = links;
    reversed.reverse();
    let backward = build_graph(5, &reversed);
    let config = CentralityConfig::default();
    let cancel = CancelToken::new();
    let report_a = compute_centrality(&forward.snapshot(), &config, &cancel).unwrap();
    let report_b = compute_centrality(&backward.snapshot(), &config, &cancel).unwrap();
    assert_eq!(report_a.scores, report_b.scores);
    assert_eq!(report_a.partial, report_b.partial);
}

#[test]
fn test_strategic_value_follows_weights() {
    let graph = build_graph(4, &[(1, 2), (1, 3), (1, 4)]);
    let config = CentralityConfig {
        weights: CentralityWeights {
            degree: 1.0,
            closeness: 0.0,
            betweenness: 0.0,
            eigenvector: 0.0,
            pagerank: 0.0,
        },
        ..CentralityConfig::default()
    };
    let report = compute_centrality(&graph.snapshot(), &config, &CancelToken::new()).unwrap();
    for scores in &report.scores {
        assert_eq!(scores.strategic_value, scores.degree);
    }
}

#[test]
fn test_all_zero_weights_rejected() {
    let graph = build_graph(2, &[(1, 2)]);
    let config = CentralityConfig {
        weights: CentralityWeights {
            degree: 0.0,
            closeness: 0.0,
            betweenness: 0.0,
            eigenvector: 0.0,
            pagerank: 0.0,
        },
        ..CentralityConfig::default()
    };
    let err = compute_centrality(&graph.snapshot(), &config, &CancelToken::new())
        .expect_err("weights");
    assert!(matches!(err, ContextGraphError::InvalidParameter(_)));
}

#[test]
fn test_cancelled_token_aborts_computation() {
    let graph = build_graph(5, &[(1, 2), (2, 3), (3, 4), (4, 5), (5, 1)]);
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = compute_centrality(&graph.snapshot(), &CentralityConfig::default(), &cancel)
        .expect_err("cancelled");
    assert!(matches!(err, ContextGraphError::Cancelled(_)));
}

#[test]
fn test_empty_graph_yields_empty_report() {
    let graph = ContextGraph::new();
    let report = compute_centrality(
        &graph.snapshot(),
        &CentralityConfig::default(),
        &CancelToken::new(),
    )
    .expect("centrality");
    assert!(report.scores.is_empty());
    assert!(!report.partial);
}

#[test]
fn test_single_entity_scores_are_zero_degree() {
    let graph = ContextGraph::new();
    graph.insert_entity(&sample_entity(1)).unwrap();
    let report = compute_centrality(
        &graph.snapshot(),
        &CentralityConfig::default(),
        &CancelToken::new(),
    )
    .expect("centrality");
    let scores = report.score(1).unwrap();
    assert_eq!(scores.degree, 0.0);
    assert_eq!(scores.closeness, 0.0);
    assert_eq!(scores.betweenness, 0.0);
}

#[test]
fn test_scores_stay_within_bounds() {
    let graph = build_graph(6, &[(1, 2), (2, 3), (3, 4), (4, 5), (5, 6), (6, 1), (1, 4)]);
    let report = compute_centrality(
        &graph.snapshot(),
        &CentralityConfig::default(),
        &CancelToken::new(),
    )
    .expect("centrality");
    for scores in &report.scores {
        for value in [
            scores.degree,
            scores.closeness,
            scores.betweenness,
            scores.eigenvector,
            scores.pagerank,
            scores.strategic_value,
        ] {
            assert!((0.0..=100.0).contains(&value), "out of range: {value}");
        }
    }
}

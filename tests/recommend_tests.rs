use serde_json::json;

use contextgraph::{
    ContextGraph, ContextGraphError, Entity, EntityKind, LifecycleStatus, Priority,
    RecommendConfig, Relationship, RelationshipKind, RecommendationAction, recommend,
};

const DAY_MS: i64 = 86_400_000;
const NOW_MS: i64 = 1_700_000_000_000;

fn entity(id: i64, kind: EntityKind, name: &str, status: LifecycleStatus) -> Entity {
    Entity {
        id,
        kind,
        name: name.to_string(),
        attributes: json!({}),
        status,
        created_at_ms: 1,
        updated_at_ms: 1,
    }
}

fn relationship(
    source: i64,
    target: i64,
    kind: RelationshipKind,
    strength: f64,
    metadata: serde_json::Value,
) -> Relationship {
    Relationship {
        id: 0,
        source_id: source,
        target_id: target,
        kind,
        strength,
        metadata,
        created_at_ms: 1,
        updated_at_ms: 1,
    }
}

#[test]
fn test_missing_link_flags_the_unlinked_application() {
    let graph = ContextGraph::new();
    // 10 applications, ids 1..=10
    for id in 1..=10 {
        graph
            .insert_entity(&entity(
                id,
                EntityKind::Application,
                &format!("app_{id}"),
                LifecycleStatus::Active,
            ))
            .unwrap();
    }
    // 2 technologies
    for (id, name) in [(20, "postgres"), (21, "redis")] {
        graph
            .insert_entity(&entity(id, EntityKind::Technology, name, LifecycleStatus::Active))
            .unwrap();
    }
    // 9 of 10 applications use a technology; app_10 does not
    for id in 1..=9 {
        let target = if id <= 7 { 20 } else { 21 };
        graph
            .insert_relationship(&relationship(
                id,
                target,
                RelationshipKind::Uses,
                60.0,
                json!({}),
            ))
            .unwrap();
    }

    let recs = recommend(&graph.snapshot(), &RecommendConfig::default(), NOW_MS).expect("recommend");
    let missing: Vec<_> = recs
        .iter()
        .filter(|r| r.algorithm == "missing-link")
        .collect();
    assert_eq!(missing.len(), 1);
    let rec = missing[0];
    assert_eq!(rec.action, RecommendationAction::Add);
    assert_eq!(rec.source_id, 10);
    // suggested target is the most referenced technology
    assert_eq!(rec.target_id, 20);
    assert_eq!(rec.kind, RelationshipKind::Uses);
    assert!((rec.confidence - 90.0).abs() < 1e-9);
    assert_eq!(rec.priority, Priority::High);
    assert_eq!(rec.suggested_strength, 60.0);
    assert!(!rec.evidence.is_empty());
}

#[test]
fn test_no_missing_link_below_threshold() {
    let graph = ContextGraph::new();
    for id in 1..=4 {
        graph
            .insert_entity(&entity(
                id,
                EntityKind::Application,
                &format!("app_{id}"),
                LifecycleStatus::Active,
            ))
            .unwrap();
    }
    graph
        .insert_entity(&entity(9, EntityKind::Technology, "db", LifecycleStatus::Active))
        .unwrap();
    // only half the applications link: 0.5 < 0.8
    for id in 1..=2 {
        graph
            .insert_relationship(&relationship(id, 9, RelationshipKind::Uses, 50.0, json!({})))
            .unwrap();
    }
    let recs = recommend(&graph.snapshot(), &RecommendConfig::default(), NOW_MS).expect("recommend");
    assert!(recs.iter().all(|r| r.algorithm != "missing-link"));
}

#[test]
fn test_strengthen_flags_weak_outlier_with_usage_signal() {
    let graph = ContextGraph::new();
    for id in 1..=6 {
        graph
            .insert_entity(&entity(
                id,
                EntityKind::Application,
                &format!("app_{id}"),
                LifecycleStatus::Active,
            ))
            .unwrap();
    }
    graph
        .insert_entity(&entity(9, EntityKind::Technology, "queue", LifecycleStatus::Active))
        .unwrap();
    // depends-on population: strengths 80,80,80,80,80 and one weak 10
    for id in 1..=5 {
        graph
            .insert_relationship(&relationship(
                id,
                9,
                RelationshipKind::DependsOn,
                80.0,
                json!({}),
            ))
            .unwrap();
    }
    graph
        .insert_relationship(&relationship(
            6,
            9,
            RelationshipKind::DependsOn,
            10.0,
            json!({ "usage_count": 500 }),
        ))
        .unwrap();

    let recs = recommend(&graph.snapshot(), &RecommendConfig::default(), NOW_MS).expect("recommend");
    let strengthen: Vec<_> = recs
        .iter()
        .filter(|r| r.action == RecommendationAction::Strengthen)
        .collect();
    assert_eq!(strengthen.len(), 1);
    let rec = strengthen[0];
    assert_eq!(rec.source_id, 6);
    assert_eq!(rec.target_id, 9);
    assert_eq!(rec.suggested_strength, 80.0);
    // the usage_count signal raises confidence
    assert!((rec.confidence - 85.0).abs() < 1e-9);
    assert_eq!(rec.evidence.len(), 2);
}

#[test]
fn test_removal_flags_stale_link_to_retired_target() {
    let graph = ContextGraph::new();
    graph
        .insert_entity(&entity(1, EntityKind::Application, "app", LifecycleStatus::Active))
        .unwrap();
    graph
        .insert_entity(&entity(
            2,
            EntityKind::Technology,
            "old_db",
            LifecycleStatus::Retired,
        ))
        .unwrap();
    graph
        .insert_entity(&entity(
            3,
            EntityKind::Technology,
            "new_db",
            LifecycleStatus::Active,
        ))
        .unwrap();
    // stale link to the retired target
    graph
        .insert_relationship(&relationship(
            1,
            2,
            RelationshipKind::Uses,
            40.0,
            json!({ "last_activity_ms": NOW_MS - 120 * DAY_MS }),
        ))
        .unwrap();
    // active link, not stale
    graph
        .insert_relationship(&relationship(
            1,
            3,
            RelationshipKind::Uses,
            40.0,
            json!({ "last_activity_ms": NOW_MS - 5 * DAY_MS }),
        ))
        .unwrap();

    let recs = recommend(&graph.snapshot(), &RecommendConfig::default(), NOW_MS).expect("recommend");
    let removals: Vec<_> = recs
        .iter()
        .filter(|r| r.action == RecommendationAction::Remove)
        .collect();
    assert_eq!(removals.len(), 1);
    let rec = removals[0];
    assert_eq!(rec.target_id, 2);
    assert_eq!(rec.kind, RelationshipKind::Uses);
    assert!((rec.confidence - 90.0).abs() < 1e-9);
    assert!(rec.evidence.iter().any(|line| line.contains("retired")));
}

#[test]
fn test_recent_activity_suppresses_removal() {
    let graph = ContextGraph::new();
    graph
        .insert_entity(&entity(1, EntityKind::Application, "app", LifecycleStatus::Active))
        .unwrap();
    graph
        .insert_entity(&entity(
            2,
            EntityKind::Technology,
            "sunset_db",
            LifecycleStatus::Deprecated,
        ))
        .unwrap();
    graph
        .insert_relationship(&relationship(
            1,
            2,
            RelationshipKind::Uses,
            40.0,
            json!({ "last_activity_ms": NOW_MS - 10 * DAY_MS }),
        ))
        .unwrap();
    let recs = recommend(&graph.snapshot(), &RecommendConfig::default(), NOW_MS).expect("recommend");
    assert!(recs.iter().all(|r| r.action != RecommendationAction::Remove));
}

#[test]
fn test_recommendations_sorted_by_confidence() {
    let graph = ContextGraph::new();
    graph
        .insert_entity(&entity(1, EntityKind::Application, "app", LifecycleStatus::Active))
        .unwrap();
    graph
        .insert_entity(&entity(
            2,
            EntityKind::Technology,
            "dead",
            LifecycleStatus::Retired,
        ))
        .unwrap();
    graph
        .insert_entity(&entity(
            3,
            EntityKind::Technology,
            "fading",
            LifecycleStatus::Deprecated,
        ))
        .unwrap();
    for target in [2, 3] {
        graph
            .insert_relationship(&relationship(
                1,
                target,
                RelationshipKind::Uses,
                40.0,
                json!({ "last_activity_ms": NOW_MS - 365 * DAY_MS }),
            ))
            .unwrap();
    }
    let recs = recommend(&graph.snapshot(), &RecommendConfig::default(), NOW_MS).expect("recommend");
    assert_eq!(recs.len(), 2);
    assert!(recs[0].confidence >= recs[1].confidence);
    assert_eq!(recs[0].target_id, 2);
}

#[test]
fn test_results_are_deterministic() {
    let graph = ContextGraph::new();
    for id in 1..=6 {
        graph
            .insert_entity(&entity(
                id,
                EntityKind::Application,
                &format!("app_{id}"),
                LifecycleStatus::Active,
            ))
            .unwrap();
    }
    graph
        .insert_entity(&entity(9, EntityKind::Technology, "db", LifecycleStatus::Active))
        .unwrap();
    for id in 1..=5 {
        graph
            .insert_relationship(&relationship(id, 9, RelationshipKind::Uses, 70.0, json!({})))
            .unwrap();
    }
    let snapshot = graph.snapshot();
    let config = RecommendConfig::default();
    let first = recommend(&snapshot, &config, NOW_MS).unwrap();
    let second = recommend(&snapshot, &config, NOW_MS).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_invalid_config_rejected() {
    let graph = ContextGraph::new();
    let bad_threshold = RecommendConfig {
        missing_link_threshold: 1.5,
        ..RecommendConfig::default()
    };
    let err = recommend(&graph.snapshot(), &bad_threshold, NOW_MS).expect_err("threshold");
    assert!(matches!(err, ContextGraphError::InvalidParameter(_)));

    let bad_window = RecommendConfig {
        staleness_window_ms: 0,
        ..RecommendConfig::default()
    };
    let err = recommend(&graph.snapshot(), &bad_window, NOW_MS).expect_err("window");
    assert!(matches!(err, ContextGraphError::InvalidParameter(_)));
}

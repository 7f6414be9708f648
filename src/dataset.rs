//! Deterministic synthetic graphs for benchmarks and scale tests.

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::json;

use crate::errors::ContextGraphError;
use crate::graph::{
    ContextGraph, Entity, EntityKind, LifecycleStatus, Relationship, RelationshipKind,
};

#[derive(Clone, Debug)]
pub struct GraphDataset {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
}

impl GraphDataset {
    pub fn nodes(&self) -> usize {
        self.entities.len()
    }

    pub fn links(&self) -> usize {
        self.relationships.len()
    }

    /// Insert the dataset into a fresh store.
    pub fn populate(&self, graph: &ContextGraph) -> Result<(), ContextGraphError> {
        for entity in &self.entities {
            graph.insert_entity(entity)?;
        }
        for rel in &self.relationships {
            graph.insert_relationship(rel)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub enum GraphShape {
    Line,
    Star,
    Grid2D { width: usize, height: usize },
    RandomErdosRenyi { links: usize },
    ScaleFree { m: usize },
}

/// Build a dataset with `node_count` entities (ids 1..=node_count) wired by
/// `shape`. Identical arguments produce identical datasets.
pub fn generate_graph(shape: GraphShape, node_count: usize, seed: u64) -> GraphDataset {
    assert!(node_count > 1, "node_count must exceed 1");
    let entities = build_entities(node_count);
    let mut relationships = match shape {
        GraphShape::Line => generate_line(node_count),
        GraphShape::Star => generate_star(node_count),
        GraphShape::Grid2D { width, height } => generate_grid(width, height, node_count),
        GraphShape::RandomErdosRenyi { links } => generate_random(node_count, links, seed),
        GraphShape::ScaleFree { m } => generate_scale_free(node_count, m, seed),
    };
    relationships.sort_by(|a, b| {
        a.source_id
            .cmp(&b.source_id)
            .then_with(|| a.target_id.cmp(&b.target_id))
            .then_with(|| a.kind.cmp(&b.kind))
    });
    GraphDataset {
        entities,
        relationships,
    }
}

const KIND_CYCLE: [EntityKind; 4] = [
    EntityKind::Application,
    EntityKind::Technology,
    EntityKind::Capability,
    EntityKind::Team,
];

fn build_entities(count: usize) -> Vec<Entity> {
    (0..count)
        .map(|idx| Entity {
            id: idx as i64 + 1,
            kind: KIND_CYCLE[idx % KIND_CYCLE.len()],
            name: format!("node_{idx}"),
            attributes: json!({ "idx": idx }),
            status: LifecycleStatus::Active,
            created_at_ms: 1,
            updated_at_ms: 1,
        })
        .collect()
}

fn generate_line(count: usize) -> Vec<Relationship> {
    (0..count - 1)
        .map(|idx| new_relationship(idx, idx + 1))
        .collect()
}

fn generate_star(count: usize) -> Vec<Relationship> {
    (1..count).map(|leaf| new_relationship(0, leaf)).collect()
}

fn generate_grid(width: usize, height: usize, node_count: usize) -> Vec<Relationship> {
    assert_eq!(
        width * height,
        node_count,
        "grid dimensions must match node count"
    );
    let mut links = Vec::with_capacity(width * height * 2);
    for y in 0..height {
        for x in 0..width {
            let base = y * width + x;
            if x + 1 < width {
                links.push(new_relationship(base, base + 1));
            }
            if y + 1 < height {
                links.push(new_relationship(base, base + width));
            }
        }
    }
    links
}

fn generate_random(node_count: usize, link_count: usize, seed: u64) -> Vec<Relationship> {
    let total_pairs = node_count * (node_count - 1) / 2;
    assert!(link_count <= total_pairs, "link_count exceeds possible pairs");
    let mut rng = StdRng::seed_from_u64(seed);
    let mut links = Vec::with_capacity(link_count);
    let mut chosen = ahash::AHashSet::with_capacity(link_count);
    while links.len() < link_count {
        let from = rng.gen_range(0..node_count);
        let to = rng.gen_range(0..node_count);
        if from == to {
            continue;
        }
        let (low, high) = if from < to { (from, to) } else { (to, from) };
        if chosen.insert((low, high)) {
            links.push(new_relationship(low, high));
        }
    }
    links
}

fn generate_scale_free(node_count: usize, m: usize, seed: u64) -> Vec<Relationship> {
    assert!(m > 0, "m must be positive");
    assert!(node_count > m + 1, "node_count must exceed m + 1");
    let mut rng = StdRng::seed_from_u64(seed);
    let mut degrees = vec![0usize; node_count];
    let mut links = Vec::new();
    let seed_nodes = m + 1;
    for u in 0..seed_nodes {
        for v in (u + 1)..seed_nodes {
            links.push(new_relationship(u, v));
            degrees[u] += 1;
            degrees[v] += 1;
        }
    }
    let mut total_degree: usize = degrees.iter().sum();
    for new_node in seed_nodes..node_count {
        let mut targets = Vec::new();
        while targets.len() < m {
            let pick = rng.gen_range(0..total_degree);
            let mut cumulative = 0usize;
            for candidate in 0..new_node {
                cumulative += degrees[candidate];
                if pick < cumulative {
                    if !targets.contains(&candidate) {
                        targets.push(candidate);
                    }
                    break;
                }
            }
        }
        targets.sort_unstable();
        for target in targets {
            links.push(new_relationship(target, new_node));
            degrees[target] += 1;
            degrees[new_node] += 1;
            total_degree += 2;
        }
    }
    links
}

// Strength and kind derive from the endpoint indices so a dataset is fully
// determined by (shape, node_count, seed).
fn new_relationship(from_idx: usize, to_idx: usize) -> Relationship {
    let kind = RelationshipKind::ALL[(from_idx + to_idx) % RelationshipKind::ALL.len()];
    let strength = ((from_idx * 31 + to_idx * 17) % 101) as f64;
    Relationship {
        id: 0,
        source_id: from_idx as i64 + 1,
        target_id: to_idx as i64 + 1,
        kind,
        strength,
        metadata: json!({}),
        created_at_ms: 1,
        updated_at_ms: 1,
    }
}

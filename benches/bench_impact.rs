use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};

use contextgraph::{
    CancelToken, ChangeKind, ContextGraph, analyze_impact,
    dataset::{GraphShape, generate_graph},
};

const SF_SEED: u64 = 0xFF89;
const NODES: usize = 2_000;
const SAMPLE_SIZE: usize = 20;
const WARM_UP: Duration = Duration::from_millis(300);
const MEASURE: Duration = Duration::from_millis(500);

fn hub_entity(graph: &ContextGraph) -> i64 {
    graph
        .entity_ids()
        .into_iter()
        .max_by_key(|id| graph.incoming(*id).len())
        .expect("non-empty graph")
}

fn bench_blast_radius(c: &mut Criterion) {
    let dataset = generate_graph(GraphShape::ScaleFree { m: 4 }, NODES, SF_SEED);
    let graph = ContextGraph::new();
    dataset.populate(&graph).expect("populate");
    let snapshot = graph.snapshot();
    let cancel = CancelToken::new();
    let hub = hub_entity(&graph);

    let mut group = c.benchmark_group("impact");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    for hops in [1u32, 3, 6] {
        group.bench_function(format!("hub_hops_{hops}"), |b| {
            b.iter(|| {
                analyze_impact(&snapshot, hub, ChangeKind::Delete, hops, &cancel).expect("impact")
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = impact_benches;
    config = Criterion::default();
    targets = bench_blast_radius
);
criterion_main!(impact_benches);

use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};

use contextgraph::{
    CancelToken, CentralityConfig, ContextGraph, compute_centrality,
    dataset::{GraphShape, generate_graph},
};

const LINE_SEED: u64 = 0xDD21;
const ER_SEED: u64 = 0xEE45;
const SF_SEED: u64 = 0xFF89;
const NODES: usize = 500;
const SAMPLE_SIZE: usize = 20;
const WARM_UP: Duration = Duration::from_millis(300);
const MEASURE: Duration = Duration::from_millis(500);

struct PreparedGraph {
    graph: ContextGraph,
    label: &'static str,
}

fn prepared_graphs() -> Vec<PreparedGraph> {
    let mut graphs = Vec::new();
    for (shape, seed, label) in [
        (GraphShape::Line, LINE_SEED, "line"),
        (
            GraphShape::RandomErdosRenyi {
                links: NODES.saturating_mul(4),
            },
            ER_SEED,
            "er",
        ),
        (GraphShape::ScaleFree { m: 4 }, SF_SEED, "scalefree"),
    ] {
        let dataset = generate_graph(shape, NODES, seed);
        let graph = ContextGraph::new();
        dataset.populate(&graph).expect("populate");
        graphs.push(PreparedGraph { graph, label });
    }
    graphs
}

fn bench_full_report(c: &mut Criterion) {
    let graphs = prepared_graphs();
    let cancel = CancelToken::new();
    let config = CentralityConfig::default();
    let mut group = c.benchmark_group("centrality_report");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    for prepared in &graphs {
        let snapshot = prepared.graph.snapshot();
        group.bench_function(prepared.label, |b| {
            b.iter(|| compute_centrality(&snapshot, &config, &cancel).expect("centrality"));
        });
    }
    group.finish();
}

fn bench_betweenness(c: &mut Criterion) {
    let graphs = prepared_graphs();
    let cancel = CancelToken::new();
    let mut group = c.benchmark_group("betweenness");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    for prepared in &graphs {
        let snapshot = prepared.graph.snapshot();
        group.bench_function(prepared.label, |b| {
            b.iter(|| contextgraph::centrality::betweenness(&snapshot, &cancel).expect("betweenness"));
        });
    }
    group.finish();
}

fn bench_pagerank(c: &mut Criterion) {
    let graphs = prepared_graphs();
    let cancel = CancelToken::new();
    let mut group = c.benchmark_group("pagerank");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    for prepared in &graphs {
        let snapshot = prepared.graph.snapshot();
        group.bench_function(prepared.label, |b| {
            b.iter(|| {
                contextgraph::centrality::pagerank(&snapshot, 0.85, 1e-6, 100, &cancel)
                    .expect("pagerank")
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = centrality_benches;
    config = Criterion::default();
    targets = bench_full_report, bench_betweenness, bench_pagerank
);
criterion_main!(centrality_benches);

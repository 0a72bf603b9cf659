use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use lineage_bench::synthetic_payload;
use lineage_graph::{LayeredLayouter, normalize};
use std::hint::black_box;

fn bench_layered_layout(c: &mut Criterion) {
    let layouter = LayeredLayouter::default();
    let mut group = c.benchmark_group("layered_layout");

    for (layers, width) in [(5, 10), (10, 25), (20, 50)] {
        let graph = normalize(&synthetic_payload(layers, width), None).graph;
        group.bench_with_input(
            BenchmarkId::from_parameter(graph.node_count()),
            &graph,
            |b, graph| {
                b.iter(|| {
                    let model = layouter.layout(black_box(graph));
                    black_box(model);
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_layered_layout);
criterion_main!(benches);

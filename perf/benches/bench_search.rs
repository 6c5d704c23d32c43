use chroma_perf::{make_graph, make_solution};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use generator_core::{CandidateSource, RandomColoring};
use supervisor_core::BestSolution;

fn bench_random_coloring(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    for &nodes in &[6u32, 24, 96] {
        let mut source = RandomColoring::new(make_graph(nodes), Some(7));
        group.bench_function(format!("next_candidate_{nodes}_nodes"), |b| {
            b.iter(|| black_box(source.next_candidate()));
        });
    }

    group.finish();
}

fn bench_best_solution(c: &mut Criterion) {
    let records: Vec<_> = (0..64).map(|i| make_solution(8 - (i % 8))).collect();

    c.bench_function("best_solution_offer", |b| {
        b.iter(|| {
            let mut best = BestSolution::new();
            for record in &records {
                black_box(best.offer(*record));
            }
        });
    });
}

criterion_group!(benches, bench_random_coloring, bench_best_solution);
criterion_main!(benches);

//! Incremental insertion benchmarks
//!
//! Run with: `cargo bench --bench insert_benchmark`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lofstream_core::{DistanceMetric, IncrementalLof, LinearScanOracle};

/// Generates a deterministic pseudo-random vector.
fn generate_vector(dim: usize, seed: u64) -> Vec<f64> {
    (0..dim)
        .map(|i| ((seed as f64 * 0.1 + i as f64 * 0.01).sin() + 1.0) / 2.0)
        .collect()
}

/// Benchmark building the full engine from scratch.
fn bench_insert_sequence(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_sequence");
    group.sample_size(20);

    for count in [500usize, 2000] {
        let dim = 8;
        let vectors: Vec<Vec<f64>> = (0..count as u64).map(|i| generate_vector(dim, i)).collect();
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(
            BenchmarkId::new("vectors", format!("{count}x{dim}d")),
            &vectors,
            |b, vectors| {
                b.iter(|| {
                    let oracle = LinearScanOracle::new(DistanceMetric::Euclidean, 10);
                    let mut engine = IncrementalLof::new(oracle, 10).expect("engine");
                    for v in vectors {
                        engine.insert(v.clone()).expect("insert");
                    }
                    black_box(engine.len())
                });
            },
        );
    }

    group.finish();
}

/// Benchmark the cost of one insertion as k grows.
fn bench_single_insert_by_k(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_insert");
    let base: Vec<Vec<f64>> = (0..1000).map(|i| generate_vector(4, i)).collect();

    for k in [5usize, 20, 50] {
        let oracle = LinearScanOracle::new(DistanceMetric::Euclidean, k);
        let mut engine = IncrementalLof::new(oracle, k).expect("engine");
        for v in &base {
            engine.insert(v.clone()).expect("insert");
        }

        group.bench_function(BenchmarkId::new("k", k), |b| {
            let mut seed = 10_000u64;
            b.iter(|| {
                seed += 1;
                black_box(engine.insert(generate_vector(4, seed)).expect("insert"))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_insert_sequence, bench_single_insert_by_k);
criterion_main!(benches);

//! Criterion benchmarks for aad_core.
//!
//! Measures recording and the backward sweep as the tape grows and as the
//! number of Monte Carlo paths per node grows.

use aad_core::{AadSession, DifferentiableVariable, RandomVariable};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Records `depth` rounds of `acc = sin(acc * x) + y / acc` and returns the output.
fn record_chain<'s>(
    x: DifferentiableVariable<'s>,
    y: DifferentiableVariable<'s>,
    depth: usize,
) -> DifferentiableVariable<'s> {
    let mut acc = x;
    for _ in 0..depth {
        let product = acc.mult(x).unwrap().sin().unwrap();
        let ratio = y.div(acc).unwrap();
        acc = product.add(ratio).unwrap().add_scalar(2.0).unwrap();
    }
    acc
}

/// Benchmark recording and differentiating deterministic chains.
fn bench_tape_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("tape_depth");

    for depth in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("record", depth), &depth, |b, &depth| {
            b.iter(|| {
                let session = AadSession::new();
                let x = session.create_leaf(0.7).unwrap();
                let y = session.create_leaf(1.3).unwrap();
                black_box(record_chain(x, y, depth).id());
            });
        });

        group.bench_with_input(
            BenchmarkId::new("record_and_sweep", depth),
            &depth,
            |b, &depth| {
                b.iter(|| {
                    let session = AadSession::new();
                    let x = session.create_leaf(0.7).unwrap();
                    let y = session.create_leaf(1.3).unwrap();
                    let z = record_chain(x, y, depth);
                    black_box(session.gradient(&z).unwrap());
                });
            },
        );
    }

    group.finish();
}

/// Benchmark the backward sweep as the number of paths per node grows.
fn bench_path_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_count");

    for paths in [100, 10_000, 100_000] {
        let draws: Vec<f64> = (0..paths)
            .map(|i| ((i as f64 + 0.5) / paths as f64 - 0.5) * 4.0)
            .collect();
        let draws = RandomVariable::new(1.0, draws).unwrap();

        group.bench_with_input(BenchmarkId::new("forward_greeks", paths), &draws, |b, draws| {
            b.iter(|| {
                let session = AadSession::new();
                let spot = session.create_leaf(100.0).unwrap();
                let rate = session.create_leaf(0.03).unwrap();
                let vol = session.create_leaf(0.2).unwrap();

                let drift = vol
                    .squared()
                    .and_then(|v| v.mult_scalar(-0.5))
                    .and_then(|v| v.add(rate))
                    .unwrap();
                let diffusion = vol.mult(draws).unwrap();
                let terminal = spot.mult(drift.add(diffusion).unwrap().exp().unwrap()).unwrap();
                let discount = rate.mult_scalar(-1.0).and_then(|v| v.exp()).unwrap();
                let pv = terminal.sub_scalar(100.0).and_then(|v| v.mult(discount)).unwrap();

                black_box(session.gradient(&pv).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tape_depth, bench_path_count);
criterion_main!(benches);

//! Criterion micro-benchmarks for total ordering and order digests.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lamport_bench::{ranking_for, synthetic_logs};
use lamport_core::{order_digest, total_order, Direction, EventOrder, Ranking};

fn bench_total_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("total_order");
    for &(processes, events) in &[(4, 1_000), (16, 10_000), (64, 100_000)] {
        let logs = synthetic_logs(processes, events, 42).expect("synthetic logs");
        let ranking = ranking_for(processes).unwrap_or_default();
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{processes}x{events}")),
            &logs,
            |b, logs| b.iter(|| black_box(total_order(&ranking, logs.iter().cloned()))),
        );
    }
    group.finish();
}

fn bench_lexicographic_descending(c: &mut Criterion) {
    let logs = synthetic_logs(16, 10_000, 7).expect("synthetic logs");
    let order = EventOrder::new(Ranking::lexicographic()).with_direction(Direction::Descending);
    c.bench_function("total_order_lexicographic_desc_16x10k", |b| {
        b.iter(|| black_box(order.sort(logs.iter().cloned())))
    });
}

fn bench_order_digest(c: &mut Criterion) {
    let logs = synthetic_logs(16, 10_000, 3).expect("synthetic logs");
    let ordered = total_order(&Ranking::lexicographic(), logs);
    c.bench_function("order_digest_16x10k", |b| {
        b.iter(|| black_box(order_digest(&ordered)))
    });
}

criterion_group!(
    benches,
    bench_total_order,
    bench_lexicographic_descending,
    bench_order_digest
);
criterion_main!(benches);

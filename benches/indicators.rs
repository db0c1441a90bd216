//! Performance benchmarks for technical indicators

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pulse::market::analyze;
use pulse::market::indicators::{bollinger, ema, macd, rsi};

/// Deterministic random-walk-ish close series
fn closes(len: usize) -> Vec<f64> {
    let mut price = 100.0;
    (0..len)
        .map(|i| {
            let step = ((i * 37 % 17) as f64 - 8.0) * 0.35;
            price = (price + step).max(1.0);
            price
        })
        .collect()
}

fn bench_individual(c: &mut Criterion) {
    let series = closes(250);

    let mut group = c.benchmark_group("indicator");
    group.bench_function("rsi_14", |b| b.iter(|| rsi(black_box(&series), 14)));
    group.bench_function("ema_26", |b| b.iter(|| ema(black_box(&series), 26)));
    group.bench_function("macd", |b| b.iter(|| macd(black_box(&series))));
    group.bench_function("bollinger_20", |b| {
        b.iter(|| bollinger(black_box(&series), 20, 2.0))
    });
    group.finish();
}

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze");
    for len in [60, 250, 1000] {
        let series = closes(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &series, |b, series| {
            b.iter(|| analyze(black_box(series)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_individual, bench_analyze);
criterion_main!(benches);

//! Criterion benchmarks for the preprocessing hot paths.
//!
//! Benchmarks:
//! 1. Single indicators over long close series
//! 2. Full feature sets (model, technical)
//! 3. Min-max fit + transform on a built frame

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use stockpipe_core::domain::Bar;
use stockpipe_core::features::FeatureSet;
use stockpipe_core::indicators::{Bollinger, Indicator, Macd, Rsi, Sma};
use stockpipe_core::scaling::{Scaler, ScalerKind};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            Bar {
                symbol: "BENCH".into(),
                date: base_date + chrono::Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000_000.0 + (i % 500) as f64,
            }
        })
        .collect()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicators");

    for &n in &[252, 2520] {
        let closes: Vec<f64> = make_bars(n).iter().map(|b| b.close).collect();
        let indicators: Vec<Box<dyn Indicator>> = vec![
            Box::new(Sma::new(20)),
            Box::new(Rsi::wilder(14)),
            Box::new(Macd::signal_line(12, 26, 9)),
            Box::new(Bollinger::upper(20, 2.0)),
        ];
        for ind in &indicators {
            group.bench_with_input(BenchmarkId::new(ind.name(), n), &n, |b, _| {
                b.iter(|| ind.compute(black_box(&closes)));
            });
        }
    }

    group.finish();
}

fn bench_feature_sets(c: &mut Criterion) {
    let mut group = c.benchmark_group("feature_sets");

    for &n in &[252, 2520] {
        let bars = make_bars(n);
        for set in [FeatureSet::Model, FeatureSet::Technical] {
            group.bench_with_input(BenchmarkId::new(set.to_string(), n), &n, |b, _| {
                b.iter(|| set.build("BENCH", black_box(&bars)));
            });
        }
    }

    group.finish();
}

fn bench_scaling(c: &mut Criterion) {
    let frame = FeatureSet::Model
        .build("BENCH", &make_bars(2520))
        .drop_incomplete();

    c.bench_function("min_max_fit_transform_2520", |b| {
        b.iter(|| {
            let mut f = frame.clone();
            let scaler = Scaler::fit(ScalerKind::MinMax, black_box(&f));
            scaler.transform(&mut f).unwrap();
            f
        })
    });
}

criterion_group!(benches, bench_indicators, bench_feature_sets, bench_scaling);
criterion_main!(benches);

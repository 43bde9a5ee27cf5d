//! Criterion benchmarks for GridLab hot paths.
//!
//! Benchmarks:
//! 1. Bar loop (full backtest iteration)
//! 2. Position book valuation (snapshot over a growing fill ledger)
//! 3. Re-arm state machine (sequential on_bar calls)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use gridlab_core::domain::{Bar, PositionBook};
use gridlab_core::engine::{run_backtest, EngineConfig};
use gridlab_core::strategy::{ReArmStrategy, StrategyConfig};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2020, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..n)
        .map(|i| {
            let close = 4450.0 + (i as f64 * 0.1).sin() * 120.0;
            let open = close - 3.0;
            Bar::new(
                base + chrono::Duration::hours(i as i64),
                open,
                close + 15.0,
                close - 15.0,
                close,
            )
        })
        .collect()
}

// ── 1. Bar Loop ──────────────────────────────────────────────────────

fn bench_bar_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("bar_loop");
    let config = EngineConfig::default();

    for &n in &[1_000usize, 10_000, 50_000] {
        let bars = make_bars(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &bars, |b, bars| {
            b.iter(|| run_backtest(black_box(config), black_box(bars)).unwrap())
        });
    }
    group.finish();
}

// ── 2. Position Book ─────────────────────────────────────────────────

fn bench_book_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("book_snapshot");

    for &fills in &[1usize, 10, 100] {
        let mut book = PositionBook::new(100.0).unwrap();
        for i in 0..fills {
            book.add_fill(4450.0 - i as f64 * 25.0, 10.0);
        }
        group.bench_with_input(BenchmarkId::from_parameter(fills), &book, |b, book| {
            b.iter(|| book.snapshot(black_box(4400.0), black_box(4350.0)))
        });
    }
    group.finish();
}

// ── 3. Strategy ──────────────────────────────────────────────────────

fn bench_strategy(c: &mut Criterion) {
    let bars = make_bars(10_000);
    c.bench_function("rearm_on_bar_10k", |b| {
        b.iter(|| {
            let mut s = ReArmStrategy::new(StrategyConfig::default()).unwrap();
            for bar in &bars {
                black_box(s.on_bar(bar.open, bar.high, bar.low, bar.close));
            }
        })
    });
}

criterion_group!(benches, bench_bar_loop, bench_book_snapshot, bench_strategy);
criterion_main!(benches);

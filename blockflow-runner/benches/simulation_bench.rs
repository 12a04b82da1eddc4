//! Criterion benchmarks for validation and backtest throughput.
//!
//! Run with: `cargo bench -p blockflow-runner`

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use blockflow_core::catalog::BlockCatalog;
use blockflow_core::domain::{Connection, Position, Strategy, StrategyCategory};
use blockflow_core::validator::{GraphValidator, ValidatorConfig};
use blockflow_runner::{SimulationConfig, Simulator};

/// A trigger followed by a chain of `n` swaps.
fn chain_strategy(n: usize) -> Strategy {
    let catalog = BlockCatalog::with_defaults();
    let mut s = Strategy::new("bench", "Bench", StrategyCategory::Trading).with_block(
        catalog
            .create_block("schedule_trigger", "t", Position::default())
            .unwrap(),
    );
    let mut prev = ("t".to_string(), "trigger");
    for i in 0..n {
        let id = format!("swap{i}");
        s.blocks.push(
            catalog
                .create_block("swap", id.as_str(), Position::new(i as f64 * 250.0, 0.0))
                .unwrap(),
        );
        s.connections.push(Connection::new(
            &format!("e{i}"),
            (prev.0.as_str(), prev.1),
            (id.as_str(), "execute"),
        ));
        prev = (id, "result");
    }
    s
}

fn bench_validate(c: &mut Criterion) {
    let validator = GraphValidator::new(
        Arc::new(BlockCatalog::with_defaults()),
        ValidatorConfig::default(),
    );
    let mut group = c.benchmark_group("validate");
    for size in [5, 50, 500] {
        let strategy = chain_strategy(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &strategy, |b, s| {
            b.iter(|| validator.validate(black_box(s)));
        });
    }
    group.finish();
}

fn bench_backtest(c: &mut Criterion) {
    let sim = Simulator::new(Arc::new(BlockCatalog::with_defaults()));
    let strategy = chain_strategy(3);
    let mut group = c.benchmark_group("backtest");
    for days in [1u32, 30, 365] {
        let config = SimulationConfig::default().with_hours(days * 24).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(days), &config, |b, cfg| {
            b.iter(|| sim.run_backtest(black_box(&strategy), cfg));
        });
    }
    group.finish();
}

fn bench_monte_carlo(c: &mut Criterion) {
    let sim = Simulator::new(Arc::new(BlockCatalog::with_defaults()));
    let strategy = chain_strategy(2);
    let config = SimulationConfig::default().with_hours(7 * 24).unwrap();
    c.bench_function("monte_carlo_50x7d", |b| {
        b.iter(|| sim.run_monte_carlo(black_box(&strategy), &config, 50));
    });
}

criterion_group!(benches, bench_validate, bench_backtest, bench_monte_carlo);
criterion_main!(benches);

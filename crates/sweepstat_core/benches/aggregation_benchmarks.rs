//! Criterion benchmarks for sweepstat_core aggregations
//!
//! Run with: cargo bench -p sweepstat_core

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sweepstat_core::model::{RunConfig, ScoreBreakdown, SimulationResult};
use sweepstat_core::{
    BootstrapConfig, RecordTable, bootstrap_ci, build_faceted_grids, build_grid,
    correlation_matrix, group_summary, pairwise_deltas, pareto_points, seed_stability_curves,
};

const ALTRUISM: [f64; 5] = [0.0, 0.2, 0.4, 0.6, 0.8];
const TAU: [f64; 4] = [0.0, 0.05, 0.1, 0.2];
const EPSILON: [f64; 3] = [0.01, 0.05, 0.1];

/// Full factorial sweep with `seeds` runs per configuration
fn create_sweep(seeds: usize) -> Vec<SimulationResult> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut results = Vec::new();
    for &altruism in &ALTRUISM {
        for &tau in &TAU {
            for &fresh in &EPSILON {
                for &mono in &EPSILON {
                    for seed in 0..seeds {
                        let total = 100.0 + 50.0 * altruism + rng.random_range(-20.0..20.0);
                        results.push(SimulationResult {
                            config: Some(RunConfig {
                                altruism_prob: Some(altruism),
                                tau_margin: Some(tau),
                                epsilon_fresh: Some(fresh),
                                epsilon_mono: Some(mono),
                                seed: Some(seed as f64),
                                conversation_length: Some(50.0),
                                ..Default::default()
                            }),
                            total_score: Some(total),
                            player10_total_mean: Some(total / 10.0),
                            player10_individual_mean: Some(20.0 - 10.0 * altruism + rng.random_range(-3.0..3.0)),
                            conversation_length: Some(rng.random_range(30.0..50.0)),
                            score_breakdown: Some(ScoreBreakdown(
                                [
                                    ("importance".to_string(), total * 0.4),
                                    ("coherence".to_string(), total * 0.3),
                                    ("freshness".to_string(), total * 0.2),
                                ]
                                .into_iter()
                                .collect(),
                            )),
                            ..Default::default()
                        });
                    }
                }
            }
        }
    }
    results
}

fn bench_normalize(c: &mut Criterion) {
    let results = create_sweep(10);
    c.bench_function("normalize_1800_results", |b| {
        b.iter(|| RecordTable::from_results(black_box(&results)))
    });
}

fn bench_group_summary(c: &mut Criterion) {
    let table = RecordTable::from_results(&create_sweep(10));
    let groups = ["altruism_prob", "tau_margin", "epsilon_fresh", "epsilon_mono"];
    let metrics = ["total_score", "player10_score", "player10_individual"];
    c.bench_function("group_summary_4_keys", |b| {
        b.iter(|| group_summary(black_box(&table), &groups, &metrics))
    });
}

fn bench_bootstrap(c: &mut Criterion) {
    let mut group = c.benchmark_group("bootstrap");
    let table = RecordTable::from_results(&create_sweep(10));

    for iterations in [100, 500, 1000].iter() {
        let config = BootstrapConfig {
            iterations: *iterations,
            ..BootstrapConfig::seeded(7)
        };

        group.bench_with_input(
            BenchmarkId::new("iterations", iterations),
            iterations,
            |b, _| {
                b.iter(|| {
                    bootstrap_ci(black_box(&table), &["altruism_prob"], "total_score", black_box(&config))
                })
            },
        );
    }

    group.finish();
}

fn bench_pivots(c: &mut Criterion) {
    let mut group = c.benchmark_group("pivots");
    let table = RecordTable::from_results(&create_sweep(10));

    group.bench_function("build_grid", |b| {
        b.iter(|| build_grid(black_box(&table), "altruism_prob", "tau_margin", "total_score"))
    });
    group.bench_function("build_faceted_grids", |b| {
        b.iter(|| {
            build_faceted_grids(
                black_box(&table),
                "epsilon_fresh",
                "altruism_prob",
                "tau_margin",
                "total_score",
            )
        })
    });

    group.finish();
}

fn bench_other_views(c: &mut Criterion) {
    let mut group = c.benchmark_group("views");
    let table = RecordTable::from_results(&create_sweep(10));

    group.bench_function("pairwise_deltas", |b| {
        b.iter(|| pairwise_deltas(black_box(&table), "altruism_prob", "total_score"))
    });
    group.bench_function("pareto_points", |b| b.iter(|| pareto_points(black_box(&table))));
    group.bench_function("seed_stability_curves", |b| {
        b.iter(|| seed_stability_curves(black_box(&table), "altruism_prob", "total_score", "seed"))
    });
    group.bench_function("correlation_matrix", |b| {
        b.iter(|| correlation_matrix::<&str>(black_box(&table), None))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_normalize,
    bench_group_summary,
    bench_bootstrap,
    bench_pivots,
    bench_other_views,
);
criterion_main!(benches);

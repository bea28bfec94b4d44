//! Performance benchmarks for bracket-engine
//!
//! These benchmarks measure stage construction and the winner/loser propagation
//! cascade at a handful of representative bracket sizes.

use bracket_engine::prelude::*;
use bracket_engine::semantics::{MatchPatch, OpponentPatch};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::runtime::Runtime;

fn seeds_of(count: usize) -> Vec<SeedEntry> {
    (0..count).map(|i| SeedEntry::Name(format!("P{i}"))).collect()
}

fn win_patch() -> MatchPatch {
    MatchPatch {
        opponent1: Some(OpponentPatch { score: Some(1), ..Default::default() }),
        opponent2: Some(OpponentPatch { score: Some(0), ..Default::default() }),
        status: Some(MatchStatus::Completed),
        ..Default::default()
    }
}

/// Stage construction (topology + BYE propagation) at 8/32/128 participants.
fn bench_stage_creation(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("stage_creation");

    for size in [8, 32, 128].iter() {
        group.bench_with_input(BenchmarkId::new("single_elimination", size), size, |b, &size| {
            b.iter(|| {
                rt.block_on(async {
                    let engine = BracketEngine::new(InMemoryStorage::new());
                    let stage = engine
                        .create()
                        .stage(
                            TournamentId::new(),
                            "bench".into(),
                            StageKind::SingleElimination,
                            1,
                            StageSettings::default(),
                            seeds_of(size),
                        )
                        .await
                        .unwrap();
                    black_box(stage);
                })
            })
        });

        group.bench_with_input(BenchmarkId::new("double_elimination", size), size, |b, &size| {
            b.iter(|| {
                rt.block_on(async {
                    let engine = BracketEngine::new(InMemoryStorage::new());
                    let stage = engine
                        .create()
                        .stage(
                            TournamentId::new(),
                            "bench".into(),
                            StageKind::DoubleElimination,
                            1,
                            StageSettings::default(),
                            seeds_of(size),
                        )
                        .await
                        .unwrap();
                    black_box(stage);
                })
            })
        });
    }
    group.finish();
}

/// The full winner-propagation cascade: completing every round-1 match of a freshly
/// created single-elimination bracket and letting it cascade to the final.
fn bench_propagation_cascade(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("propagation_cascade");

    for size in [8, 32, 128].iter() {
        group.bench_with_input(BenchmarkId::new("single_elimination", size), size, |b, &size| {
            b.iter_custom(|iters| {
                rt.block_on(async {
                    let mut total = std::time::Duration::ZERO;
                    for _ in 0..iters {
                        let engine = BracketEngine::new(InMemoryStorage::new());
                        let stage = engine
                            .create()
                            .stage(
                                TournamentId::new(),
                                "bench".into(),
                                StageKind::SingleElimination,
                                1,
                                StageSettings::default(),
                                seeds_of(size),
                            )
                            .await
                            .unwrap();
                        let data = engine.get().stage_data(stage.id).await.unwrap();
                        let round1 = data.rounds.iter().find(|r| r.number == 1).unwrap();
                        let round1_matches: Vec<_> = data.matches.iter().filter(|m| m.round_id == round1.id).cloned().collect();

                        let start = std::time::Instant::now();
                        for m in round1_matches {
                            let _ = engine.update().a_match(m.id, win_patch()).await;
                        }
                        total += start.elapsed();
                    }
                    total
                })
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_stage_creation, bench_propagation_cascade);
criterion_main!(benches);

//! Simulation benchmarks for lanewar_core.
//!
//! Run with: `cargo bench -p lanewar_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use lanewar_core::delegate::NoopDelegate;
use lanewar_core::simulation::Simulation;
use lanewar_test_utils::fixtures::{player_script, step_with_script, wave_battle};

/// A wave battle advanced until both sides have a crowd on the field.
fn crowded_battle() -> Simulation<NoopDelegate> {
    let script = player_script();
    let mut sim = wave_battle(NoopDelegate);
    for _ in 0..150 {
        step_with_script(&mut sim, &script);
    }
    sim
}

/// Runs simulation benchmarks for the lanewar_core crate.
pub fn simulation_benchmark(c: &mut Criterion) {
    c.bench_function("wave_battle_300_frames", |b| {
        let script = player_script();
        b.iter(|| {
            let mut sim = wave_battle(NoopDelegate);
            for _ in 0..300 {
                step_with_script(&mut sim, &script);
            }
            black_box(sim.state_hash())
        });
    });

    c.bench_function("crowded_frame_update", |b| {
        b.iter_batched(
            crowded_battle,
            |mut sim| black_box(sim.update()),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, simulation_benchmark);
criterion_main!(benches);

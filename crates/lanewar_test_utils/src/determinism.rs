//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the battle simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Two engines fed the same setup and the same spawn requests must end
//! every frame in the same state. Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`lanewar_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Entities live in a `Vec` in id order and the catalog is only ever
//!   used for keyed lookups.
//!
//! - **Delegate answers**: A delegate that answers differently for the
//!   same inputs makes the battle diverge. Test delegates must be pure.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual phase determinism (spawns, combat, states)
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full battles are reproducible
//! 4. **Parallel tests**: Running N simulations in parallel all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use lanewar_core::delegate::BattleDelegate;
use lanewar_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of frames simulated.
    pub frames: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Frames: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.frames,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each simulation.
    pub hashes: Vec<u64>,
    /// Number of frames each simulation ran.
    pub frames: u64,
    /// Number of simulations run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all simulations produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all simulations matched.
    ///
    /// # Panics
    ///
    /// Panics if simulations produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel simulations diverged!\n\
                 Simulations: {}\n\
                 Frames: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.frames,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `frames` - Number of frames to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one frame
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```
/// use lanewar_core::delegate::NoopDelegate;
/// use lanewar_test_utils::determinism::verify_determinism;
/// use lanewar_test_utils::fixtures::{player_script, step_with_script, wave_battle};
///
/// let script = player_script();
/// let result = verify_determinism(
///     3,
///     100,
///     || wave_battle(NoopDelegate),
///     |sim| step_with_script(sim, &script),
///     |sim| sim.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    frames: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..frames {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        frames,
    }
}

/// Simplified determinism verification for the [`Simulation`] type.
///
/// Runs the simulation twice with identical setup and verifies the final
/// state hashes match exactly.
///
/// # Returns
///
/// `true` if both runs produced identical state hashes.
pub fn verify_simulation_determinism<D, F>(setup_fn: F, num_frames: u64) -> bool
where
    D: BattleDelegate,
    F: Fn() -> Simulation<D>,
{
    let result = verify_determinism(
        2,
        num_frames,
        &setup_fn,
        |sim| {
            sim.update();
        },
        |sim| sim.state_hash(),
    );
    result.is_deterministic
}

/// Run N simulations on scoped threads and collect the final hashes.
///
/// This is useful for catching non-determinism that only manifests
/// under thread scheduling variations, memory layout differences, etc.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations_scoped<D, F>(
    setup_fn: F,
    num_sims: usize,
    num_frames: u64,
) -> ParallelSimResult
where
    D: BattleDelegate,
    F: Fn() -> Simulation<D> + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_frames {
                        sim.update();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    ParallelSimResult {
        hashes,
        frames: num_frames,
        num_sims,
    }
}

/// Compare two simulation runs frame-by-frame, finding first divergence.
///
/// Useful for debugging non-determinism by finding exactly when
/// simulations start to differ.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(frame)` if they diverge
/// after that frame was simulated.
pub fn find_first_divergence<D, F>(setup_fn: F, num_frames: u64) -> Option<u64>
where
    D: BattleDelegate,
    F: Fn() -> Simulation<D>,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        tracing::warn!("Simulations differ before the first frame");
        return Some(0);
    }

    for _ in 0..num_frames {
        let frame = sim1.frame();
        sim1.update();
        sim2.update();

        if sim1.state_hash() != sim2.state_hash() {
            tracing::warn!(frame, "Simulations diverged");
            return Some(frame);
        }
    }

    None
}

/// Compute a hash of any hashable value.
#[must_use]
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for generating battle inputs.
pub mod strategies {
    use proptest::prelude::*;

    use lanewar_core::components::Side;
    use lanewar_core::config::BattleConfig;
    use lanewar_core::data::{UnitMaster, UnitTypeId};
    use lanewar_core::math::Fixed;

    /// Quarter-step fixed-point value in `0..=max_quarters / 4`.
    pub fn arb_quarter_fixed(max_quarters: i32) -> impl Strategy<Value = Fixed> {
        (0..=max_quarters).prop_map(|q| Fixed::from_num(q) / Fixed::from_num(4))
    }

    /// A valid unit master record with the given id.
    pub fn arb_unit_master(id: u32) -> impl Strategy<Value = UnitMaster> {
        (
            0..120i32,
            1..400i32,
            0..50i32,
            arb_quarter_fixed(16),
            arb_quarter_fixed(24),
            0..12u32,
        )
            .prop_map(
                move |(cost, max_health, power, speed, knock_back_speed, knock_back_frames)| {
                    UnitMaster {
                        id: UnitTypeId(id),
                        name: format!("generated_{id}"),
                        cost,
                        max_health,
                        power,
                        speed,
                        knock_back_speed,
                        knock_back_frames,
                    }
                },
            )
    }

    /// Between 1 and `max_units` unit records with ids `1..=n`.
    pub fn arb_unit_list(max_units: u32) -> impl Strategy<Value = Vec<UnitMaster>> {
        (1..=max_units).prop_flat_map(|n| (1..=n).map(arb_unit_master).collect::<Vec<_>>())
    }

    /// Health fractions in `(0, 1]`, in hundredths.
    pub fn arb_thresholds() -> impl Strategy<Value = Vec<Fixed>> {
        proptest::collection::vec(
            (1..=100i32).prop_map(|p| Fixed::from_num(p) / Fixed::from_num(100)),
            0..4,
        )
    }

    /// A configuration that passes validation.
    pub fn arb_config() -> impl Strategy<Value = BattleConfig> {
        (0..25i32, 0..500i32, arb_thresholds(), any::<bool>()).prop_flat_map(
            |(recovery, max, thresholds, lethal)| {
                (0..=max).prop_map(move |initial| BattleConfig {
                    cost_recovery_per_frame: recovery,
                    max_available_cost: max,
                    initial_available_cost: initial,
                    knock_back_health_thresholds: thresholds.clone(),
                    lethal_damage_knocks_back: lethal,
                })
            },
        )
    }

    /// Either side.
    pub fn arb_side() -> impl Strategy<Value = Side> {
        prop_oneof![Just(Side::Player), Just(Side::Ai)]
    }

    /// Spawn requests by frame. Unit type ids go one past `unit_types` so
    /// some requests name an unknown type.
    pub fn arb_spawn_script(
        frames: u64,
        unit_types: u32,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<(u64, UnitTypeId, Side)>> {
        proptest::collection::vec(
            (0..frames.max(1), (1..=unit_types + 1).prop_map(UnitTypeId), arb_side()),
            0..max_len,
        )
    }
}

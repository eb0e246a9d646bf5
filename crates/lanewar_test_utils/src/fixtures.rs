//! Test fixtures and helpers.
//!
//! Pre-built unit catalogs, battle setups and spawn scripts
//! for consistent testing.

use fixed::types::I32F32;
use lanewar_core::config::BattleConfig;
use lanewar_core::data::{UnitCatalog, UnitMaster, UnitTypeId, WaveSchedule};
use lanewar_core::delegate::BattleDelegate;
use lanewar_core::simulation::{BattleSetup, Simulation};

/// Balanced melee unit.
pub const GRUNT: UnitTypeId = UnitTypeId(1);
/// Slow, heavy unit with a long knockback.
pub const BRUTE: UnitTypeId = UnitTypeId(2);
/// Fast, fragile unit.
pub const SCOUT: UnitTypeId = UnitTypeId(7);

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// A unit with speed 1, knockback speed 2 and a 3-frame knockback.
#[must_use]
pub fn unit_master(id: UnitTypeId, cost: i32, max_health: i32, power: i32) -> UnitMaster {
    UnitMaster {
        id,
        name: format!("unit_{}", id.0),
        cost,
        max_health,
        power,
        speed: fixed(1),
        knock_back_speed: fixed(2),
        knock_back_frames: 3,
    }
}

/// The three stock units: [`GRUNT`], [`BRUTE`] and [`SCOUT`].
#[must_use]
pub fn stock_units() -> Vec<UnitMaster> {
    vec![
        UnitMaster {
            name: "grunt".to_string(),
            ..unit_master(GRUNT, 30, 100, 10)
        },
        UnitMaster {
            name: "brute".to_string(),
            speed: fixed_f(0.5),
            knock_back_speed: fixed(1),
            knock_back_frames: 6,
            ..unit_master(BRUTE, 80, 240, 18)
        },
        UnitMaster {
            name: "scout".to_string(),
            speed: fixed(2),
            knock_back_speed: fixed(4),
            knock_back_frames: 2,
            ..unit_master(SCOUT, 20, 60, 6)
        },
    ]
}

/// Catalog of the stock units.
///
/// # Panics
///
/// Never in practice; the stock units are valid.
#[must_use]
pub fn stock_catalog() -> UnitCatalog {
    UnitCatalog::from_units(stock_units()).expect("stock units are valid")
}

/// Setup with the stock catalog, every stock unit on the roster and no waves.
#[must_use]
pub fn stock_setup(config: BattleConfig) -> BattleSetup {
    BattleSetup::new(stock_catalog())
        .with_roster([GRUNT, BRUTE, SCOUT])
        .with_config(config)
}

/// Config used by the recorded battles: quick recovery, a modest cap and
/// a small head start.
#[must_use]
pub fn battle_config() -> BattleConfig {
    BattleConfig {
        cost_recovery_per_frame: 3,
        max_available_cost: 300,
        initial_available_cost: 60,
        lethal_damage_knocks_back: true,
        ..Default::default()
    }
}

/// AI waves every 15 frames up to frame 150, alternating compositions.
#[must_use]
pub fn wave_schedule() -> WaveSchedule {
    (0..=10u64).fold(WaveSchedule::new(), |waves, wave| {
        let units = match wave % 3 {
            0 => vec![GRUNT, GRUNT],
            1 => vec![SCOUT, GRUNT],
            _ => vec![BRUTE],
        };
        waves.with_wave(wave * 15, units)
    })
}

/// Player spawn requests by frame, used to drive the recorded battles.
#[must_use]
pub fn player_script() -> Vec<(u64, UnitTypeId)> {
    vec![
        (0, GRUNT),
        (0, SCOUT),
        (12, GRUNT),
        (30, BRUTE),
        (45, GRUNT),
        (45, GRUNT),
        (70, SCOUT),
        (90, BRUTE),
        (120, GRUNT),
        (140, SCOUT),
    ]
}

/// Full wave battle setup: stock units, [`wave_schedule`] and [`battle_config`].
#[must_use]
pub fn wave_battle_setup() -> BattleSetup {
    stock_setup(battle_config()).with_waves(wave_schedule())
}

/// Create a wave battle with the given delegate.
///
/// # Panics
///
/// Never in practice; the fixture setup is valid.
#[must_use]
pub fn wave_battle<D: BattleDelegate>(delegate: D) -> Simulation<D> {
    Simulation::new(wave_battle_setup(), delegate).expect("fixture setup is valid")
}

/// Queue this frame's scripted player spawns, then advance one frame.
pub fn step_with_script<D: BattleDelegate>(sim: &mut Simulation<D>, script: &[(u64, UnitTypeId)]) {
    let frame = sim.frame();
    for (_, unit_type) in script.iter().filter(|(at, _)| *at == frame) {
        sim.request_player_spawn(*unit_type);
    }
    sim.update();
}

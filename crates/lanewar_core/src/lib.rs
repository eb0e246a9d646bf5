//! # Lanewar Core
//!
//! Deterministic, frame-stepped battle simulation for a two-sided lane game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No randomness
//! - No floating-point math (uses fixed-point)
//!
//! Everything a presentation layer needs to know is pushed through the
//! [`delegate::BattleDelegate`] contract, which also answers the policy
//! questions (may this unit walk, engage, deal damage) the engine cannot
//! decide on its own.
//!
//! ## Crate Structure
//!
//! - [`simulation`] - Entity store and the frame loop
//! - [`spawn`] - Spawn requests and their resolution
//! - [`economy`] - Player's available-cost budget
//! - [`combat`] - Damage, movement and knockback
//! - [`state_machine`] - Grouped state transitions
//! - [`delegate`] - Decision and notification contract
//! - [`data`] - Unit master records and wave schedules
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combat;
pub mod components;
pub mod config;
pub mod data;
pub mod delegate;
pub mod economy;
pub mod error;
pub mod math;
pub mod simulation;
pub mod spawn;
pub mod state_machine;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::combat::DamageEvent;
    pub use crate::components::*;
    pub use crate::config::BattleConfig;
    pub use crate::data::{UnitCatalog, UnitMaster, UnitTypeId, WaveSchedule};
    pub use crate::delegate::{BattleDelegate, NoopDelegate, SpawnPlacement};
    pub use crate::economy::CostEconomy;
    pub use crate::error::{BattleError, Result};
    pub use crate::math::Fixed;
    pub use crate::simulation::{BattleSetup, EntityStorage, FrameEvents, Simulation};
    pub use crate::spawn::{RejectedSpawn, SpawnQueue, SpawnRejection, SpawnRequest};
    pub use crate::state_machine::StateChange;
}

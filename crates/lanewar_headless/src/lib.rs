//! Headless battle runner for scripted lane battles.
//!
//! This crate loads battle scenarios from RON, drives the
//! [`lanewar_core`] engine frame by frame with a one-dimensional lane
//! delegate, and reports the result. It is used for:
//!
//! - **Balance checks**: run a scripted opening against a wave schedule
//! - **CI verification**: validate scenario files and check determinism
//!
//! # Example
//!
//! ```bash
//! # Run the built-in skirmish
//! cargo run -p lanewar_headless -- run
//!
//! # Run a scenario file and print the report as JSON
//! cargo run -p lanewar_headless -- run --scenario scenarios/skirmish.ron --json
//!
//! # Check that repeated runs end in the same state
//! cargo run -p lanewar_headless -- verify --runs 5
//! ```

pub mod delegate;
pub mod runner;
pub mod scenario;

pub use delegate::{BattleMetrics, LaneDelegate, SideMetrics};
pub use runner::{BattleReport, HeadlessRunner, Outcome, VerifyReport};
pub use scenario::{LaneSettings, Scenario, ScenarioError, ScriptedSpawn};

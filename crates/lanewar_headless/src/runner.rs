//! Headless battle runner.
//!
//! Drives a [`Simulation`] with a [`LaneDelegate`], feeding the scenario's
//! scripted player spawns before each frame, until a unit reaches the enemy
//! base or the frame limit runs out.

use std::fmt;

use lanewar_core::components::Side;
use lanewar_core::simulation::Simulation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::delegate::{BattleMetrics, LaneDelegate};
use crate::scenario::{Scenario, ScenarioError};

/// How a battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// A unit of this side walked the whole lane.
    BaseReached(Side),
    /// The frame limit was hit first.
    Timeout,
}

impl Outcome {
    /// Winning side, if any.
    #[must_use]
    pub const fn winner(self) -> Option<Side> {
        match self {
            Self::BaseReached(side) => Some(side),
            Self::Timeout => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BaseReached(side) => write!(f, "{side} reached the enemy base"),
            Self::Timeout => f.write_str("timeout"),
        }
    }
}

/// Result of one headless battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleReport {
    /// Scenario name.
    pub scenario: String,
    /// How the battle ended.
    pub outcome: Outcome,
    /// Frames simulated.
    pub frames: u64,
    /// State hash after the last frame.
    pub final_state_hash: u64,
    /// Player's available cost after the last frame.
    pub final_available_cost: i32,
    /// Live player units at the end.
    pub player_survivors: usize,
    /// Live AI units at the end.
    pub ai_survivors: usize,
    /// Spawn requests the engine dropped.
    pub rejected_spawns: usize,
    /// Statistics collected by the lane delegate.
    pub metrics: BattleMetrics,
}

impl BattleReport {
    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Short human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let m = &self.metrics;
        format!(
            "{name}: {outcome} after {frames} frames\n\
             player: {ps} spawned, {pd} lost, {pdmg} damage, {pk} knockbacks, {pl} alive\n\
             ai:     {as_} spawned, {ad} lost, {admg} damage, {ak} knockbacks, {al} alive\n\
             state hash: {hash:#018x}",
            name = self.scenario,
            outcome = self.outcome,
            frames = self.frames,
            ps = m.player.spawned,
            pd = m.player.deaths,
            pdmg = m.player.damage_dealt,
            pk = m.player.knock_backs,
            pl = self.player_survivors,
            as_ = m.ai.spawned,
            ad = m.ai.deaths,
            admg = m.ai.damage_dealt,
            ak = m.ai.knock_backs,
            al = self.ai_survivors,
            hash = self.final_state_hash,
        )
    }
}

/// Outcome of repeated runs of the same scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Final state hash of each run.
    pub hashes: Vec<u64>,
    /// Whether every run ended in the same state.
    pub deterministic: bool,
}

/// Headless runner for one scenario.
#[derive(Debug, Clone)]
pub struct HeadlessRunner {
    scenario: Scenario,
    max_frames: u64,
}

impl HeadlessRunner {
    /// Create a runner using the scenario's own frame limit.
    #[must_use]
    pub fn new(scenario: Scenario) -> Self {
        let max_frames = scenario.max_frames;
        Self {
            scenario,
            max_frames,
        }
    }

    /// Override the frame limit.
    #[must_use]
    pub const fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Scenario being run.
    #[must_use]
    pub const fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Build an engine for the scenario without stepping it.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit data or configuration is invalid.
    pub fn build(&self) -> Result<Simulation<LaneDelegate>, ScenarioError> {
        let setup = self.scenario.battle_setup()?;
        Ok(Simulation::new(setup, LaneDelegate::new(self.scenario.lane))?)
    }

    /// Run the battle to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit data or configuration is invalid.
    pub fn run(&self) -> Result<BattleReport, ScenarioError> {
        let mut sim = self.build()?;
        info!(
            scenario = %self.scenario.name,
            max_frames = self.max_frames,
            "Starting battle"
        );

        let mut rejected_spawns = 0;
        let mut outcome = Outcome::Timeout;
        while sim.frame() < self.max_frames {
            for unit_type in self.scenario.script_at(sim.frame()) {
                sim.request_player_spawn(unit_type);
            }

            let events = sim.update();
            for rejected in &events.rejected_spawns {
                debug!(
                    frame = events.frame,
                    unit_type = %rejected.request.unit_type,
                    side = %rejected.request.side,
                    reason = ?rejected.reason,
                    "Spawn dropped"
                );
            }
            rejected_spawns += events.rejected_spawns.len();

            if let Some((side, _)) = sim.delegate().metrics().base_reached_by {
                outcome = Outcome::BaseReached(side);
                break;
            }
        }

        if outcome == Outcome::Timeout {
            warn!(frames = sim.frame(), "Frame limit reached without a winner");
        }

        let report = BattleReport {
            scenario: self.scenario.name.clone(),
            outcome,
            frames: sim.frame(),
            final_state_hash: sim.state_hash(),
            final_available_cost: sim.available_cost(),
            player_survivors: sim.side_count(Side::Player),
            ai_survivors: sim.side_count(Side::Ai),
            rejected_spawns,
            metrics: sim.into_delegate().into_metrics(),
        };
        info!(
            outcome = %report.outcome,
            frames = report.frames,
            hash = report.final_state_hash,
            "Battle finished"
        );
        Ok(report)
    }

    /// Run the battle several times and compare the final states.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit data or configuration is invalid.
    pub fn verify(&self, runs: u32) -> Result<VerifyReport, ScenarioError> {
        let hashes = (0..runs.max(1))
            .map(|_| self.run().map(|report| report.final_state_hash))
            .collect::<Result<Vec<_>, _>>()?;
        let deterministic = hashes.windows(2).all(|pair| pair[0] == pair[1]);
        if !deterministic {
            warn!(?hashes, "Runs diverged");
        }
        Ok(VerifyReport {
            hashes,
            deterministic,
        })
    }
}

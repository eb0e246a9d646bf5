//! Scenario loading and configuration.
//!
//! Scenarios bundle everything a headless battle needs: unit master data,
//! the AI wave schedule, the player's roster and scripted spawn inputs,
//! the lane geometry and a frame limit.

use std::path::Path;

use lanewar_core::config::BattleConfig;
use lanewar_core::data::{UnitCatalog, UnitMaster, UnitTypeId, WaveSchedule};
use lanewar_core::error::BattleError;
use lanewar_core::math::{fixed_serde, Fixed};
use lanewar_core::simulation::BattleSetup;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Frame limit used when a scenario does not set one.
pub const DEFAULT_MAX_FRAMES: u64 = 3600;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The scenario's battle data was rejected.
    #[error("Invalid scenario: {0}")]
    Battle(#[from] BattleError),
}

/// One scripted player spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedSpawn {
    /// Frame on which the request is queued.
    pub frame: u64,
    /// Unit type to request.
    pub unit_type: UnitTypeId,
}

impl ScriptedSpawn {
    /// Create a scripted spawn.
    #[must_use]
    pub const fn new(frame: u64, unit_type: UnitTypeId) -> Self {
        Self { frame, unit_type }
    }
}

/// One-dimensional lane geometry.
///
/// Each side measures distance from its own base, so two units meet when
/// their distances add up to the lane length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneSettings {
    /// Distance between the two bases.
    #[serde(with = "fixed_serde")]
    pub length: Fixed,
    /// Largest gap across which two units can engage.
    #[serde(with = "fixed_serde")]
    pub engage_range: Fixed,
}

impl Default for LaneSettings {
    fn default() -> Self {
        Self {
            length: Fixed::from_num(100),
            engage_range: Fixed::from_num(2),
        }
    }
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Unit master records.
    pub units: Vec<UnitMaster>,
    /// AI spawn schedule.
    #[serde(default)]
    pub waves: WaveSchedule,
    /// Unit types the player may spawn.
    #[serde(default)]
    pub player_roster: Vec<UnitTypeId>,
    /// Battle configuration override.
    #[serde(default)]
    pub config: Option<BattleConfig>,
    /// Scripted player spawn requests.
    #[serde(default)]
    pub player_script: Vec<ScriptedSpawn>,
    /// Lane geometry.
    #[serde(default)]
    pub lane: LaneSettings,
    /// Frame limit.
    #[serde(default = "default_max_frames")]
    pub max_frames: u64,
}

fn default_max_frames() -> u64 {
    DEFAULT_MAX_FRAMES
}

impl Default for Scenario {
    fn default() -> Self {
        Self::skirmish()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario: Scenario = ron::from_str(&contents)?;
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Create the standard skirmish: three unit types, a wave every
    /// 40 frames and a scripted player opening.
    #[must_use]
    pub fn skirmish() -> Self {
        let grunt = UnitTypeId(1);
        let brute = UnitTypeId(2);
        let scout = UnitTypeId(3);

        let waves = (0..12u64).fold(WaveSchedule::new(), |waves, wave| {
            let units = match wave % 4 {
                0 => vec![grunt, grunt],
                1 => vec![scout, scout, grunt],
                2 => vec![brute],
                _ => vec![grunt, scout, brute],
            };
            waves.with_wave(20 + wave * 40, units)
        });

        let player_script = [
            (0, grunt),
            (0, scout),
            (30, grunt),
            (60, brute),
            (100, grunt),
            (100, scout),
            (160, brute),
            (220, grunt),
            (260, grunt),
            (300, brute),
            (380, scout),
            (420, grunt),
        ]
        .into_iter()
        .map(|(frame, unit_type)| ScriptedSpawn::new(frame, unit_type))
        .collect();

        Self {
            name: "Skirmish".to_string(),
            description: "Scripted player opening against escalating AI waves".to_string(),
            units: vec![
                UnitMaster {
                    id: grunt,
                    name: "grunt".to_string(),
                    cost: 30,
                    max_health: 100,
                    power: 6,
                    speed: Fixed::ONE,
                    knock_back_speed: Fixed::from_num(2),
                    knock_back_frames: 6,
                },
                UnitMaster {
                    id: brute,
                    name: "brute".to_string(),
                    cost: 80,
                    max_health: 260,
                    power: 11,
                    speed: Fixed::from_num(0.5),
                    knock_back_speed: Fixed::ONE,
                    knock_back_frames: 10,
                },
                UnitMaster {
                    id: scout,
                    name: "scout".to_string(),
                    cost: 20,
                    max_health: 60,
                    power: 4,
                    speed: Fixed::from_num(2),
                    knock_back_speed: Fixed::from_num(3),
                    knock_back_frames: 4,
                },
            ],
            waves,
            player_roster: vec![grunt, brute, scout],
            config: Some(BattleConfig {
                cost_recovery_per_frame: 2,
                max_available_cost: 400,
                initial_available_cost: 60,
                lethal_damage_knocks_back: true,
                ..Default::default()
            }),
            player_script,
            lane: LaneSettings {
                length: Fixed::from_num(120),
                engage_range: Fixed::from_num(3),
            },
            max_frames: 2400,
        }
    }

    /// Validate the unit data and build an engine setup.
    pub fn battle_setup(&self) -> Result<BattleSetup, ScenarioError> {
        let catalog = UnitCatalog::from_units(self.units.iter().cloned())?;
        let mut setup = BattleSetup::new(catalog)
            .with_waves(self.waves.clone())
            .with_roster(self.player_roster.iter().copied());
        setup.config = self.config.clone();
        Ok(setup)
    }

    /// Scripted spawns for one frame, in script order.
    pub fn script_at(&self, frame: u64) -> impl Iterator<Item = UnitTypeId> + '_ {
        self.player_script
            .iter()
            .filter(move |spawn| spawn.frame == frame)
            .map(|spawn| spawn.unit_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skirmish_scenario() {
        let scenario = Scenario::skirmish();
        assert_eq!(scenario.units.len(), 3);
        assert_eq!(scenario.waves.at(20).len(), 2);
        assert!(scenario.battle_setup().is_ok());
    }

    #[test]
    fn test_parse_from_ron() {
        let ron = r#"
            Scenario(
                name: "Duel",
                units: [
                    (id: 1, cost: 10, max_health: 50, power: 5,
                     speed: "1", knock_back_speed: "2", knock_back_frames: 3),
                ],
                waves: { 3: [1] },
                player_roster: [1],
                config: Some((cost_recovery_per_frame: 10, max_available_cost: 100)),
                player_script: [(frame: 0, unit_type: 1)],
                lane: (length: "40", engage_range: "1.5"),
            )
        "#;

        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.name, "Duel");
        assert_eq!(scenario.max_frames, DEFAULT_MAX_FRAMES);
        assert_eq!(scenario.lane.engage_range, Fixed::from_num(1.5));
        assert_eq!(scenario.waves.at(3), &[UnitTypeId(1)]);
        assert_eq!(scenario.script_at(0).collect::<Vec<_>>(), vec![UnitTypeId(1)]);

        let config = scenario.config.unwrap();
        assert_eq!(config.cost_recovery_per_frame, 10);
        assert_eq!(config.initial_available_cost, 0);
    }

    #[test]
    fn test_bundled_skirmish_file_parses() {
        let scenario = Scenario::from_ron_str(include_str!("../scenarios/skirmish.ron")).unwrap();
        assert_eq!(scenario, Scenario::skirmish());
    }

    #[test]
    fn test_duplicate_units_rejected() {
        let mut scenario = Scenario::skirmish();
        let copy = scenario.units[0].clone();
        scenario.units.push(copy);

        assert!(matches!(
            scenario.battle_setup(),
            Err(ScenarioError::Battle(BattleError::DuplicateUnitType(_)))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Scenario::load("does/not/exist.ron"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }
}

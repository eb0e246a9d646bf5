//! Tunable battle constants.

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};
use crate::math::{fixed_vec_serde, Fixed};

/// Default cost recovered per frame.
pub const DEFAULT_COST_RECOVERY_PER_FRAME: i32 = 1;

/// Default available cost cap.
pub const DEFAULT_MAX_AVAILABLE_COST: i32 = 1000;

/// Battle configuration.
///
/// Frozen once handed to [`Simulation::new`](crate::simulation::Simulation::new).
///
/// # Example RON
///
/// ```ron
/// BattleConfig(
///     cost_recovery_per_frame: 10,
///     max_available_cost: 100,
///     knock_back_health_thresholds: ["0.5"],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Cost added at the top of every frame.
    pub cost_recovery_per_frame: i32,

    /// Upper clamp for the available cost.
    pub max_available_cost: i32,

    /// Available cost before the first frame.
    pub initial_available_cost: i32,

    /// Health fractions whose downward crossing knocks an engaged unit back,
    /// checked in this order.
    #[serde(with = "fixed_vec_serde")]
    pub knock_back_health_thresholds: Vec<Fixed>,

    /// Treat a drop from at least 1 health to below 1 within a frame as one
    /// more crossing, so units already under every threshold still die.
    /// Off unless set; only the threshold ladder knocks back by default.
    pub lethal_damage_knocks_back: bool,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            cost_recovery_per_frame: DEFAULT_COST_RECOVERY_PER_FRAME,
            max_available_cost: DEFAULT_MAX_AVAILABLE_COST,
            initial_available_cost: 0,
            knock_back_health_thresholds: vec![
                Fixed::from_num(0.75),
                Fixed::from_num(0.5),
                Fixed::from_num(0.25),
            ],
            lethal_damage_knocks_back: false,
        }
    }
}

impl BattleConfig {
    /// Parse a configuration from RON text. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not parse or fails validation.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: Self =
            ron::from_str(text).map_err(|e| BattleError::parse("battle config", &e))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break the cost or knockback rules.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidConfig`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.cost_recovery_per_frame < 0 {
            return Err(BattleError::InvalidConfig(format!(
                "cost_recovery_per_frame must not be negative, got {}",
                self.cost_recovery_per_frame
            )));
        }
        if self.max_available_cost < 0 {
            return Err(BattleError::InvalidConfig(format!(
                "max_available_cost must not be negative, got {}",
                self.max_available_cost
            )));
        }
        if !(0..=self.max_available_cost).contains(&self.initial_available_cost) {
            return Err(BattleError::InvalidConfig(format!(
                "initial_available_cost {} outside 0..={}",
                self.initial_available_cost, self.max_available_cost
            )));
        }
        if let Some(bad) = self
            .knock_back_health_thresholds
            .iter()
            .find(|t| **t <= Fixed::ZERO || **t > Fixed::ONE)
        {
            return Err(BattleError::InvalidConfig(format!(
                "knock back threshold {bad} outside (0, 1]"
            )));
        }
        Ok(())
    }
}

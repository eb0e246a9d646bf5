//! Available-cost economy.
//!
//! The player spends available cost to spawn units. It regenerates by a
//! fixed amount each frame up to a cap. AI spawns bypass it entirely.
//!
//! All calculations use integer math for deterministic simulation.

use serde::{Deserialize, Serialize};

use crate::data::{UnitCatalog, UnitTypeId};

/// Regenerating spawn budget for the player side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CostEconomy {
    /// Cost currently available.
    pub available: i32,
    /// Upper clamp.
    pub max: i32,
    /// Cost added per frame.
    pub recovery_per_frame: i32,
}

impl CostEconomy {
    /// Create an economy with the given starting cost.
    #[must_use]
    pub const fn new(available: i32, max: i32, recovery_per_frame: i32) -> Self {
        Self {
            available,
            max,
            recovery_per_frame,
        }
    }

    /// Apply one frame of recovery, clamped to the cap.
    ///
    /// Returns the new available cost.
    pub fn recover(&mut self) -> i32 {
        self.available = self
            .available
            .saturating_add(self.recovery_per_frame)
            .min(self.max);
        self.available
    }

    /// Check if the player can afford a cost.
    #[must_use]
    pub const fn can_afford(&self, cost: i32) -> bool {
        self.available >= cost
    }

    /// Spend cost if available.
    ///
    /// Returns true if the transaction succeeded. Nothing is deducted on
    /// failure.
    pub fn spend(&mut self, cost: i32) -> bool {
        if self.can_afford(cost) {
            self.available -= cost;
            true
        } else {
            false
        }
    }

    /// Roster entries the player can currently afford, in roster order.
    ///
    /// Roster entries with no master record are skipped.
    #[must_use]
    pub fn affordable(&self, roster: &[UnitTypeId], catalog: &UnitCatalog) -> Vec<UnitTypeId> {
        roster
            .iter()
            .copied()
            .filter(|id| catalog.get(*id).is_some_and(|unit| self.can_afford(unit.cost)))
            .collect()
    }
}

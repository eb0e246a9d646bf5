//! Unit master records and the catalog that owns them.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};
use crate::math::{fixed_serde, Fixed};

/// Unique identifier for unit types.
///
/// Serialized as the bare integer so data files can write `id: 7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitTypeId(pub u32);

impl UnitTypeId {
    /// Create a new unit type ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for UnitTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Immutable per-unit-type stats.
///
/// # Example RON
///
/// ```ron
/// UnitMaster(
///     id: 7,
///     name: "spearman",
///     cost: 30,
///     max_health: 100,
///     power: 10,
///     speed: "1.5",
///     knock_back_speed: "4",
///     knock_back_frames: 12,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMaster {
    /// Unit type this record describes.
    pub id: UnitTypeId,

    /// Display label, used only for logs and tooling.
    #[serde(default)]
    pub name: String,

    /// Available cost spent when the player spawns this unit.
    pub cost: i32,

    /// Health on spawn.
    pub max_health: i32,

    /// Damage dealt to the engaged target each frame.
    pub power: i32,

    /// Forward distance per frame while walking.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,

    /// Backward distance per frame while knocked back.
    #[serde(with = "fixed_serde")]
    pub knock_back_speed: Fixed,

    /// Number of frames a knockback lasts.
    pub knock_back_frames: u32,
}

impl UnitMaster {
    /// Check the record for values the simulation cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidUnitMaster`] describing the first
    /// offending field.
    pub fn validate(&self) -> Result<()> {
        let reason = if self.cost < 0 {
            Some(format!("cost must not be negative, got {}", self.cost))
        } else if self.max_health <= 0 {
            Some(format!("max_health must be positive, got {}", self.max_health))
        } else if self.power < 0 {
            Some(format!("power must not be negative, got {}", self.power))
        } else if self.speed < Fixed::ZERO {
            Some(format!("speed must not be negative, got {}", self.speed))
        } else if self.knock_back_speed < Fixed::ZERO {
            Some(format!(
                "knock_back_speed must not be negative, got {}",
                self.knock_back_speed
            ))
        } else {
            None
        };

        match reason {
            Some(reason) => Err(BattleError::InvalidUnitMaster {
                unit_type: self.id,
                reason,
            }),
            None => Ok(()),
        }
    }
}

/// Read-only lookup of [`UnitMaster`] records by unit type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitCatalog {
    units: HashMap<UnitTypeId, UnitMaster>,
}

impl UnitCatalog {
    /// Build a catalog, validating every record.
    ///
    /// # Errors
    ///
    /// Returns an error if a record is invalid or a unit type appears twice.
    pub fn from_units(units: impl IntoIterator<Item = UnitMaster>) -> Result<Self> {
        let mut map = HashMap::new();
        for unit in units {
            unit.validate()?;
            let id = unit.id;
            if map.insert(id, unit).is_some() {
                return Err(BattleError::DuplicateUnitType(id));
            }
        }
        Ok(Self { units: map })
    }

    /// Parse a RON list of unit records.
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not parse or a record is invalid.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let units: Vec<UnitMaster> =
            ron::from_str(text).map_err(|e| BattleError::parse("unit catalog", &e))?;
        Self::from_units(units)
    }

    /// Look up a unit type.
    #[must_use]
    pub fn get(&self, id: UnitTypeId) -> Option<&UnitMaster> {
        self.units.get(&id)
    }

    /// Check whether a unit type is known.
    #[must_use]
    pub fn contains(&self, id: UnitTypeId) -> bool {
        self.units.contains_key(&id)
    }

    /// Number of unit types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// All records, sorted by unit type for deterministic iteration.
    #[must_use]
    pub fn sorted(&self) -> Vec<&UnitMaster> {
        let mut units: Vec<_> = self.units.values().collect();
        units.sort_unstable_by_key(|u| u.id);
        units
    }
}

//! AI wave schedule.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::unit_data::UnitTypeId;
use crate::error::{BattleError, Result};

/// Frame-keyed AI spawn schedule.
///
/// Each entry lists the unit types the AI side spawns at exactly that
/// frame, in spawn order. Frames with no entry spawn nothing.
///
/// # Example RON
///
/// ```ron
/// {
///     3: [7],
///     120: [1, 1, 2],
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaveSchedule {
    waves: BTreeMap<u64, Vec<UnitTypeId>>,
}

impl WaveSchedule {
    /// Create an empty schedule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a schedule from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DataParseError`] if the text does not parse.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| BattleError::parse("wave schedule", &e))
    }

    /// Builder-style helper appending units to a frame's wave.
    #[must_use]
    pub fn with_wave(mut self, frame: u64, units: impl IntoIterator<Item = UnitTypeId>) -> Self {
        self.waves.entry(frame).or_default().extend(units);
        self
    }

    /// Unit types scheduled for exactly `frame`.
    #[must_use]
    pub fn at(&self, frame: u64) -> &[UnitTypeId] {
        self.waves.get(&frame).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Last frame with a scheduled spawn.
    #[must_use]
    pub fn last_frame(&self) -> Option<u64> {
        self.waves.keys().next_back().copied()
    }

    /// Total number of scheduled AI spawns.
    #[must_use]
    pub fn total_spawns(&self) -> usize {
        self.waves.values().map(Vec::len).sum()
    }

    /// Check if nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_spawns() == 0
    }

    /// Iterate over `(frame, units)` in frame order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &[UnitTypeId])> {
        self.waves.iter().map(|(frame, units)| (*frame, units.as_slice()))
    }
}

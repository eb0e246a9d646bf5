//! Error types for the battle simulation.
//!
//! Only configuration problems are errors. Expected runtime conditions
//! (unknown unit types in a spawn request, unaffordable player spawns)
//! are dropped silently by the engine and surfaced through
//! [`FrameEvents`](crate::simulation::FrameEvents) instead.

use thiserror::Error;

use crate::data::UnitTypeId;

/// Result type alias using [`BattleError`].
pub type Result<T> = std::result::Result<T, BattleError>;

/// Top-level error type for all battle simulation errors.
#[derive(Debug, Error)]
pub enum BattleError {
    /// Battle configuration failed validation.
    #[error("Invalid battle configuration: {0}")]
    InvalidConfig(String),

    /// A unit master record failed validation.
    #[error("Invalid unit master {unit_type}: {reason}")]
    InvalidUnitMaster {
        /// Unit type whose record is invalid.
        unit_type: UnitTypeId,
        /// Why the record was rejected.
        reason: String,
    },

    /// The same unit type id appeared twice in the master data.
    #[error("Duplicate unit type: {0}")]
    DuplicateUnitType(UnitTypeId),

    /// Data text parsing error.
    #[error("Failed to parse {source_name}: {message}")]
    DataParseError {
        /// Name of the data being parsed (file name or data kind).
        source_name: String,
        /// Error message.
        message: String,
    },
}

impl BattleError {
    /// Wrap a RON parse failure.
    pub(crate) fn parse(source_name: &str, err: &ron::error::SpannedError) -> Self {
        Self::DataParseError {
            source_name: source_name.to_string(),
            message: err.to_string(),
        }
    }
}

//! Static master data for a battle.
//!
//! This module contains pure data structures that define unit types and
//! the AI spawn schedule. Both are read once at initialization and shared
//! read-only afterwards. All structs can be deserialized from RON text.
//!
//! **Note:** This module contains no IO - it only parses strings.
//! File loading is handled by `lanewar_headless`.

mod unit_data;
mod wave_data;

pub use unit_data::{UnitCatalog, UnitMaster, UnitTypeId};
pub use wave_data::WaveSchedule;

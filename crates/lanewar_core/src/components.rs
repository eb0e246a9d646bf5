//! Combat entity definitions.
//!
//! An [`AttackableEntity`] is plain data. Only the engine in
//! [`simulation`](crate::simulation) mutates it, once per frame.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::{UnitMaster, UnitTypeId};
use crate::math::{fixed_serde, Fixed};

/// Unique identifier for entities.
///
/// Assigned sequentially from 1 and never reused within a battle.
pub type EntityId = u64;

/// Which side of the battle an entity fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Spawned by player input, gated by available cost.
    Player,
    /// Spawned by the wave schedule, never cost-gated.
    Ai,
}

impl Side {
    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Ai,
            Self::Ai => Self::Player,
        }
    }

    /// Check for the player side.
    #[must_use]
    pub const fn is_player(self) -> bool {
        matches!(self, Self::Player)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => f.write_str("player"),
            Self::Ai => f.write_str("ai"),
        }
    }
}

/// Combat state of an entity.
///
/// ```text
/// Idle -> Engaged -> Idle | KnockBack
/// KnockBack -> Idle | Dead
/// ```
///
/// `Dead` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntityState {
    /// Walking forward, looking for a target.
    #[default]
    Idle,
    /// Fighting one opposing entity.
    Engaged,
    /// Retreating after crossing a health threshold.
    KnockBack,
    /// Removed at the end of the frame.
    Dead,
}

impl EntityState {
    /// Whether an idle opponent may pick this entity as a target.
    #[must_use]
    pub const fn is_targetable(self) -> bool {
        matches!(self, Self::Idle | Self::Engaged)
    }
}

/// A live combat unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttackableEntity {
    /// Unique identifier for this battle.
    pub id: EntityId,
    /// Master record this entity was spawned from.
    pub unit_type: UnitTypeId,
    /// Owning side.
    pub side: Side,
    /// Current combat state.
    pub state: EntityState,
    /// Current health. May dip below zero until state resolution.
    pub current_health: i32,
    /// Health on spawn.
    pub max_health: i32,
    /// Position along the lane, measured from the owning side's base.
    #[serde(with = "fixed_serde")]
    pub distance: Fixed,
    /// Opposing entity currently being fought.
    pub engaged_entity: Option<EntityId>,
    /// Damage taken during the current frame.
    pub current_frame_damage: i32,
    /// Frames spent in the current knockback.
    pub current_knock_back_frame_count: u32,
}

impl AttackableEntity {
    /// Create a fresh idle entity at full health.
    #[must_use]
    pub fn spawn(id: EntityId, master: &UnitMaster, side: Side) -> Self {
        Self {
            id,
            unit_type: master.id,
            side,
            state: EntityState::Idle,
            current_health: master.max_health,
            max_health: master.max_health,
            distance: Fixed::ZERO,
            engaged_entity: None,
            current_frame_damage: 0,
            current_knock_back_frame_count: 0,
        }
    }

    /// Check for the player side.
    #[must_use]
    pub const fn is_player(&self) -> bool {
        self.side.is_player()
    }

    /// Health has run out (it is below 1).
    #[must_use]
    pub const fn is_out_of_health(&self) -> bool {
        self.current_health < 1
    }

    /// Health before this frame's damage was applied.
    #[must_use]
    pub const fn health_before_frame(&self) -> i32 {
        self.current_health + self.current_frame_damage
    }

    /// Whether `other` fights for the opposing side.
    #[must_use]
    pub fn is_opponent_of(&self, other: &Self) -> bool {
        self.side != other.side
    }
}

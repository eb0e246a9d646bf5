//! One-dimensional lane geometry and battle metrics.
//!
//! The engine has no notion of position beyond each entity's distance from
//! its own base. [`LaneDelegate`] puts both sides on a shared lane, answers
//! the engine's engage and walk queries from that geometry, and collects
//! [`BattleMetrics`] from the notifications it receives.

use std::collections::BTreeMap;

use lanewar_core::components::{AttackableEntity, EntityId, EntityState, Side};
use lanewar_core::data::UnitTypeId;
use lanewar_core::delegate::{BattleDelegate, SpawnPlacement};
use lanewar_core::math::Fixed;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::scenario::LaneSettings;

/// Counters for one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideMetrics {
    /// Units that entered the battle.
    pub spawned: u32,
    /// Total damage dealt by this side's units.
    pub damage_dealt: i64,
    /// Times one of this side's units was knocked back.
    pub knock_backs: u32,
    /// Units lost.
    pub deaths: u32,
    /// Frames spent walking, summed over units.
    pub walked_frames: u64,
}

/// Aggregate battle statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleMetrics {
    /// Player side counters.
    pub player: SideMetrics,
    /// AI side counters.
    pub ai: SideMetrics,
    /// Highest available cost observed.
    pub peak_available_cost: i32,
    /// First unit to reach the opposing base.
    pub base_reached_by: Option<(Side, EntityId)>,
}

impl BattleMetrics {
    /// Counters for one side.
    #[must_use]
    pub const fn side(&self, side: Side) -> &SideMetrics {
        match side {
            Side::Player => &self.player,
            Side::Ai => &self.ai,
        }
    }

    /// Counters for one side, mutably.
    pub fn side_mut(&mut self, side: Side) -> &mut SideMetrics {
        match side {
            Side::Player => &mut self.player,
            Side::Ai => &mut self.ai,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Tracked {
    side: Side,
    distance: Fixed,
    state: EntityState,
}

/// Delegate placing both sides on one lane.
///
/// A player unit stands at its `distance`; an AI unit stands at
/// `length - distance`. Positions are mirrored from notifications, so the
/// walk query can see opponents it is not being asked about.
#[derive(Debug, Clone)]
pub struct LaneDelegate {
    lane: LaneSettings,
    positions: BTreeMap<EntityId, Tracked>,
    metrics: BattleMetrics,
    affordable: Vec<UnitTypeId>,
}

impl LaneDelegate {
    /// Create a delegate for one lane.
    #[must_use]
    pub fn new(lane: LaneSettings) -> Self {
        Self {
            lane,
            positions: BTreeMap::new(),
            metrics: BattleMetrics::default(),
            affordable: Vec::new(),
        }
    }

    /// Lane geometry.
    #[must_use]
    pub const fn lane(&self) -> &LaneSettings {
        &self.lane
    }

    /// Statistics gathered so far.
    #[must_use]
    pub const fn metrics(&self) -> &BattleMetrics {
        &self.metrics
    }

    /// Consume the delegate, keeping only the statistics.
    #[must_use]
    pub fn into_metrics(self) -> BattleMetrics {
        self.metrics
    }

    /// Unit types the player could afford at the last cost update.
    #[must_use]
    pub fn affordable(&self) -> &[UnitTypeId] {
        &self.affordable
    }

    /// Position on the shared lane, measured from the player base.
    #[must_use]
    pub fn lane_position(&self, side: Side, distance: Fixed) -> Fixed {
        match side {
            Side::Player => distance,
            Side::Ai => self.lane.length.saturating_sub(distance),
        }
    }

    /// Absolute gap between two entities.
    #[must_use]
    pub fn gap(&self, a: &AttackableEntity, b: &AttackableEntity) -> Fixed {
        let pa = self.lane_position(a.side, a.distance);
        let pb = self.lane_position(b.side, b.distance);
        pa.saturating_sub(pb).saturating_abs()
    }

    /// Whether a unit has walked the whole lane.
    #[must_use]
    pub fn reached_base(&self, unit: &AttackableEntity) -> bool {
        unit.distance >= self.lane.length
    }

    fn gap_to(&self, unit: &AttackableEntity, other: &Tracked) -> Fixed {
        let mine = self.lane_position(unit.side, unit.distance);
        let theirs = self.lane_position(other.side, other.distance);
        mine.saturating_sub(theirs).saturating_abs()
    }

    /// An opposing unit that could still be engaged stands within range.
    fn blocked(&self, unit: &AttackableEntity) -> bool {
        self.positions.iter().any(|(id, other)| {
            *id != unit.id
                && other.side != unit.side
                && other.state.is_targetable()
                && self.gap_to(unit, other) <= self.lane.engage_range
        })
    }

    fn track(&mut self, entity: &AttackableEntity) {
        self.positions.insert(
            entity.id,
            Tracked {
                side: entity.side,
                distance: entity.distance,
                state: entity.state,
            },
        );
    }
}

impl BattleDelegate for LaneDelegate {
    fn should_engage(&self, unit: &AttackableEntity, candidate: &AttackableEntity) -> bool {
        self.gap(unit, candidate) <= self.lane.engage_range
    }

    fn should_walk(&self, unit: &AttackableEntity) -> bool {
        !self.reached_base(unit) && !self.blocked(unit)
    }

    fn on_available_cost_updated(&mut self, current: i32, max: i32, affordable: &[UnitTypeId]) {
        trace!(current, max, affordable = affordable.len(), "Cost updated");
        self.metrics.peak_available_cost = self.metrics.peak_available_cost.max(current);
        self.affordable.clear();
        self.affordable.extend_from_slice(affordable);
    }

    fn on_entity_spawned(&mut self, entity: &AttackableEntity, placement: SpawnPlacement) {
        debug!(
            entity = entity.id,
            unit_type = %entity.unit_type,
            side = %placement.side,
            order = placement.order_in_frame,
            "Unit spawned"
        );
        self.metrics.side_mut(entity.side).spawned += 1;
        self.track(entity);
    }

    fn on_health_updated(
        &mut self,
        source: &AttackableEntity,
        target: &AttackableEntity,
        old_health: i32,
        new_health: i32,
        max_health: i32,
    ) {
        trace!(
            source = source.id,
            target = target.id,
            old_health,
            new_health,
            max_health,
            "Damage"
        );
        self.metrics.side_mut(source.side).damage_dealt += i64::from(old_health - new_health);
    }

    fn on_knock_back_progress(&mut self, entity: &AttackableEntity, fraction_complete: Fixed) {
        trace!(entity = entity.id, progress = %fraction_complete, "Knockback progress");
        self.track(entity);
    }

    fn on_walked(&mut self, entity: &AttackableEntity) {
        self.metrics.side_mut(entity.side).walked_frames += 1;
        self.track(entity);

        if self.metrics.base_reached_by.is_none() && self.reached_base(entity) {
            info!(entity = entity.id, side = %entity.side, "Unit reached the enemy base");
            self.metrics.base_reached_by = Some((entity.side, entity.id));
        }
    }

    fn on_state_changed(&mut self, entity: &AttackableEntity, old_state: EntityState) {
        debug!(
            entity = entity.id,
            from = ?old_state,
            to = ?entity.state,
            "State changed"
        );
        match entity.state {
            EntityState::KnockBack => self.metrics.side_mut(entity.side).knock_backs += 1,
            EntityState::Dead => {
                self.metrics.side_mut(entity.side).deaths += 1;
                self.positions.remove(&entity.id);
                return;
            }
            EntityState::Idle | EntityState::Engaged => {}
        }
        self.track(entity);
    }
}

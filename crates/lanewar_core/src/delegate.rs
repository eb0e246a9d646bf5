//! Decision and notification contract between the engine and its host.
//!
//! The engine asks the delegate three policy questions whose answers depend
//! on things it does not model (geometry, rule variants), and tells it about
//! everything observable that happens during a frame. Query answers steer the
//! simulation; notifications never do.
//!
//! Every method has a default, so an implementation only overrides what it
//! cares about. [`NoopDelegate`] overrides nothing: it permits every action
//! and ignores every notification.

use crate::components::{AttackableEntity, EntityState, Side};
use crate::data::UnitTypeId;
use crate::math::Fixed;

/// Where a freshly spawned entity should be placed by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpawnPlacement {
    /// Side the entity spawned for.
    pub side: Side,
    /// Index among this side's spawns accepted in the same frame.
    pub order_in_frame: u32,
}

/// Policy queries and event notifications for one battle.
#[allow(unused_variables)]
pub trait BattleDelegate {
    /// May `attacker` damage `target` this frame?
    fn should_damage(&self, attacker: &AttackableEntity, target: &AttackableEntity) -> bool {
        true
    }

    /// May idle `unit` engage `candidate`?
    fn should_engage(&self, unit: &AttackableEntity, candidate: &AttackableEntity) -> bool {
        true
    }

    /// May idle `unit` walk forward this frame?
    fn should_walk(&self, unit: &AttackableEntity) -> bool {
        true
    }

    /// The available cost changed. `affordable` lists the player's roster
    /// entries whose cost fits in `current`.
    fn on_available_cost_updated(&mut self, current: i32, max: i32, affordable: &[UnitTypeId]) {}

    /// A new entity entered the battle.
    fn on_entity_spawned(&mut self, entity: &AttackableEntity, placement: SpawnPlacement) {}

    /// `source` damaged `target`.
    fn on_health_updated(
        &mut self,
        source: &AttackableEntity,
        target: &AttackableEntity,
        old_health: i32,
        new_health: i32,
        max_health: i32,
    ) {
    }

    /// A knocked-back entity retreated one more frame.
    fn on_knock_back_progress(&mut self, entity: &AttackableEntity, fraction_complete: Fixed) {}

    /// An idle entity walked forward.
    fn on_walked(&mut self, entity: &AttackableEntity) {}

    /// An entity ended state resolution in a different state.
    fn on_state_changed(&mut self, entity: &AttackableEntity, old_state: EntityState) {}
}

/// Delegate that permits everything and observes nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoopDelegate;

impl BattleDelegate for NoopDelegate {}

impl<D: BattleDelegate + ?Sized> BattleDelegate for &mut D {
    fn should_damage(&self, attacker: &AttackableEntity, target: &AttackableEntity) -> bool {
        (**self).should_damage(attacker, target)
    }

    fn should_engage(&self, unit: &AttackableEntity, candidate: &AttackableEntity) -> bool {
        (**self).should_engage(unit, candidate)
    }

    fn should_walk(&self, unit: &AttackableEntity) -> bool {
        (**self).should_walk(unit)
    }

    fn on_available_cost_updated(&mut self, current: i32, max: i32, affordable: &[UnitTypeId]) {
        (**self).on_available_cost_updated(current, max, affordable);
    }

    fn on_entity_spawned(&mut self, entity: &AttackableEntity, placement: SpawnPlacement) {
        (**self).on_entity_spawned(entity, placement);
    }

    fn on_health_updated(
        &mut self,
        source: &AttackableEntity,
        target: &AttackableEntity,
        old_health: i32,
        new_health: i32,
        max_health: i32,
    ) {
        (**self).on_health_updated(source, target, old_health, new_health, max_health);
    }

    fn on_knock_back_progress(&mut self, entity: &AttackableEntity, fraction_complete: Fixed) {
        (**self).on_knock_back_progress(entity, fraction_complete);
    }

    fn on_walked(&mut self, entity: &AttackableEntity) {
        (**self).on_walked(entity);
    }

    fn on_state_changed(&mut self, entity: &AttackableEntity, old_state: EntityState) {
        (**self).on_state_changed(entity, old_state);
    }
}

impl<D: BattleDelegate + ?Sized> BattleDelegate for Box<D> {
    fn should_damage(&self, attacker: &AttackableEntity, target: &AttackableEntity) -> bool {
        (**self).should_damage(attacker, target)
    }

    fn should_engage(&self, unit: &AttackableEntity, candidate: &AttackableEntity) -> bool {
        (**self).should_engage(unit, candidate)
    }

    fn should_walk(&self, unit: &AttackableEntity) -> bool {
        (**self).should_walk(unit)
    }

    fn on_available_cost_updated(&mut self, current: i32, max: i32, affordable: &[UnitTypeId]) {
        (**self).on_available_cost_updated(current, max, affordable);
    }

    fn on_entity_spawned(&mut self, entity: &AttackableEntity, placement: SpawnPlacement) {
        (**self).on_entity_spawned(entity, placement);
    }

    fn on_health_updated(
        &mut self,
        source: &AttackableEntity,
        target: &AttackableEntity,
        old_health: i32,
        new_health: i32,
        max_health: i32,
    ) {
        (**self).on_health_updated(source, target, old_health, new_health, max_health);
    }

    fn on_knock_back_progress(&mut self, entity: &AttackableEntity, fraction_complete: Fixed) {
        (**self).on_knock_back_progress(entity, fraction_complete);
    }

    fn on_walked(&mut self, entity: &AttackableEntity) {
        (**self).on_walked(entity);
    }

    fn on_state_changed(&mut self, entity: &AttackableEntity, old_state: EntityState) {
        (**self).on_state_changed(entity, old_state);
    }
}

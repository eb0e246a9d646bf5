//! Per-frame parameter update: damage, then movement or knockback.
//!
//! Runs over every live entity in store order, whatever its state.
//! Death is never decided here. Health may go below zero and the state
//! machine sorts it out afterwards.

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, EntityState};
use crate::data::UnitCatalog;
use crate::delegate::BattleDelegate;
use crate::math::fraction;
use crate::simulation::EntityStorage;

/// One application of damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DamageEvent {
    /// Entity that dealt the damage.
    pub attacker: EntityId,
    /// Entity that received it.
    pub target: EntityId,
    /// Amount of damage dealt.
    pub damage: i32,
    /// Target health before the hit.
    pub old_health: i32,
    /// Target health after the hit.
    pub new_health: i32,
}

/// Apply damage and movement for every live entity.
///
/// Returns the damage dealt this frame, in application order.
pub(crate) fn update_parameters<D: BattleDelegate>(
    storage: &mut EntityStorage,
    catalog: &UnitCatalog,
    delegate: &mut D,
) -> Vec<DamageEvent> {
    let mut damage_events = Vec::new();

    for index in 0..storage.len() {
        if let Some(event) = apply_damage(storage, catalog, delegate, index) {
            damage_events.push(event);
        }
        apply_movement(storage, catalog, delegate, index);
    }

    damage_events
}

/// Damage the engaged target of the entity at `index`, if any.
fn apply_damage<D: BattleDelegate>(
    storage: &mut EntityStorage,
    catalog: &UnitCatalog,
    delegate: &mut D,
    index: usize,
) -> Option<DamageEvent> {
    let attacker = storage.at(index);
    let target_index = storage.index_of(attacker.engaged_entity?)?;
    let power = catalog.get(attacker.unit_type)?.power;

    if !delegate.should_damage(attacker, storage.at(target_index)) {
        return None;
    }

    let target = storage.at_mut(target_index);
    let old_health = target.current_health;
    target.current_health = old_health.saturating_sub(power);
    target.current_frame_damage = target.current_frame_damage.saturating_add(power);

    let (attacker, target) = (storage.at(index), storage.at(target_index));
    delegate.on_health_updated(
        attacker,
        target,
        old_health,
        target.current_health,
        target.max_health,
    );

    Some(DamageEvent {
        attacker: attacker.id,
        target: target.id,
        damage: power,
        old_health,
        new_health: target.current_health,
    })
}

/// Retreat a knocked-back entity, or walk an idle one forward.
fn apply_movement<D: BattleDelegate>(
    storage: &mut EntityStorage,
    catalog: &UnitCatalog,
    delegate: &mut D,
    index: usize,
) {
    let Some(master) = catalog.get(storage.at(index).unit_type) else {
        return;
    };

    match storage.at(index).state {
        EntityState::KnockBack => {
            let entity = storage.at_mut(index);
            entity.distance = entity.distance.saturating_sub(master.knock_back_speed);
            entity.current_knock_back_frame_count += 1;
            let progress = fraction(
                entity.current_knock_back_frame_count,
                master.knock_back_frames,
            );
            delegate.on_knock_back_progress(storage.at(index), progress);
        }
        state => {
            storage.at_mut(index).current_knock_back_frame_count = 0;
            if state == EntityState::Idle && delegate.should_walk(storage.at(index)) {
                let entity = storage.at_mut(index);
                entity.distance = entity.distance.saturating_add(master.speed);
                delegate.on_walked(storage.at(index));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{AttackableEntity, Side};
    use crate::data::{UnitMaster, UnitTypeId};
    use crate::math::Fixed;

    fn catalog() -> UnitCatalog {
        UnitCatalog::from_units([UnitMaster {
            id: UnitTypeId(1),
            name: "grunt".to_string(),
            cost: 10,
            max_health: 100,
            power: 10,
            speed: Fixed::from_num(2),
            knock_back_speed: Fixed::from_num(5),
            knock_back_frames: 4,
        }])
        .unwrap()
    }

    fn storage_with_pair(catalog: &UnitCatalog) -> EntityStorage {
        let master = catalog.get(UnitTypeId(1)).unwrap();
        let mut storage = EntityStorage::new();
        storage.spawn(master, Side::Player);
        storage.spawn(master, Side::Ai);
        storage
    }

    fn engage(storage: &mut EntityStorage, a: EntityId, b: EntityId) {
        let entity = storage.get_mut(a).unwrap();
        entity.state = EntityState::Engaged;
        entity.engaged_entity = Some(b);
    }

    #[derive(Default)]
    struct Policy {
        deny_damage: bool,
        deny_walk: bool,
        health_updates: Vec<(i32, i32, i32)>,
        progress: Vec<Fixed>,
        walked: Vec<EntityId>,
    }

    impl BattleDelegate for Policy {
        fn should_damage(&self, _attacker: &AttackableEntity, _target: &AttackableEntity) -> bool {
            !self.deny_damage
        }

        fn should_walk(&self, _unit: &AttackableEntity) -> bool {
            !self.deny_walk
        }

        fn on_health_updated(
            &mut self,
            _source: &AttackableEntity,
            _target: &AttackableEntity,
            old_health: i32,
            new_health: i32,
            max_health: i32,
        ) {
            self.health_updates.push((old_health, new_health, max_health));
        }

        fn on_knock_back_progress(&mut self, _entity: &AttackableEntity, fraction_complete: Fixed) {
            self.progress.push(fraction_complete);
        }

        fn on_walked(&mut self, entity: &AttackableEntity) {
            self.walked.push(entity.id);
        }
    }

    #[test]
    fn test_engaged_attacker_damages_target() {
        let catalog = catalog();
        let mut storage = storage_with_pair(&catalog);
        engage(&mut storage, 1, 2);
        let mut policy = Policy::default();

        let events = update_parameters(&mut storage, &catalog, &mut policy);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].attacker, 1);
        assert_eq!(events[0].target, 2);
        let target = storage.get(2).unwrap();
        assert_eq!(target.current_health, 90);
        assert_eq!(target.current_frame_damage, 10);
        assert_eq!(policy.health_updates, vec![(100, 90, 100)]);
    }

    #[test]
    fn test_denied_damage_is_skipped() {
        let catalog = catalog();
        let mut storage = storage_with_pair(&catalog);
        engage(&mut storage, 1, 2);
        let mut policy = Policy {
            deny_damage: true,
            ..Default::default()
        };

        let events = update_parameters(&mut storage, &catalog, &mut policy);

        assert!(events.is_empty());
        assert_eq!(storage.get(2).unwrap().current_health, 100);
    }

    #[test]
    fn test_missing_target_is_skipped() {
        let catalog = catalog();
        let mut storage = storage_with_pair(&catalog);
        engage(&mut storage, 1, 77);
        let mut policy = Policy::default();

        let events = update_parameters(&mut storage, &catalog, &mut policy);

        assert!(events.is_empty());
    }

    #[test]
    fn test_idle_walks_engaged_holds() {
        let catalog = catalog();
        let mut storage = storage_with_pair(&catalog);
        engage(&mut storage, 1, 2);
        let mut policy = Policy::default();

        update_parameters(&mut storage, &catalog, &mut policy);

        assert_eq!(storage.get(1).unwrap().distance, Fixed::ZERO);
        assert_eq!(storage.get(2).unwrap().distance, Fixed::from_num(2));
        assert_eq!(policy.walked, vec![2]);
    }

    #[test]
    fn test_walk_denied() {
        let catalog = catalog();
        let mut storage = storage_with_pair(&catalog);
        let mut policy = Policy {
            deny_walk: true,
            ..Default::default()
        };

        update_parameters(&mut storage, &catalog, &mut policy);

        assert!(storage.iter().all(|e| e.distance == Fixed::ZERO));
        assert!(policy.walked.is_empty());
    }

    #[test]
    fn test_knock_back_retreats_and_reports_progress() {
        let catalog = catalog();
        let mut storage = storage_with_pair(&catalog);
        {
            let entity = storage.get_mut(1).unwrap();
            entity.state = EntityState::KnockBack;
            entity.distance = Fixed::from_num(20);
        }
        let mut policy = Policy {
            deny_walk: true,
            ..Default::default()
        };

        update_parameters(&mut storage, &catalog, &mut policy);
        update_parameters(&mut storage, &catalog, &mut policy);

        let entity = storage.get(1).unwrap();
        assert_eq!(entity.distance, Fixed::from_num(10));
        assert_eq!(entity.current_knock_back_frame_count, 2);
        assert_eq!(
            policy.progress,
            vec![Fixed::from_num(0.25), Fixed::from_num(0.5)]
        );
    }

    #[test]
    fn test_extreme_speeds_saturate_distance() {
        let catalog = UnitCatalog::from_units([UnitMaster {
            id: UnitTypeId(1),
            name: "comet".to_string(),
            cost: 10,
            max_health: 100,
            power: 10,
            speed: Fixed::from_num(1_500_000_000),
            knock_back_speed: Fixed::from_num(1_500_000_000),
            knock_back_frames: 4,
        }])
        .unwrap();
        let mut storage = storage_with_pair(&catalog);
        storage.get_mut(2).unwrap().state = EntityState::KnockBack;
        let mut policy = Policy::default();

        for _ in 0..3 {
            update_parameters(&mut storage, &catalog, &mut policy);
        }

        assert_eq!(storage.get(1).unwrap().distance, Fixed::MAX);
        assert_eq!(storage.get(2).unwrap().distance, Fixed::MIN);
        assert_eq!(policy.walked, vec![1, 1, 1]);
    }

    #[test]
    fn test_counter_resets_outside_knock_back() {
        let catalog = catalog();
        let mut storage = storage_with_pair(&catalog);
        storage.get_mut(1).unwrap().current_knock_back_frame_count = 3;
        let mut policy = Policy::default();

        update_parameters(&mut storage, &catalog, &mut policy);

        assert_eq!(storage.get(1).unwrap().current_knock_back_frame_count, 0);
    }
}

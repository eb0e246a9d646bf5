//! State transition resolution.
//!
//! Entities are grouped by the state they hold when this phase starts and
//! the groups are resolved in a fixed order: knockback, then engaged, then
//! idle. An entity is therefore resolved by the rules of its starting state,
//! whatever an earlier group did to it. Checks against *other* entities read
//! their live fields, so an engagement cleared earlier in the phase is seen
//! by everyone resolved after it.
//!
//! State-change notifications are collected and emitted only after every
//! group has been resolved.

use serde::{Deserialize, Serialize};

use crate::components::{AttackableEntity, EntityId, EntityState};
use crate::config::BattleConfig;
use crate::data::UnitCatalog;
use crate::delegate::BattleDelegate;
use crate::math::{scale, Fixed};
use crate::simulation::EntityStorage;

/// Resolution order of the state groups.
const RESOLUTION_ORDER: [EntityState; 3] = [
    EntityState::KnockBack,
    EntityState::Engaged,
    EntityState::Idle,
];

/// An entity that ended the phase in a different state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateChange {
    /// Entity whose state changed.
    pub entity: EntityId,
    /// State at the start of the phase.
    pub from: EntityState,
    /// State at the end of the phase.
    pub to: EntityState,
}

/// Resolve every entity's transition for this frame.
pub(crate) fn resolve_transitions<D: BattleDelegate>(
    storage: &mut EntityStorage,
    catalog: &UnitCatalog,
    config: &BattleConfig,
    delegate: &mut D,
) -> Vec<StateChange> {
    let snapshot: Vec<EntityState> = storage.iter().map(|e| e.state).collect();

    for group in RESOLUTION_ORDER {
        let members: Vec<usize> = snapshot
            .iter()
            .enumerate()
            .filter(|(_, state)| **state == group)
            .map(|(index, _)| index)
            .collect();

        for index in members {
            match group {
                EntityState::KnockBack => resolve_knock_back(storage, catalog, index),
                EntityState::Engaged => resolve_engaged(storage, config, index),
                EntityState::Idle => resolve_idle(storage, &*delegate, index),
                EntityState::Dead => {}
            }
        }
    }

    let changes: Vec<StateChange> = snapshot
        .iter()
        .zip(storage.iter())
        .filter(|(from, entity)| **from != entity.state)
        .map(|(from, entity)| StateChange {
            entity: entity.id,
            from: *from,
            to: entity.state,
        })
        .collect();

    for change in &changes {
        if let Some(entity) = storage.get(change.entity) {
            delegate.on_state_changed(entity, change.from);
        }
    }

    changes
}

/// Knocked-back entities stay out of combat until their knockback runs out,
/// then either recover or die.
fn resolve_knock_back(storage: &mut EntityStorage, catalog: &UnitCatalog, index: usize) {
    storage.disengage(index);

    let frames = catalog
        .get(storage.at(index).unit_type)
        .map_or(0, |master| master.knock_back_frames);
    let entity = storage.at_mut(index);
    if entity.current_knock_back_frame_count < frames {
        return;
    }

    entity.current_knock_back_frame_count = 0;
    entity.state = if entity.is_out_of_health() {
        EntityState::Dead
    } else {
        EntityState::Idle
    };
}

/// Engaged entities drop out when their target is gone and get knocked back
/// when this frame's damage crossed a health threshold. The threshold check
/// always runs, so a crossing wins over a lost target.
fn resolve_engaged(storage: &mut EntityStorage, config: &BattleConfig, index: usize) {
    let target_fighting = storage
        .at(index)
        .engaged_entity
        .and_then(|id| storage.get(id))
        .is_some_and(|target| {
            !target.is_out_of_health()
                && !matches!(target.state, EntityState::KnockBack | EntityState::Dead)
        });

    if !target_fighting {
        storage.disengage(index);
        storage.at_mut(index).state = EntityState::Idle;
    }

    if crossed_knock_back_threshold(storage.at(index), config) {
        storage.disengage(index);
        let entity = storage.at_mut(index);
        entity.state = EntityState::KnockBack;
        entity.current_knock_back_frame_count = 0;
    }
}

/// Idle entities engage the first opposing entity, in store order, that is
/// still fighting and that the delegate approves.
fn resolve_idle<D: BattleDelegate>(storage: &mut EntityStorage, delegate: &D, index: usize) {
    let unit = storage.at(index);
    let target = storage
        .iter()
        .find(|candidate| {
            unit.is_opponent_of(candidate)
                && candidate.state.is_targetable()
                && delegate.should_engage(unit, candidate)
        })
        .map(|candidate| candidate.id);

    if let Some(target) = target {
        let entity = storage.at_mut(index);
        entity.engaged_entity = Some(target);
        entity.state = EntityState::Engaged;
    }
}

/// Whether this frame's damage carried the entity's health downward across
/// a configured threshold (or, optionally, below 1).
pub(crate) fn crossed_knock_back_threshold(entity: &AttackableEntity, config: &BattleConfig) -> bool {
    let before = entity.health_before_frame();
    let now = entity.current_health;

    let (now_fixed, before_fixed) = (Fixed::from_num(now), Fixed::from_num(before));
    let crossed_ladder = config.knock_back_health_thresholds.iter().any(|&threshold| {
        let line = scale(entity.max_health, threshold);
        now_fixed < line && before_fixed >= line
    });

    crossed_ladder || (config.lethal_damage_knocks_back && now < 1 && before >= 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Side;
    use crate::data::{UnitMaster, UnitTypeId};

    fn catalog() -> UnitCatalog {
        UnitCatalog::from_units([UnitMaster {
            id: UnitTypeId(1),
            name: "grunt".to_string(),
            cost: 10,
            max_health: 100,
            power: 10,
            speed: Fixed::ONE,
            knock_back_speed: Fixed::ONE,
            knock_back_frames: 3,
        }])
        .unwrap()
    }

    fn config(thresholds: &[f64]) -> BattleConfig {
        BattleConfig {
            knock_back_health_thresholds: thresholds.iter().map(|t| Fixed::from_num(*t)).collect(),
            lethal_damage_knocks_back: false,
            ..Default::default()
        }
    }

    fn spawn(storage: &mut EntityStorage, catalog: &UnitCatalog, side: Side) -> EntityId {
        storage.spawn(catalog.get(UnitTypeId(1)).unwrap(), side)
    }

    fn set_engaged(storage: &mut EntityStorage, a: EntityId, b: EntityId) {
        for (from, to) in [(a, b), (b, a)] {
            let entity = storage.get_mut(from).unwrap();
            entity.state = EntityState::Engaged;
            entity.engaged_entity = Some(to);
        }
    }

    fn damage(storage: &mut EntityStorage, id: EntityId, from: i32, amount: i32) {
        let entity = storage.get_mut(id).unwrap();
        entity.current_health = from - amount;
        entity.current_frame_damage = amount;
    }

    #[derive(Default)]
    struct Observer {
        refuse_engage: bool,
        changes: Vec<(EntityId, EntityState, EntityState)>,
    }

    impl BattleDelegate for Observer {
        fn should_engage(&self, _unit: &AttackableEntity, _candidate: &AttackableEntity) -> bool {
            !self.refuse_engage
        }

        fn on_state_changed(&mut self, entity: &AttackableEntity, old_state: EntityState) {
            self.changes.push((entity.id, old_state, entity.state));
        }
    }

    /// Records, for each notification, the entity's state at that moment and
    /// how many engage queries had been answered.
    #[derive(Default)]
    struct PhaseLog {
        queries: std::cell::Cell<usize>,
        notified: Vec<(EntityId, EntityState, usize)>,
    }

    impl BattleDelegate for PhaseLog {
        fn should_engage(&self, _unit: &AttackableEntity, _candidate: &AttackableEntity) -> bool {
            self.queries.set(self.queries.get() + 1);
            true
        }

        fn on_state_changed(&mut self, entity: &AttackableEntity, _old_state: EntityState) {
            self.notified.push((entity.id, entity.state, self.queries.get()));
        }
    }

    #[test]
    fn test_notifications_follow_every_group() {
        let catalog = catalog();
        let mut storage = EntityStorage::new();
        let hit = spawn(&mut storage, &catalog, Side::Ai);
        let partner = spawn(&mut storage, &catalog, Side::Player);
        let recovering = spawn(&mut storage, &catalog, Side::Ai);
        let idle_player = spawn(&mut storage, &catalog, Side::Player);
        let idle_ai = spawn(&mut storage, &catalog, Side::Ai);

        set_engaged(&mut storage, hit, partner);
        damage(&mut storage, hit, 55, 10);
        {
            let entity = storage.get_mut(recovering).unwrap();
            entity.state = EntityState::KnockBack;
            entity.current_knock_back_frame_count = 3;
        }

        let mut log = PhaseLog::default();
        let changes = resolve_transitions(&mut storage, &catalog, &config(&[0.5]), &mut log);

        assert_eq!(
            changes
                .iter()
                .map(|c| (c.entity, c.from, c.to))
                .collect::<Vec<_>>(),
            vec![
                (hit, EntityState::Engaged, EntityState::KnockBack),
                (partner, EntityState::Engaged, EntityState::Idle),
                (recovering, EntityState::KnockBack, EntityState::Idle),
                (idle_player, EntityState::Idle, EntityState::Engaged),
                (idle_ai, EntityState::Idle, EntityState::Engaged),
            ]
        );
        assert_eq!(storage.get(idle_player).unwrap().engaged_entity, Some(recovering));
        assert_eq!(storage.get(idle_ai).unwrap().engaged_entity, Some(partner));

        // Every notice went out after the idle group's last engage query and
        // shows the state the entity ended the phase in.
        let queries = log.queries.get();
        assert_eq!(queries, 2);
        assert_eq!(log.notified.len(), changes.len());
        for (id, seen, queries_before) in &log.notified {
            assert_eq!(*seen, storage.get(*id).unwrap().state);
            assert_eq!(*queries_before, queries);
        }
    }

    #[test]
    fn test_idle_pair_engage_each_other() {
        let catalog = catalog();
        let mut storage = EntityStorage::new();
        let a = spawn(&mut storage, &catalog, Side::Player);
        let b = spawn(&mut storage, &catalog, Side::Ai);
        let mut observer = Observer::default();

        let changes = resolve_transitions(&mut storage, &catalog, &config(&[0.5]), &mut observer);

        assert_eq!(changes.len(), 2);
        assert_eq!(storage.get(a).unwrap().engaged_entity, Some(b));
        assert_eq!(storage.get(b).unwrap().engaged_entity, Some(a));
        assert_eq!(
            observer.changes,
            vec![
                (a, EntityState::Idle, EntityState::Engaged),
                (b, EntityState::Idle, EntityState::Engaged),
            ]
        );
    }

    #[test]
    fn test_idle_never_targets_own_side_or_knocked_back() {
        let catalog = catalog();
        let mut storage = EntityStorage::new();
        let a = spawn(&mut storage, &catalog, Side::Player);
        let _friend = spawn(&mut storage, &catalog, Side::Player);
        let foe = spawn(&mut storage, &catalog, Side::Ai);
        storage.get_mut(foe).unwrap().state = EntityState::KnockBack;
        storage.get_mut(foe).unwrap().current_knock_back_frame_count = 0;

        resolve_transitions(&mut storage, &catalog, &config(&[0.5]), &mut Observer::default());

        assert_eq!(storage.get(a).unwrap().state, EntityState::Idle);
        assert!(storage.get(a).unwrap().engaged_entity.is_none());
    }

    #[test]
    fn test_delegate_can_refuse_engagement() {
        let catalog = catalog();
        let mut storage = EntityStorage::new();
        spawn(&mut storage, &catalog, Side::Player);
        spawn(&mut storage, &catalog, Side::Ai);
        let mut observer = Observer {
            refuse_engage: true,
            ..Default::default()
        };

        let changes = resolve_transitions(&mut storage, &catalog, &config(&[0.5]), &mut observer);

        assert!(changes.is_empty());
        assert!(observer.changes.is_empty());
    }

    #[test]
    fn test_threshold_crossing_knocks_back() {
        let catalog = catalog();
        let mut storage = EntityStorage::new();
        let a = spawn(&mut storage, &catalog, Side::Player);
        let b = spawn(&mut storage, &catalog, Side::Ai);
        set_engaged(&mut storage, a, b);
        damage(&mut storage, b, 55, 10);

        resolve_transitions(&mut storage, &catalog, &config(&[0.5]), &mut Observer::default());

        let b_entity = storage.get(b).unwrap();
        assert_eq!(b_entity.state, EntityState::KnockBack);
        assert!(b_entity.engaged_entity.is_none());
        // The attacker was resolved first, so it only notices the lost target
        // on its next resolution.
        let a_entity = storage.get(a).unwrap();
        assert_eq!(a_entity.state, EntityState::Engaged);
        assert!(a_entity.engaged_entity.is_none());

        storage.get_mut(b).unwrap().current_frame_damage = 0;
        resolve_transitions(&mut storage, &catalog, &config(&[0.5]), &mut Observer::default());
        assert_eq!(storage.get(a).unwrap().state, EntityState::Idle);
    }

    #[test]
    fn test_landing_exactly_on_threshold_is_not_a_crossing() {
        let catalog = catalog();
        let mut storage = EntityStorage::new();
        let a = spawn(&mut storage, &catalog, Side::Player);
        let b = spawn(&mut storage, &catalog, Side::Ai);
        set_engaged(&mut storage, a, b);
        damage(&mut storage, b, 60, 10);

        resolve_transitions(&mut storage, &catalog, &config(&[0.5]), &mut Observer::default());

        assert_eq!(storage.get(b).unwrap().state, EntityState::Engaged);
    }

    #[test]
    fn test_no_crossing_without_new_damage() {
        let catalog = catalog();
        let mut storage = EntityStorage::new();
        let a = spawn(&mut storage, &catalog, Side::Player);
        let b = spawn(&mut storage, &catalog, Side::Ai);
        set_engaged(&mut storage, a, b);
        storage.get_mut(b).unwrap().current_health = 30;

        resolve_transitions(&mut storage, &catalog, &config(&[0.5]), &mut Observer::default());

        assert_eq!(storage.get(b).unwrap().state, EntityState::Engaged);
    }

    #[test]
    fn test_crossing_wins_over_dead_target() {
        let catalog = catalog();
        let mut storage = EntityStorage::new();
        let a = spawn(&mut storage, &catalog, Side::Player);
        let b = spawn(&mut storage, &catalog, Side::Ai);
        set_engaged(&mut storage, a, b);
        damage(&mut storage, a, 55, 10);
        storage.get_mut(b).unwrap().current_health = 0;

        resolve_transitions(&mut storage, &catalog, &config(&[0.5]), &mut Observer::default());

        assert_eq!(storage.get(a).unwrap().state, EntityState::KnockBack);
    }

    #[test]
    fn test_lethal_damage_below_every_threshold() {
        let catalog = catalog();
        let mut storage = EntityStorage::new();
        let a = spawn(&mut storage, &catalog, Side::Player);
        let b = spawn(&mut storage, &catalog, Side::Ai);
        set_engaged(&mut storage, a, b);
        damage(&mut storage, b, 5, 10);

        let ladder_only = config(&[0.5]);
        let mut without = storage.clone();
        resolve_transitions(&mut without, &catalog, &ladder_only, &mut Observer::default());
        // The attacker saw its target out of health and let go first.
        assert_eq!(without.get(b).unwrap().state, EntityState::Idle);

        let lethal = BattleConfig {
            lethal_damage_knocks_back: true,
            ..ladder_only
        };
        resolve_transitions(&mut storage, &catalog, &lethal, &mut Observer::default());
        assert_eq!(storage.get(b).unwrap().state, EntityState::KnockBack);
    }

    #[test]
    fn test_default_config_knocks_back_only_on_the_ladder() {
        let catalog = catalog();
        let mut storage = EntityStorage::new();
        let a = spawn(&mut storage, &catalog, Side::Player);
        let b = spawn(&mut storage, &catalog, Side::Ai);
        set_engaged(&mut storage, a, b);
        // Already under every default threshold before the hit.
        damage(&mut storage, a, 20, 10);

        let config = BattleConfig::default();
        assert!(!crossed_knock_back_threshold(storage.get(a).unwrap(), &config));
        resolve_transitions(&mut storage, &catalog, &config, &mut Observer::default());

        assert_eq!(storage.get(a).unwrap().state, EntityState::Engaged);
        assert_eq!(storage.get(a).unwrap().engaged_entity, Some(b));

        // A lethal hit from under the ladder is not a crossing either.
        damage(&mut storage, a, 10, 10);
        assert!(!crossed_knock_back_threshold(storage.get(a).unwrap(), &config));
    }

    #[test]
    fn test_knock_back_runs_its_course_then_recovers_or_dies() {
        let catalog = catalog();
        let mut storage = EntityStorage::new();
        let a = spawn(&mut storage, &catalog, Side::Player);
        let b = spawn(&mut storage, &catalog, Side::Player);
        for id in [a, b] {
            let entity = storage.get_mut(id).unwrap();
            entity.state = EntityState::KnockBack;
            entity.current_knock_back_frame_count = 2;
        }
        storage.get_mut(b).unwrap().current_health = 0;

        resolve_transitions(&mut storage, &catalog, &config(&[]), &mut Observer::default());
        assert_eq!(storage.get(a).unwrap().state, EntityState::KnockBack);

        for id in [a, b] {
            storage.get_mut(id).unwrap().current_knock_back_frame_count = 3;
        }
        let mut observer = Observer::default();
        resolve_transitions(&mut storage, &catalog, &config(&[]), &mut observer);

        assert_eq!(storage.get(a).unwrap().state, EntityState::Idle);
        assert_eq!(storage.get(b).unwrap().state, EntityState::Dead);
        assert_eq!(storage.get(a).unwrap().current_knock_back_frame_count, 0);
        assert_eq!(observer.changes.len(), 2);
    }

    #[test]
    fn test_ladder_stops_at_first_crossing() {
        let entity = {
            let catalog = catalog();
            let mut e = AttackableEntity::spawn(1, catalog.get(UnitTypeId(1)).unwrap(), Side::Ai);
            e.current_health = 20;
            e.current_frame_damage = 60;
            e
        };
        assert!(crossed_knock_back_threshold(&entity, &config(&[0.75, 0.5, 0.25])));
        assert!(!crossed_knock_back_threshold(&entity, &config(&[0.1])));
    }
}

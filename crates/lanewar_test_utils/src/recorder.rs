//! A delegate that records every notification.
//!
//! Policy answers can be switched off to exercise the engine's
//! "delegate says no" paths.

use fixed::types::I32F32;
use lanewar_core::components::{AttackableEntity, EntityId, EntityState, Side};
use lanewar_core::data::UnitTypeId;
use lanewar_core::delegate::{BattleDelegate, SpawnPlacement};

/// One notification received from the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Notification {
    /// `on_available_cost_updated`.
    CostUpdated {
        /// Available cost.
        current: i32,
        /// Cap.
        max: i32,
        /// Affordable roster entries.
        affordable: Vec<UnitTypeId>,
    },
    /// `on_entity_spawned`.
    Spawned {
        /// New entity.
        entity: EntityId,
        /// Unit type.
        unit_type: UnitTypeId,
        /// Side.
        side: Side,
        /// Placement order within the frame.
        order_in_frame: u32,
    },
    /// `on_health_updated`.
    HealthUpdated {
        /// Attacker.
        source: EntityId,
        /// Damaged entity.
        target: EntityId,
        /// Health before the hit.
        old_health: i32,
        /// Health after the hit.
        new_health: i32,
        /// Target's max health.
        max_health: i32,
    },
    /// `on_knock_back_progress`.
    KnockBackProgress {
        /// Retreating entity.
        entity: EntityId,
        /// Fraction of the knockback completed.
        progress: I32F32,
    },
    /// `on_walked`.
    Walked {
        /// Entity that walked.
        entity: EntityId,
    },
    /// `on_state_changed`.
    StateChanged {
        /// Entity that changed.
        entity: EntityId,
        /// Previous state.
        from: EntityState,
        /// New state.
        to: EntityState,
    },
}

/// Records notifications in arrival order.
#[derive(Debug, Clone)]
pub struct RecordingDelegate {
    /// Answer to `should_damage`.
    pub allow_damage: bool,
    /// Answer to `should_engage`.
    pub allow_engage: bool,
    /// Answer to `should_walk`.
    pub allow_walk: bool,
    pub notifications: Vec<Notification>,
}

impl Default for RecordingDelegate {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDelegate {
    /// A recorder that permits everything.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allow_damage: true,
            allow_engage: true,
            allow_walk: true,
            notifications: Vec::new(),
        }
    }

    /// Everything received so far.
    #[must_use]
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Forget everything received so far.
    pub fn clear(&mut self) {
        self.notifications.clear();
    }

    /// Every cost update as `(current, affordable)`.
    #[must_use]
    pub fn cost_updates(&self) -> Vec<(i32, Vec<UnitTypeId>)> {
        self.notifications
            .iter()
            .filter_map(|n| match n {
                Notification::CostUpdated {
                    current, affordable, ..
                } => Some((*current, affordable.clone())),
                _ => None,
            })
            .collect()
    }

    /// Spawned entity ids, in spawn order.
    #[must_use]
    pub fn spawned(&self) -> Vec<EntityId> {
        self.notifications
            .iter()
            .filter_map(|n| match n {
                Notification::Spawned { entity, .. } => Some(*entity),
                _ => None,
            })
            .collect()
    }

    /// Every state change as `(entity, from, to)`.
    #[must_use]
    pub fn state_changes(&self) -> Vec<(EntityId, EntityState, EntityState)> {
        self.notifications
            .iter()
            .filter_map(|n| match n {
                Notification::StateChanged { entity, from, to } => Some((*entity, *from, *to)),
                _ => None,
            })
            .collect()
    }

    /// State changes of one entity, as `(from, to)`.
    #[must_use]
    pub fn transitions_of(&self, id: EntityId) -> Vec<(EntityState, EntityState)> {
        self.state_changes()
            .into_iter()
            .filter(|(entity, _, _)| *entity == id)
            .map(|(_, from, to)| (from, to))
            .collect()
    }

    /// Number of notifications matching a predicate.
    pub fn count(&self, predicate: impl Fn(&Notification) -> bool) -> usize {
        self.notifications.iter().filter(|n| predicate(n)).count()
    }
}

impl BattleDelegate for RecordingDelegate {
    fn should_damage(&self, _attacker: &AttackableEntity, _target: &AttackableEntity) -> bool {
        self.allow_damage
    }

    fn should_engage(&self, _unit: &AttackableEntity, _candidate: &AttackableEntity) -> bool {
        self.allow_engage
    }

    fn should_walk(&self, _unit: &AttackableEntity) -> bool {
        self.allow_walk
    }

    fn on_available_cost_updated(&mut self, current: i32, max: i32, affordable: &[UnitTypeId]) {
        self.notifications.push(Notification::CostUpdated {
            current,
            max,
            affordable: affordable.to_vec(),
        });
    }

    fn on_entity_spawned(&mut self, entity: &AttackableEntity, placement: SpawnPlacement) {
        self.notifications.push(Notification::Spawned {
            entity: entity.id,
            unit_type: entity.unit_type,
            side: placement.side,
            order_in_frame: placement.order_in_frame,
        });
    }

    fn on_health_updated(
        &mut self,
        source: &AttackableEntity,
        target: &AttackableEntity,
        old_health: i32,
        new_health: i32,
        max_health: i32,
    ) {
        self.notifications.push(Notification::HealthUpdated {
            source: source.id,
            target: target.id,
            old_health,
            new_health,
            max_health,
        });
    }

    fn on_knock_back_progress(&mut self, entity: &AttackableEntity, fraction_complete: I32F32) {
        self.notifications.push(Notification::KnockBackProgress {
            entity: entity.id,
            progress: fraction_complete,
        });
    }

    fn on_walked(&mut self, entity: &AttackableEntity) {
        self.notifications.push(Notification::Walked { entity: entity.id });
    }

    fn on_state_changed(&mut self, entity: &AttackableEntity, old_state: EntityState) {
        self.notifications.push(Notification::StateChanged {
            entity: entity.id,
            from: old_state,
            to: entity.state,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{stock_setup, GRUNT};
    use lanewar_core::config::BattleConfig;
    use lanewar_core::simulation::Simulation;

    #[test]
    fn test_records_spawn_and_cost() {
        let config = BattleConfig {
            initial_available_cost: 30,
            ..Default::default()
        };
        let mut sim = Simulation::new(stock_setup(config), RecordingDelegate::new()).unwrap();
        sim.request_player_spawn(GRUNT);
        sim.update();

        let recorder = sim.delegate();
        assert_eq!(recorder.spawned(), vec![1]);
        // Recovery first, then the refresh after spawning.
        let costs: Vec<i32> = recorder.cost_updates().iter().map(|(c, _)| *c).collect();
        assert_eq!(costs, vec![31, 1]);
        assert_eq!(
            recorder.count(|n| matches!(n, Notification::Walked { .. })),
            1
        );
    }

    #[test]
    fn test_walk_refusal_is_honoured() {
        let recorder = RecordingDelegate {
            allow_walk: false,
            ..RecordingDelegate::new()
        };
        let mut sim = Simulation::new(stock_setup(BattleConfig::default()), recorder).unwrap();
        sim.request_ai_spawn(GRUNT);
        sim.update();

        assert_eq!(
            sim.delegate()
                .count(|n| matches!(n, Notification::Walked { .. })),
            0
        );
        assert_eq!(sim.entity(1).unwrap().distance, I32F32::ZERO);
    }
}

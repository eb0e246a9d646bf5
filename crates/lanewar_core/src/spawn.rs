//! Spawn requests and their once-per-frame resolution.
//!
//! Requests only queue intent. Nothing changes until the engine drains the
//! queue during [`Simulation::update`](crate::simulation::Simulation::update).
//! Dropped requests are never retried.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, Side};
use crate::data::{UnitCatalog, UnitTypeId};
use crate::delegate::{BattleDelegate, SpawnPlacement};
use crate::economy::CostEconomy;
use crate::simulation::EntityStorage;

/// Intent to spawn one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpawnRequest {
    /// Unit type to spawn.
    pub unit_type: UnitTypeId,
    /// Side the unit fights for.
    pub side: Side,
}

impl SpawnRequest {
    /// Create a spawn request.
    #[must_use]
    pub const fn new(unit_type: UnitTypeId, side: Side) -> Self {
        Self { unit_type, side }
    }
}

/// Why a spawn request was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnRejection {
    /// No master record exists for the unit type.
    UnknownUnitType,
    /// The player could not afford the unit.
    InsufficientCost {
        /// Cost of the unit.
        required: i32,
        /// Budget left when the request was resolved.
        available: i32,
    },
}

/// A dropped request together with the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedSpawn {
    /// The request that was dropped.
    pub request: SpawnRequest,
    /// Why it was dropped.
    pub reason: SpawnRejection,
}

/// FIFO queue of pending spawn requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpawnQueue {
    pending: VecDeque<SpawnRequest>,
}

impl SpawnQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request.
    pub fn push(&mut self, request: SpawnRequest) {
        self.pending.push_back(request);
    }

    /// Number of pending requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending requests in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = &SpawnRequest> {
        self.pending.iter()
    }
}

/// Outcome of draining the spawn queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnResolution {
    /// Entities created, in creation order.
    pub spawned: Vec<EntityId>,
    /// Requests that were dropped.
    pub rejected: Vec<RejectedSpawn>,
}

/// Shared inputs for spawn resolution.
pub(crate) struct SpawnContext<'a> {
    pub catalog: &'a UnitCatalog,
    pub roster: &'a [UnitTypeId],
}

/// Drain every pending request in FIFO order.
///
/// Player requests are paid from a running budget and dropped whole when
/// it falls short. AI requests are never cost-gated. The economy is
/// written back, and the delegate told, once at the end.
pub(crate) fn resolve_spawns<D: BattleDelegate>(
    queue: &mut SpawnQueue,
    economy: &mut CostEconomy,
    storage: &mut EntityStorage,
    ctx: &SpawnContext<'_>,
    delegate: &mut D,
) -> SpawnResolution {
    let mut resolution = SpawnResolution::default();
    if queue.is_empty() {
        return resolution;
    }

    let mut budget = *economy;
    let mut player_order = 0u32;
    let mut ai_order = 0u32;

    for request in queue.pending.drain(..) {
        let Some(master) = ctx.catalog.get(request.unit_type) else {
            tracing::trace!(
                unit_type = %request.unit_type,
                side = %request.side,
                "Dropping spawn of unknown unit type"
            );
            resolution.rejected.push(RejectedSpawn {
                request,
                reason: SpawnRejection::UnknownUnitType,
            });
            continue;
        };

        if request.side.is_player() && !budget.spend(master.cost) {
            tracing::trace!(
                unit_type = %request.unit_type,
                cost = master.cost,
                available = budget.available,
                "Dropping unaffordable player spawn"
            );
            resolution.rejected.push(RejectedSpawn {
                request,
                reason: SpawnRejection::InsufficientCost {
                    required: master.cost,
                    available: budget.available,
                },
            });
            continue;
        }

        let order = match request.side {
            Side::Player => &mut player_order,
            Side::Ai => &mut ai_order,
        };
        let placement = SpawnPlacement {
            side: request.side,
            order_in_frame: *order,
        };
        *order += 1;

        let id = storage.spawn(master, request.side);
        if let Some(entity) = storage.get(id) {
            delegate.on_entity_spawned(entity, placement);
        }
        resolution.spawned.push(id);
    }

    *economy = budget;
    let affordable = economy.affordable(ctx.roster, ctx.catalog);
    delegate.on_available_cost_updated(economy.available, economy.max, &affordable);

    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::AttackableEntity;
    use crate::data::UnitMaster;
    use crate::math::Fixed;

    fn catalog() -> UnitCatalog {
        UnitCatalog::from_units([UnitMaster {
            id: UnitTypeId(1),
            name: "grunt".to_string(),
            cost: 30,
            max_health: 50,
            power: 5,
            speed: Fixed::ONE,
            knock_back_speed: Fixed::ONE,
            knock_back_frames: 3,
        }])
        .unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        spawned: Vec<(EntityId, SpawnPlacement)>,
        cost_updates: Vec<(i32, Vec<UnitTypeId>)>,
    }

    impl BattleDelegate for Recorder {
        fn on_entity_spawned(&mut self, entity: &AttackableEntity, placement: SpawnPlacement) {
            self.spawned.push((entity.id, placement));
        }

        fn on_available_cost_updated(&mut self, current: i32, _max: i32, affordable: &[UnitTypeId]) {
            self.cost_updates.push((current, affordable.to_vec()));
        }
    }

    fn resolve(
        queue: &mut SpawnQueue,
        economy: &mut CostEconomy,
        storage: &mut EntityStorage,
        recorder: &mut Recorder,
    ) -> SpawnResolution {
        let catalog = catalog();
        let roster = [UnitTypeId(1)];
        let ctx = SpawnContext {
            catalog: &catalog,
            roster: &roster,
        };
        resolve_spawns(queue, economy, storage, &ctx, recorder)
    }

    #[test]
    fn test_player_spawns_paid_in_order_until_budget_runs_out() {
        let mut queue = SpawnQueue::new();
        for _ in 0..3 {
            queue.push(SpawnRequest::new(UnitTypeId(1), Side::Player));
        }
        let mut economy = CostEconomy::new(70, 100, 0);
        let mut storage = EntityStorage::new();
        let mut recorder = Recorder::default();

        let resolution = resolve(&mut queue, &mut economy, &mut storage, &mut recorder);

        assert_eq!(resolution.spawned, vec![1, 2]);
        assert_eq!(resolution.rejected.len(), 1);
        assert_eq!(
            resolution.rejected[0].reason,
            SpawnRejection::InsufficientCost {
                required: 30,
                available: 10
            }
        );
        assert_eq!(economy.available, 10);
        assert!(queue.is_empty());
        assert_eq!(recorder.cost_updates, vec![(10, vec![])]);
    }

    #[test]
    fn test_ai_spawns_ignore_cost() {
        let mut queue = SpawnQueue::new();
        queue.push(SpawnRequest::new(UnitTypeId(1), Side::Ai));
        queue.push(SpawnRequest::new(UnitTypeId(1), Side::Ai));
        let mut economy = CostEconomy::new(0, 100, 0);
        let mut storage = EntityStorage::new();
        let mut recorder = Recorder::default();

        let resolution = resolve(&mut queue, &mut economy, &mut storage, &mut recorder);

        assert_eq!(resolution.spawned.len(), 2);
        assert_eq!(economy.available, 0);
        let orders: Vec<_> = recorder.spawned.iter().map(|(_, p)| p.order_in_frame).collect();
        assert_eq!(orders, vec![0, 1]);
    }

    #[test]
    fn test_unknown_unit_dropped_without_spawn_notification() {
        let mut queue = SpawnQueue::new();
        queue.push(SpawnRequest::new(UnitTypeId(42), Side::Player));
        let mut economy = CostEconomy::new(100, 100, 0);
        let mut storage = EntityStorage::new();
        let mut recorder = Recorder::default();

        let resolution = resolve(&mut queue, &mut economy, &mut storage, &mut recorder);

        assert!(resolution.spawned.is_empty());
        assert_eq!(resolution.rejected[0].reason, SpawnRejection::UnknownUnitType);
        assert!(recorder.spawned.is_empty());
        assert!(storage.is_empty());
        assert_eq!(economy.available, 100);
    }

    #[test]
    fn test_empty_queue_is_silent() {
        let mut queue = SpawnQueue::new();
        let mut economy = CostEconomy::new(5, 100, 0);
        let mut storage = EntityStorage::new();
        let mut recorder = Recorder::default();

        let resolution = resolve(&mut queue, &mut economy, &mut storage, &mut recorder);

        assert_eq!(resolution, SpawnResolution::default());
        assert!(recorder.cost_updates.is_empty());
    }
}

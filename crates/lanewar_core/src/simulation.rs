//! Core battle loop.
//!
//! The simulation is stepped one frame at a time by an external driver and
//! processes all battle logic deterministically.
//!
//! # Determinism
//!
//! All operations in this module are fully deterministic:
//! - No floating-point math (uses fixed-point via [`Fixed`](crate::math::Fixed))
//! - No randomness
//! - Consistent iteration order (entities are kept in id order)
//! - Same inputs always produce same outputs
//!
//! # Example
//!
//! ```
//! use lanewar_core::config::BattleConfig;
//! use lanewar_core::data::{UnitCatalog, UnitMaster, UnitTypeId, WaveSchedule};
//! use lanewar_core::math::Fixed;
//! use lanewar_core::simulation::{BattleSetup, Simulation};
//!
//! let grunt = UnitMaster {
//!     id: UnitTypeId(1),
//!     name: "grunt".to_string(),
//!     cost: 30,
//!     max_health: 100,
//!     power: 10,
//!     speed: Fixed::ONE,
//!     knock_back_speed: Fixed::from_num(3),
//!     knock_back_frames: 5,
//! };
//! let setup = BattleSetup::new(UnitCatalog::from_units([grunt]).unwrap())
//!     .with_waves(WaveSchedule::new().with_wave(0, [UnitTypeId(1)]))
//!     .with_roster([UnitTypeId(1)])
//!     .with_config(BattleConfig {
//!         initial_available_cost: 30,
//!         ..Default::default()
//!     });
//!
//! let mut sim = Simulation::standalone(setup).unwrap();
//! sim.request_player_spawn(UnitTypeId(1));
//!
//! let events = sim.update();
//! assert_eq!(events.spawned.len(), 2);
//! assert_eq!(sim.frame(), 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::combat::{update_parameters, DamageEvent};
use crate::components::{AttackableEntity, EntityId, EntityState, Side};
use crate::config::BattleConfig;
use crate::data::{UnitCatalog, UnitMaster, UnitTypeId, WaveSchedule};
use crate::delegate::{BattleDelegate, NoopDelegate};
use crate::economy::CostEconomy;
use crate::error::Result;
use crate::spawn::{resolve_spawns, RejectedSpawn, SpawnContext, SpawnQueue, SpawnRequest};
use crate::state_machine::{resolve_transitions, StateChange};

/// Storage for all live entities in the battle.
///
/// Entities are kept in a `Vec` in id order. Ids are handed out
/// sequentially, so appending keeps the order and lookups are a binary
/// search. Removal only happens in [`compact`](Self::compact).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStorage {
    /// Live entities, ascending by id.
    entities: Vec<AttackableEntity>,
    /// Next entity ID to assign.
    next_id: EntityId,
}

impl EntityStorage {
    /// Create empty entity storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            next_id: 1,
        }
    }

    /// Create a fresh entity from a master record and return its ID.
    pub fn spawn(&mut self, master: &UnitMaster, side: Side) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        self.entities.push(AttackableEntity::spawn(id, master, side));
        id
    }

    /// Position of an entity in iteration order.
    #[must_use]
    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.entities.binary_search_by_key(&id, |e| e.id).ok()
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&AttackableEntity> {
        self.index_of(id).map(|index| &self.entities[index])
    }

    /// Get a mutable reference to an entity by ID.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut AttackableEntity> {
        self.index_of(id).map(move |index| &mut self.entities[index])
    }

    pub(crate) fn at(&self, index: usize) -> &AttackableEntity {
        &self.entities[index]
    }

    pub(crate) fn at_mut(&mut self, index: usize) -> &mut AttackableEntity {
        &mut self.entities[index]
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.index_of(id).is_some()
    }

    /// Get the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate over all entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = &AttackableEntity> {
        self.entities.iter()
    }

    /// All entities in id order.
    #[must_use]
    pub fn as_slice(&self) -> &[AttackableEntity] {
        &self.entities
    }

    /// Break off the engagement of the entity at `index`, from both ends.
    pub(crate) fn disengage(&mut self, index: usize) {
        let id = self.entities[index].id;
        self.entities[index].engaged_entity = None;
        for entity in &mut self.entities {
            if entity.engaged_entity == Some(id) {
                entity.engaged_entity = None;
            }
        }
    }

    /// Drop dead entities and prepare the survivors for the next frame.
    ///
    /// Returns the removed ids in id order.
    pub fn compact(&mut self) -> Vec<EntityId> {
        let removed: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|e| e.state == EntityState::Dead)
            .map(|e| e.id)
            .collect();

        if !removed.is_empty() {
            self.entities.retain(|e| e.state != EntityState::Dead);
        }

        for entity in &mut self.entities {
            if entity
                .engaged_entity
                .is_some_and(|target| removed.binary_search(&target).is_ok())
            {
                entity.engaged_entity = None;
            }
            entity.current_frame_damage = 0;
        }

        removed
    }
}

impl Default for EntityStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything needed to start a battle.
///
/// Master data is behind `Arc` so several simulations can share it.
#[derive(Debug, Clone)]
pub struct BattleSetup {
    /// Unit master records.
    pub units: Arc<UnitCatalog>,
    /// AI spawn schedule.
    pub waves: Arc<WaveSchedule>,
    /// Unit types the player owns, in display order.
    pub player_roster: Vec<UnitTypeId>,
    /// Configuration override. `None` uses [`BattleConfig::default`].
    pub config: Option<BattleConfig>,
}

impl BattleSetup {
    /// Setup with no waves, an empty roster and default configuration.
    #[must_use]
    pub fn new(units: impl Into<Arc<UnitCatalog>>) -> Self {
        Self {
            units: units.into(),
            waves: Arc::new(WaveSchedule::new()),
            player_roster: Vec::new(),
            config: None,
        }
    }

    /// Replace the wave schedule.
    #[must_use]
    pub fn with_waves(mut self, waves: impl Into<Arc<WaveSchedule>>) -> Self {
        self.waves = waves.into();
        self
    }

    /// Replace the player roster.
    #[must_use]
    pub fn with_roster(mut self, roster: impl IntoIterator<Item = UnitTypeId>) -> Self {
        self.player_roster = roster.into_iter().collect();
        self
    }

    /// Override the configuration.
    #[must_use]
    pub fn with_config(mut self, config: BattleConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// Events generated during one frame.
///
/// The delegate receives the same information as it happens. These are
/// returned for drivers and tests that would rather inspect a summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameEvents {
    /// Frame that was simulated.
    pub frame: u64,
    /// Available cost at the end of the frame.
    pub available_cost: i32,
    /// Entities created this frame.
    pub spawned: Vec<EntityId>,
    /// Spawn requests dropped this frame.
    pub rejected_spawns: Vec<RejectedSpawn>,
    /// Damage dealt this frame, in application order.
    pub damage: Vec<DamageEvent>,
    /// State transitions resolved this frame.
    pub state_changes: Vec<StateChange>,
    /// Dead entities removed at the end of the frame.
    pub removed: Vec<EntityId>,
}

/// The battle engine.
///
/// Owns all mutable battle state and advances it one frame per
/// [`update`](Self::update) call. Phases run in a fixed order:
///
/// 1. **Cost recovery** - regenerate the player's available cost
/// 2. **Waves** - queue this frame's scheduled AI spawns
/// 3. **Spawns** - resolve every queued spawn request
/// 4. **Parameters** - damage, then movement or knockback
/// 5. **States** - resolve state transitions by group
/// 6. **Compaction** - remove the dead and advance the frame counter
#[derive(Debug)]
pub struct Simulation<D = NoopDelegate> {
    /// Frame about to be simulated.
    frame: u64,
    economy: CostEconomy,
    queue: SpawnQueue,
    storage: EntityStorage,
    units: Arc<UnitCatalog>,
    waves: Arc<WaveSchedule>,
    player_roster: Vec<UnitTypeId>,
    config: BattleConfig,
    delegate: D,
}

impl Simulation<NoopDelegate> {
    /// Create a simulation with no observer attached.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn standalone(setup: BattleSetup) -> Result<Self> {
        Self::new(setup, NoopDelegate)
    }
}

impl<D: BattleDelegate> Simulation<D> {
    /// Validate the setup and create a simulation at frame 0.
    ///
    /// Roster or wave entries naming unknown unit types are kept but logged.
    /// They are dropped when they come up, like any other unknown spawn.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(setup: BattleSetup, delegate: D) -> Result<Self> {
        let config = setup.config.unwrap_or_default();
        config.validate()?;

        for unit_type in &setup.player_roster {
            if !setup.units.contains(*unit_type) {
                tracing::warn!(%unit_type, "Player roster names an unknown unit type");
            }
        }
        for (frame, wave) in setup.waves.iter() {
            for unit_type in wave.iter().filter(|id| !setup.units.contains(**id)) {
                tracing::warn!(frame, %unit_type, "Wave names an unknown unit type");
            }
        }

        tracing::info!(
            unit_types = setup.units.len(),
            waves = setup.waves.iter().count(),
            roster = setup.player_roster.len(),
            initial_cost = config.initial_available_cost,
            "Battle initialized"
        );

        Ok(Self {
            frame: 0,
            economy: CostEconomy::new(
                config.initial_available_cost,
                config.max_available_cost,
                config.cost_recovery_per_frame,
            ),
            queue: SpawnQueue::new(),
            storage: EntityStorage::new(),
            units: setup.units,
            waves: setup.waves,
            player_roster: setup.player_roster,
            config,
            delegate,
        })
    }

    /// Advance the battle by exactly one frame.
    ///
    /// # Example
    ///
    /// ```
    /// use lanewar_core::data::UnitCatalog;
    /// use lanewar_core::simulation::{BattleSetup, Simulation};
    ///
    /// let mut sim = Simulation::standalone(BattleSetup::new(UnitCatalog::default())).unwrap();
    /// let events = sim.update();
    /// assert_eq!(events.frame, 0);
    /// assert_eq!(sim.frame(), 1);
    /// ```
    pub fn update(&mut self) -> FrameEvents {
        let mut events = FrameEvents {
            frame: self.frame,
            ..Default::default()
        };

        // 1. Cost recovery
        let available = self.economy.recover();
        let affordable = self.economy.affordable(&self.player_roster, &self.units);
        self.delegate
            .on_available_cost_updated(available, self.economy.max, &affordable);

        // 2. Waves
        for unit_type in self.waves.at(self.frame) {
            self.queue.push(SpawnRequest::new(*unit_type, Side::Ai));
        }

        // 3. Spawns
        let ctx = SpawnContext {
            catalog: &self.units,
            roster: &self.player_roster,
        };
        let resolution = resolve_spawns(
            &mut self.queue,
            &mut self.economy,
            &mut self.storage,
            &ctx,
            &mut self.delegate,
        );
        events.spawned = resolution.spawned;
        events.rejected_spawns = resolution.rejected;

        // 4. Parameters
        events.damage = update_parameters(&mut self.storage, &self.units, &mut self.delegate);

        // 5. States
        events.state_changes = resolve_transitions(
            &mut self.storage,
            &self.units,
            &self.config,
            &mut self.delegate,
        );

        // 6. Compaction
        events.removed = self.storage.compact();
        events.available_cost = self.economy.available;
        self.frame += 1;

        tracing::debug!(
            frame = events.frame,
            cost = events.available_cost,
            live = self.storage.len(),
            spawned = events.spawned.len(),
            removed = events.removed.len(),
            "Frame complete"
        );

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(frame = self.frame, state_hash = hash, "Simulation state hash");
        }

        #[cfg(any(debug_assertions, feature = "debug-validation"))]
        self.validate_invariants();

        events
    }

    /// Queue a spawn for the next [`update`](Self::update).
    ///
    /// Never fails and never touches entities or cost.
    pub fn request_spawn(&mut self, unit_type: UnitTypeId, side: Side) {
        self.queue.push(SpawnRequest::new(unit_type, side));
    }

    /// Queue a cost-gated player spawn.
    pub fn request_player_spawn(&mut self, unit_type: UnitTypeId) {
        self.request_spawn(unit_type, Side::Player);
    }

    /// Queue an AI spawn.
    pub fn request_ai_spawn(&mut self, unit_type: UnitTypeId) {
        self.request_spawn(unit_type, Side::Ai);
    }

    /// Spawn requests waiting for the next frame.
    #[must_use]
    pub fn pending_requests(&self) -> &SpawnQueue {
        &self.queue
    }

    /// Frame about to be simulated. Starts at 0.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Player's available cost.
    #[must_use]
    pub const fn available_cost(&self) -> i32 {
        self.economy.available
    }

    /// Cap on the available cost.
    #[must_use]
    pub const fn max_available_cost(&self) -> i32 {
        self.economy.max
    }

    /// Frozen configuration.
    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// Unit master records.
    #[must_use]
    pub fn units(&self) -> &UnitCatalog {
        &self.units
    }

    /// Live entities.
    #[must_use]
    pub const fn entities(&self) -> &EntityStorage {
        &self.storage
    }

    /// Look up a live entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&AttackableEntity> {
        self.storage.get(id)
    }

    /// Number of live entities on one side.
    #[must_use]
    pub fn side_count(&self, side: Side) -> usize {
        self.storage.iter().filter(|e| e.side == side).count()
    }

    /// True when no spawn is pending and no entity is fighting or knocked back.
    #[must_use]
    pub fn is_idle_battlefield(&self) -> bool {
        self.queue.is_empty() && self.storage.iter().all(|e| e.state == EntityState::Idle)
    }

    /// Attached delegate.
    #[must_use]
    pub const fn delegate(&self) -> &D {
        &self.delegate
    }

    /// Attached delegate, mutably.
    pub fn delegate_mut(&mut self) -> &mut D {
        &mut self.delegate
    }

    /// Tear down the simulation and hand back the delegate.
    pub fn into_delegate(self) -> D {
        self.delegate
    }

    /// Calculate a hash of the current battle state.
    ///
    /// Two simulations with identical state produce identical hashes.
    /// Used to detect divergence between runs.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.frame.hash(&mut hasher);
        self.economy.hash(&mut hasher);
        self.queue.hash(&mut hasher);

        self.storage.len().hash(&mut hasher);
        for entity in self.storage.iter() {
            entity.hash(&mut hasher);
        }

        hasher.finish()
    }

    #[cfg(any(debug_assertions, feature = "debug-validation"))]
    fn validate_invariants(&self) {
        let entities = self.storage.as_slice();
        let ordered = entities.windows(2).all(|pair| pair[0].id < pair[1].id);
        if !ordered {
            tracing::error!(frame = self.frame, "Entity ids out of order");
        }
        debug_assert!(ordered, "entity ids out of order");

        for entity in entities {
            let alive = entity.state != EntityState::Dead;
            if !alive {
                tracing::error!(entity = entity.id, "Dead entity survived compaction");
            }
            debug_assert!(alive, "dead entity {} survived compaction", entity.id);

            if let Some(target_id) = entity.engaged_entity {
                let valid = self
                    .storage
                    .get(target_id)
                    .is_some_and(|target| target.is_opponent_of(entity));
                if !valid {
                    tracing::error!(
                        entity = entity.id,
                        target = target_id,
                        "Engagement points at a missing or friendly entity"
                    );
                }
                debug_assert!(valid, "entity {} has an invalid engagement", entity.id);
            }
        }
    }
}

//! The explicit simulation state.
//!
//! `SimWorld` owns every store, the pipeline, the handler registry, the
//! event bus, the RNG and the config. Nothing in the crate is a global;
//! two worlds are fully independent, which is what the replay-verification
//! pattern (run the same commands in a second world, compare snapshot
//! hashes) depends on.
//!
//! The component arena is deliberately NOT a field: entity allocation
//! belongs to the outer ECS layer, so every entry point borrows it
//! alongside `&mut self`. All the borrow splitting between the pipeline,
//! the registry and the stores happens inside these methods; callers never
//! deal with `PipelineDeps`/`EffectDeps` directly.

use std::sync::Arc;

use crate::action::{ActionDefinition, ActionStore, StartOutcome};
use crate::arena::ComponentArena;
use crate::combat::{
    DamageContext, DamageFlags, DamagePipeline, DamageType, HealContext, PipelineDeps,
    standard_hooks,
};
use crate::config::SimConfig;
use crate::effect::{
    ActiveEffectStore, EffectDef, EffectDeps, EffectRegistry, EffectTrigger, standard_handlers,
};
use crate::entity::Entity;
use crate::error::StartFailure;
use crate::events::{CastPhase, EventBus, LifecycleKind, SimEvent};
use crate::movement::MovementStore;
use crate::resource::ResourceStore;
use crate::rng::SimRng;
use crate::shield::ShieldStore;
use crate::stats::StatModifierStore;
use crate::targeting::TargetingStore;

/// One simulation instance's complete mutable state.
#[derive(Debug)]
pub struct SimWorld {
    pub config: SimConfig,
    pub rng: SimRng,
    pub actions: ActionStore,
    pub stats: StatModifierStore,
    pub resources: ResourceStore,
    pub shields: ShieldStore,
    pub movement: MovementStore,
    pub targeting: TargetingStore,
    pub active: ActiveEffectStore,
    pub pipeline: DamagePipeline,
    pub effects: EffectRegistry,
    pub events: EventBus,
}

impl SimWorld {
    /// World with the standard hook and handler sets installed.
    pub fn new(config: SimConfig, seed: u32) -> Self {
        let mut world = Self::bare(config, seed);
        standard_hooks(&mut world.pipeline);
        standard_handlers(&mut world.effects);
        world
    }

    /// World with empty hook and handler sets, for tests that install
    /// their own.
    pub fn bare(config: SimConfig, seed: u32) -> Self {
        Self {
            config,
            rng: SimRng::new(seed),
            actions: ActionStore::new(),
            stats: StatModifierStore::new(),
            resources: ResourceStore::new(),
            shields: ShieldStore::new(),
            movement: MovementStore::new(),
            targeting: TargetingStore::new(),
            active: ActiveEffectStore::new(),
            pipeline: DamagePipeline::new(),
            effects: EffectRegistry::new(),
            events: EventBus::new(),
        }
    }

    /// Run one damage instance through the pipeline.
    pub fn apply_damage(
        &mut self,
        arena: &mut ComponentArena,
        source: Option<Entity>,
        target: Entity,
        amount: f32,
        damage_type: DamageType,
        flags: DamageFlags,
    ) -> Option<DamageContext> {
        let mut deps = PipelineDeps {
            arena,
            stats: &self.stats,
            shields: &mut self.shields,
            rng: &mut self.rng,
            events: &mut self.events,
            config: &self.config,
        };
        self.pipeline.apply_damage(&mut deps, source, target, amount, damage_type, flags)
    }

    /// Run one heal through the pipeline.
    pub fn apply_heal(
        &mut self,
        arena: &mut ComponentArena,
        source: Option<Entity>,
        target: Entity,
        amount: f32,
    ) -> Option<HealContext> {
        let mut deps = PipelineDeps {
            arena,
            stats: &self.stats,
            shields: &mut self.shields,
            rng: &mut self.rng,
            events: &mut self.events,
            config: &self.config,
        };
        self.pipeline.apply_heal(&mut deps, source, target, amount)
    }

    /// Evaluate and apply one effect definition.
    pub fn apply_effect(
        &mut self,
        arena: &mut ComponentArena,
        def: &EffectDef,
        source: Option<Entity>,
        target: Entity,
        trigger: Option<&DamageContext>,
    ) -> bool {
        let mut deps = EffectDeps {
            arena,
            stats: &mut self.stats,
            resources: &mut self.resources,
            shields: &mut self.shields,
            movement: &mut self.movement,
            actions: &mut self.actions,
            targeting: &mut self.targeting,
            active: &mut self.active,
            rng: &mut self.rng,
            events: &mut self.events,
            config: &self.config,
            pipeline: &self.pipeline,
        };
        crate::effect::apply_effect(&self.effects, def, source, target, trigger, &mut deps)
    }

    /// Re-dispatch an `OnTick`/`OnExpire` trigger from the active sweep.
    pub fn dispatch_trigger(&mut self, arena: &mut ComponentArena, trigger: &EffectTrigger) {
        let mut deps = EffectDeps {
            arena,
            stats: &mut self.stats,
            resources: &mut self.resources,
            shields: &mut self.shields,
            movement: &mut self.movement,
            actions: &mut self.actions,
            targeting: &mut self.targeting,
            active: &mut self.active,
            rng: &mut self.rng,
            events: &mut self.events,
            config: &self.config,
            pipeline: &self.pipeline,
        };
        crate::effect::dispatch_trigger(&self.effects, trigger, &mut deps);
    }

    /// Start a cast, checking cooldown, concurrent cast and resource cost
    /// up front. A health cost lands directly on HP, bypassing mitigation;
    /// the resource store reports it back instead of touching the arena.
    ///
    /// Emits the cast events, applies release effects for zero-windup
    /// definitions, and leaves the rest to the action system's ticking.
    pub fn start_action(
        &mut self,
        arena: &mut ComponentArena,
        entity: Entity,
        definition: &Arc<ActionDefinition>,
        target: Option<Entity>,
        current_tick: u64,
    ) -> Result<StartOutcome, StartFailure> {
        if self.actions.cooldown_remaining(entity, &definition.id) > 0.0 {
            return Err(StartFailure::OnCooldown);
        }
        if self.actions.instance(entity).is_some() {
            return Err(StartFailure::AlreadyCasting);
        }
        if definition.cost > 0.0 {
            let spend = self.resources.spend(entity, definition.cost);
            if !spend.success {
                return Err(StartFailure::NoResource);
            }
            if spend.health_cost > 0.0 {
                if let Some(hp) = arena.hp(entity) {
                    arena.set_hp(entity, hp - spend.health_cost);
                }
            }
        }

        let outcome = self.actions.start_action(entity, definition, target, current_tick)?;
        self.events.emit_cast(entity, &definition.id, CastPhase::Started, target);
        if let Some(released) = outcome.released.clone() {
            self.events.emit_cast(entity, &released.definition.id, CastPhase::Released, released.target);
            self.apply_release(arena, entity, &released);
        }
        if outcome.completed {
            self.events.emit_cast(entity, &definition.id, CastPhase::Completed, target);
        }
        Ok(outcome)
    }

    /// Apply a released cast's effect list, in order, to its target (or the
    /// caster when the cast was untargeted).
    pub fn apply_release(
        &mut self,
        arena: &mut ComponentArena,
        caster: Entity,
        released: &crate::action::ReleasedCast,
    ) {
        let target = released.target.unwrap_or(caster);
        let definition = Arc::clone(&released.definition);
        for effect in &definition.effects {
            self.apply_effect(arena, effect, Some(caster), target, None);
        }
    }

    /// Remove every trace of an entity from the stores. The arena slot is
    /// the caller's to despawn.
    pub fn clear_entity(&mut self, entity: Entity) {
        self.actions.clear_entity(entity);
        self.stats.clear_entity(entity);
        self.resources.clear_entity(entity);
        self.shields.clear_entity(entity);
        self.movement.clear_entity(entity);
        self.targeting.clear_entity(entity);
        self.active.clear_entity(entity);
    }

    /// Despawn an entity and emit the lifecycle event.
    pub fn despawn(&mut self, arena: &mut ComponentArena, entity: Entity) {
        if !arena.is_alive(entity) {
            return;
        }
        self.clear_entity(entity);
        arena.despawn(entity);
        self.events.emit(SimEvent::Lifecycle {
            entity,
            kind: LifecycleKind::Despawned,
        });
    }
}

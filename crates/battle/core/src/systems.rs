//! Per-tick system entry points and the fixed-order driver.
//!
//! Each `*_system` function advances one concern for every live entity, in
//! ascending handle order. They are public so an outer ECS loop can drive
//! them itself; [`Simulation`] is the batteries-included driver that runs
//! them in the fixed order the determinism contract requires:
//!
//! cooldowns → actions → active effects → stat modifiers → resources →
//! shields → displacement → reveal sources.
//!
//! Callers must not interleave partial ticks (half the entities moved
//! before any combat runs); systems always sweep all entities before the
//! next system starts.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::action::{ActionDefinition, StartOutcome};
use crate::arena::ComponentArena;
use crate::clock::FixedClock;
use crate::config::SimConfig;
use crate::entity::{Entity, Position};
use crate::error::StartFailure;
use crate::events::{CastPhase, SimEvent};
use crate::movement::{IntentKind, MovementIntent};
use crate::replay::{Command, ReplayLog, Snapshot, snapshot};
use crate::stats::StatKey;
use crate::world::SimWorld;

/// Time context handed to every system of one tick.
#[derive(Clone, Copy, Debug)]
pub struct TickContext {
    pub tick: u64,
    pub dt: f32,
}

/// Tick cooldowns and every live cast; emit cast events and apply release
/// effect lists.
pub fn action_system(world: &mut SimWorld, arena: &mut ComponentArena, ctx: &TickContext) {
    world.actions.tick_cooldowns(ctx.dt);

    let entities: Vec<Entity> = arena.entities().collect();
    for entity in entities {
        let outcome = world.actions.tick_action(entity, ctx.dt);
        if let Some((ability, cause)) = outcome.interrupted {
            world.events.emit(SimEvent::Cast {
                entity,
                ability,
                phase: CastPhase::Interrupted,
                target: None,
                interrupt_cause: Some(cause),
            });
            continue;
        }
        if let Some(released) = outcome.released {
            world
                .events
                .emit_cast(entity, &released.definition.id, CastPhase::Released, released.target);
            world.apply_release(arena, entity, &released);
        }
        if let Some(ability) = outcome.completed {
            world.events.emit_cast(entity, &ability, CastPhase::Completed, None);
        }
    }
}

/// Tick the legacy status timers and the active-effect store, then
/// re-dispatch the due `OnTick`/`OnExpire` triggers.
pub fn active_effects_system(world: &mut SimWorld, arena: &mut ComponentArena, ctx: &TickContext) {
    arena.tick_status_timers(ctx.dt);
    let due = world.active.tick(ctx.dt);
    for trigger in &due {
        world.dispatch_trigger(arena, trigger);
    }
}

pub fn stat_modifier_system(world: &mut SimWorld, _arena: &mut ComponentArena, ctx: &TickContext) {
    world.stats.tick(ctx.dt);
}

pub fn resource_system(world: &mut SimWorld, _arena: &mut ComponentArena, ctx: &TickContext) {
    world.resources.tick(ctx.dt);
}

/// Expire timed shields. Expiry is not a break; the event says so.
pub fn shield_system(world: &mut SimWorld, _arena: &mut ComponentArena, ctx: &TickContext) {
    for (entity, _id) in world.shields.tick(ctx.dt) {
        world.events.emit(SimEvent::Shield {
            target: entity,
            absorbed: 0.0,
            broken: false,
        });
    }
}

/// Advance every movement intent and write positions back to the arena.
pub fn displacement_system(world: &mut SimWorld, arena: &mut ComponentArena, ctx: &TickContext) {
    let entities: Vec<Entity> = arena.entities().collect();
    for entity in entities {
        let Some(kind) = world.movement.current_intent(entity).map(|i| i.kind) else {
            continue;
        };
        let Some(mut position) = arena.position(entity) else {
            continue;
        };
        let result = world.movement.tick_entity(entity, &mut position, ctx.dt, &world.config);
        if result.moved {
            arena.set_position(entity, position);
        }
        if result.moved || result.completed {
            world.events.emit(SimEvent::Movement {
                entity,
                kind,
                position,
                hit_wall: result.hit_wall,
            });
        }
    }
}

/// Expire timed reveal sources.
pub fn visibility_system(world: &mut SimWorld, _arena: &mut ComponentArena, ctx: &TickContext) {
    world.targeting.tick(ctx.dt);
}

/// The batteries-included driver: world + arena + clock + ability content.
#[derive(Debug)]
pub struct Simulation {
    pub world: SimWorld,
    pub arena: ComponentArena,
    pub clock: FixedClock,
    abilities: BTreeMap<String, Arc<ActionDefinition>>,
}

impl Simulation {
    pub fn new(config: SimConfig, seed: u32) -> Self {
        let clock = FixedClock::new(config.tick_length, config.max_frame_delta);
        Self {
            world: SimWorld::new(config, seed),
            arena: ComponentArena::new(),
            clock,
            abilities: BTreeMap::new(),
        }
    }

    /// Register ability content under its definition id.
    pub fn register_ability(&mut self, definition: ActionDefinition) -> Arc<ActionDefinition> {
        let definition = Arc::new(definition);
        self.abilities.insert(definition.id.clone(), Arc::clone(&definition));
        definition
    }

    pub fn ability(&self, id: &str) -> Option<&Arc<ActionDefinition>> {
        self.abilities.get(id)
    }

    /// Start a registered ability by id.
    pub fn cast(
        &mut self,
        entity: Entity,
        ability: &str,
        target: Option<Entity>,
    ) -> Result<StartOutcome, StartFailure> {
        let Some(definition) = self.abilities.get(ability).cloned() else {
            tracing::debug!(%entity, ability, "unknown ability");
            return Err(StartFailure::UnknownAbility);
        };
        let tick = self.clock.current_tick();
        self.world.start_action(&mut self.arena, entity, &definition, target, tick)
    }

    /// Feed a frame delta; run every due tick. Returns the tick count run.
    pub fn advance(&mut self, real_dt: f32) -> u32 {
        let ticks = self.clock.advance(real_dt);
        let end = self.clock.current_tick();
        let start = end - u64::from(ticks);
        for i in 0..u64::from(ticks) {
            self.run_tick(start + i + 1);
        }
        ticks
    }

    /// Like [`advance`], consuming due commands from a replay log at each
    /// tick boundary before the systems run.
    ///
    /// [`advance`]: Simulation::advance
    pub fn advance_with_commands(&mut self, real_dt: f32, log: &mut ReplayLog) -> u32 {
        let ticks = self.clock.advance(real_dt);
        let end = self.clock.current_tick();
        let start = end - u64::from(ticks);
        for i in 0..u64::from(ticks) {
            let tick = start + i + 1;
            let due: Vec<Command> =
                log.get_for_tick(tick).iter().map(|c| c.command.clone()).collect();
            for command in &due {
                self.apply_command(command, tick);
            }
            self.run_tick(tick);
        }
        ticks
    }

    /// Apply one external command. Failures are logged, never fatal; a
    /// stale handle in a replay must not halt playback.
    pub fn apply_command(&mut self, command: &Command, tick: u64) {
        match command {
            Command::StartAction { entity, ability, target } => {
                if !self.arena.is_alive(*entity) {
                    tracing::trace!(%entity, ability, "command for stale entity dropped");
                    return;
                }
                let Some(definition) = self.abilities.get(ability).cloned() else {
                    tracing::debug!(%entity, ability, "command for unknown ability");
                    return;
                };
                if let Err(reason) =
                    self.world.start_action(&mut self.arena, *entity, &definition, *target, tick)
                {
                    tracing::debug!(%entity, ability, %reason, "start refused");
                }
            }
            Command::Interrupt { entity, cause } => {
                self.world.actions.interrupt_action(*entity, *cause);
            }
            Command::Move { entity, x, y } => {
                if !self.arena.is_alive(*entity) {
                    tracing::trace!(%entity, "move command for stale entity dropped");
                    return;
                }
                let speed =
                    self.world
                        .stats
                        .value(*entity, StatKey::MoveSpeed, self.world.config.base_move_speed);
                self.world.movement.set_intent(
                    *entity,
                    MovementIntent::new(IntentKind::Lane, Position::new(*x, *y), speed),
                );
            }
            Command::Spawn { hp_max, x, y, faction } => {
                let entity = self.arena.spawn(
                    *hp_max,
                    Position::new(*x, *y),
                    crate::entity::Faction(*faction),
                );
                self.world.events.emit_spawn(entity);
            }
            Command::Despawn { entity } => {
                self.world.despawn(&mut self.arena, *entity);
            }
            Command::Custom { name, .. } => {
                tracing::trace!(name, "custom command ignored by the core");
            }
        }
    }

    /// Hash the current state for desync detection.
    pub fn snapshot(&self) -> Snapshot {
        snapshot(
            self.clock.current_tick(),
            &self.arena,
            &self.world.rng,
            &self.world.config,
        )
    }

    fn run_tick(&mut self, tick: u64) {
        let ctx = TickContext {
            tick,
            dt: self.world.config.tick_length,
        };
        self.world.events.set_tick(tick);
        action_system(&mut self.world, &mut self.arena, &ctx);
        active_effects_system(&mut self.world, &mut self.arena, &ctx);
        stat_modifier_system(&mut self.world, &mut self.arena, &ctx);
        resource_system(&mut self.world, &mut self.arena, &ctx);
        shield_system(&mut self.world, &mut self.arena, &ctx);
        displacement_system(&mut self.world, &mut self.arena, &ctx);
        visibility_system(&mut self.world, &mut self.arena, &ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::{DamageFlags, DamageType};
    use crate::effect::{EffectDef, EffectSpec};
    use crate::entity::Faction;

    fn two_entity_sim() -> (Simulation, Entity, Entity) {
        let mut sim = Simulation::new(SimConfig::default(), 5);
        let attacker = sim.arena.spawn(100.0, Position::new(0.0, 0.0), Faction(0));
        let victim = sim.arena.spawn(50.0, Position::new(1.0, 0.0), Faction(1));
        (sim, attacker, victim)
    }

    fn strike() -> ActionDefinition {
        ActionDefinition::new("strike")
            .windup(0.25)
            .recovery(0.2)
            .effect(EffectDef::new(EffectSpec::Damage {
                amount: 10.0,
                damage_type: DamageType::Physical,
                flags: DamageFlags::ATTACK,
            }))
    }

    #[test]
    fn windup_release_lands_damage_on_the_right_tick() {
        let (mut sim, attacker, victim) = two_entity_sim();
        sim.register_ability(strike());
        sim.cast(attacker, "strike", Some(victim)).unwrap();

        // Four 50ms ticks: windup (0.25s) not yet elapsed.
        sim.advance(0.20);
        assert_eq!(sim.arena.hp(victim), Some(50.0));

        // Fifth tick crosses the windup boundary and releases.
        sim.advance(0.05);
        assert_eq!(sim.arena.hp(victim), Some(40.0));
    }

    #[test]
    fn dot_ticks_inside_the_driver() {
        let (mut sim, attacker, victim) = two_entity_sim();
        sim.register_ability(
            ActionDefinition::new("ignite").effect(
                EffectDef::new(EffectSpec::Damage {
                    amount: 4.0,
                    damage_type: DamageType::Magic,
                    flags: DamageFlags::DOT,
                })
                .lingering(1.0)
                .every(0.25),
            ),
        );
        sim.cast(attacker, "ignite", Some(victim)).unwrap();

        // One second in frame deltas below the clamp.
        for _ in 0..4 {
            sim.advance(0.25);
        }
        // Four periods over one second.
        assert_eq!(sim.arena.hp(victim), Some(34.0));
    }

    #[test]
    fn commands_apply_at_their_stamped_tick() {
        let (mut sim, attacker, victim) = two_entity_sim();
        sim.register_ability(strike());
        let mut log = ReplayLog::new();
        log.push(
            3,
            Command::StartAction {
                entity: attacker,
                ability: "strike".into(),
                target: Some(victim),
            },
        )
        .unwrap();

        // Two ticks: nothing started yet.
        sim.advance_with_commands(0.10, &mut log);
        assert!(sim.world.actions.instance(attacker).is_none());

        // Tick 3 consumes the command.
        sim.advance_with_commands(0.05, &mut log);
        assert!(sim.world.actions.instance(attacker).is_some());
    }

    #[test]
    fn move_command_walks_toward_the_point() {
        let (mut sim, attacker, _) = two_entity_sim();
        sim.apply_command(&Command::Move { entity: attacker, x: 10.0, y: 0.0 }, 0);

        for _ in 0..4 {
            sim.advance(0.25);
        }
        let x = sim.arena.position(attacker).unwrap().x;
        // Default base move speed is 3.5 units per second.
        assert!((x - 3.5).abs() < 1e-3);
    }

    #[test]
    fn same_seed_same_commands_same_hashes() {
        let run = || {
            let mut sim = Simulation::new(SimConfig::default(), 77);
            sim.register_ability(strike());
            let a = sim.arena.spawn(100.0, Position::new(0.0, 0.0), Faction(0));
            let b = sim.arena.spawn(80.0, Position::new(1.5, 0.0), Faction(1));
            let mut log = ReplayLog::new();
            log.push(1, Command::StartAction { entity: a, ability: "strike".into(), target: Some(b) })
                .unwrap();
            log.push(15, Command::Move { entity: b, x: -5.0, y: 2.0 }).unwrap();

            let mut hashes = Vec::new();
            for _ in 0..5 {
                sim.advance_with_commands(0.25, &mut log);
                hashes.push(sim.snapshot());
            }
            hashes
        };
        assert_eq!(run(), run());
    }
}

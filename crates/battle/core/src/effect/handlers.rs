//! The stock effect handler set.
//!
//! Conventions the handlers follow:
//!
//! - Damage and heal always delegate to the pipeline, never write HP.
//! - DOT-flagged damage does not hit on apply; only the `OnTick` dispatch
//!   lands it, so a lingering definition is a pure over-time effect.
//! - Stun and slow durations are reduced by the target's tenacity stat.
//! - Status handlers write both the legacy arena timer (cheap presentation
//!   polls) and the proper stat modifier (calculation), tagged so repeated
//!   application refreshes instead of stacking.
//! - Displacements are directed relative to the effect source: knockback
//!   pushes away from it, pull and dash draw toward it, blink lands on it.
//!   A displacement with no source is a no-op.

use super::registry::EffectRegistry;
use super::{EffectDeps, EffectInvocation, EffectKind, EffectSpec, EffectStage};
use crate::action::InterruptCause;
use crate::combat::{DamageFlags, PipelineDeps};
use crate::events::{SimEvent, StatusKind};
use crate::movement::{IntentKind, MovementIntent};
use crate::stats::{ModifierOp, StatKey};

const SLOW_TAG: &str = "slow_generic";

/// Install the stock handlers on a fresh registry.
pub fn standard_handlers(registry: &mut EffectRegistry) {
    use EffectStage::{OnApply, OnTick};

    registry.register(EffectKind::Damage, OnApply, Box::new(damage_apply));
    registry.register(EffectKind::Damage, OnTick, Box::new(damage_tick));
    registry.register(EffectKind::Heal, OnApply, Box::new(heal));
    registry.register(EffectKind::Heal, OnTick, Box::new(heal));
    registry.register(EffectKind::Stun, OnApply, Box::new(stun));
    registry.register(EffectKind::Slow, OnApply, Box::new(slow));
    registry.register(EffectKind::Buff, OnApply, Box::new(buff));
    registry.register(EffectKind::RestoreResource, OnApply, Box::new(restore_resource));
    registry.register(EffectKind::DrainResource, OnApply, Box::new(drain_resource));
    registry.register(EffectKind::AddStacks, OnApply, Box::new(add_stacks));
    registry.register(EffectKind::ConsumeStacks, OnApply, Box::new(consume_stacks));
    registry.register(EffectKind::ApplyMark, OnApply, Box::new(apply_mark));
    registry.register(EffectKind::ConsumeMark, OnApply, Box::new(consume_mark));
    registry.register(EffectKind::Knockback, OnApply, Box::new(displace));
    registry.register(EffectKind::Pull, OnApply, Box::new(displace));
    registry.register(EffectKind::Dash, OnApply, Box::new(displace));
    registry.register(EffectKind::Blink, OnApply, Box::new(displace));
    registry.register(EffectKind::SpawnShield, OnApply, Box::new(spawn_shield));
}

fn pipeline_deps<'a, 'b>(deps: &'a mut EffectDeps<'b>) -> PipelineDeps<'a> {
    PipelineDeps {
        arena: &mut *deps.arena,
        stats: &*deps.stats,
        shields: &mut *deps.shields,
        rng: &mut *deps.rng,
        events: &mut *deps.events,
        config: deps.config,
    }
}

fn damage_apply(invocation: &EffectInvocation, deps: &mut EffectDeps<'_>) {
    let EffectSpec::Damage { amount, damage_type, flags } = &invocation.spec else {
        return;
    };
    if flags.contains(DamageFlags::DOT) {
        return;
    }
    let pipeline = deps.pipeline;
    pipeline.apply_damage(
        &mut pipeline_deps(deps),
        invocation.source,
        invocation.target,
        *amount,
        *damage_type,
        *flags,
    );
}

fn damage_tick(invocation: &EffectInvocation, deps: &mut EffectDeps<'_>) {
    let EffectSpec::Damage { amount, damage_type, flags } = &invocation.spec else {
        return;
    };
    let pipeline = deps.pipeline;
    pipeline.apply_damage(
        &mut pipeline_deps(deps),
        invocation.source,
        invocation.target,
        *amount,
        *damage_type,
        *flags | DamageFlags::DOT,
    );
}

fn heal(invocation: &EffectInvocation, deps: &mut EffectDeps<'_>) {
    let EffectSpec::Heal { amount } = invocation.spec else {
        return;
    };
    let pipeline = deps.pipeline;
    pipeline.apply_heal(&mut pipeline_deps(deps), invocation.source, invocation.target, amount);
}

fn stun(invocation: &EffectInvocation, deps: &mut EffectDeps<'_>) {
    let EffectSpec::Stun { duration } = invocation.spec else {
        return;
    };
    let target = invocation.target;
    if !deps.arena.is_alive(target) {
        return;
    }
    let tenacity = deps.stats.value(target, StatKey::Tenacity, 0.0).clamp(0.0, 1.0);
    let duration = duration * (1.0 - tenacity);
    if duration <= 0.0 {
        return;
    }
    let i = target.index();
    deps.arena.stun_timer[i] = deps.arena.stun_timer[i].max(duration);
    deps.actions.interrupt_action(target, InterruptCause::STUN);
    deps.events.emit_status(target, StatusKind::Stunned, true, duration, 1.0);
}

fn slow(invocation: &EffectInvocation, deps: &mut EffectDeps<'_>) {
    let EffectSpec::Slow { duration, power } = invocation.spec else {
        return;
    };
    let target = invocation.target;
    if !deps.arena.is_alive(target) {
        return;
    }
    let tenacity = deps.stats.value(target, StatKey::Tenacity, 0.0).clamp(0.0, 1.0);
    let duration = duration * (1.0 - tenacity);
    let power = power.clamp(0.0, 1.0);
    if duration <= 0.0 || power <= 0.0 {
        return;
    }
    let i = target.index();
    deps.arena.slow_timer[i] = deps.arena.slow_timer[i].max(duration);
    deps.arena.slow_power[i] = deps.arena.slow_power[i].max(power);
    deps.stats.remove_by_tag(target, SLOW_TAG);
    deps.stats.add(
        target,
        StatKey::MoveSpeed,
        ModifierOp::PercentMult,
        1.0 - power,
        duration,
        invocation.source,
        Some(SLOW_TAG.to_owned()),
    );
    deps.events.emit_status(target, StatusKind::Slowed, true, duration, power);
}

fn buff(invocation: &EffectInvocation, deps: &mut EffectDeps<'_>) {
    let EffectSpec::Buff { duration, stat, op, value, tag } = &invocation.spec else {
        return;
    };
    let target = invocation.target;
    if !deps.arena.is_alive(target) {
        return;
    }
    if let Some(tag) = tag {
        deps.stats.remove_by_tag(target, tag);
    }
    deps.stats.add(target, *stat, *op, *value, *duration, invocation.source, tag.clone());
    let i = target.index();
    deps.arena.buff_timer[i] = deps.arena.buff_timer[i].max(*duration);
    deps.arena.buff_power[i] = *value;
    deps.events.emit_status(target, StatusKind::Buffed, true, *duration, *value);
}

fn restore_resource(invocation: &EffectInvocation, deps: &mut EffectDeps<'_>) {
    let EffectSpec::RestoreResource { amount } = invocation.spec else {
        return;
    };
    deps.resources.restore(invocation.target, amount);
    emit_resource(invocation.target, deps);
}

fn drain_resource(invocation: &EffectInvocation, deps: &mut EffectDeps<'_>) {
    let EffectSpec::DrainResource { amount } = invocation.spec else {
        return;
    };
    deps.resources.drain(invocation.target, amount);
    emit_resource(invocation.target, deps);
}

fn emit_resource(target: crate::entity::Entity, deps: &mut EffectDeps<'_>) {
    let Some(state) = deps.resources.get(target) else {
        return;
    };
    let (kind, current, max) = (state.kind, state.current, state.max);
    deps.events.emit(SimEvent::Resource {
        entity: target,
        kind,
        current,
        max,
    });
}

fn add_stacks(invocation: &EffectInvocation, deps: &mut EffectDeps<'_>) {
    let EffectSpec::AddStacks { count } = invocation.spec else {
        return;
    };
    deps.resources.add_stacks(invocation.target, count);
}

fn consume_stacks(invocation: &EffectInvocation, deps: &mut EffectDeps<'_>) {
    let EffectSpec::ConsumeStacks { tag, count } = &invocation.spec else {
        return;
    };
    deps.active.consume_stacks(invocation.target, tag, *count);
}

fn apply_mark(invocation: &EffectInvocation, deps: &mut EffectDeps<'_>) {
    let EffectSpec::ApplyMark { tag, duration } = &invocation.spec else {
        return;
    };
    deps.active.add_mark(invocation.target, tag, *duration, invocation.source);
    deps.events.emit(SimEvent::Effect {
        source: invocation.source,
        target: invocation.target,
        kind: EffectKind::ApplyMark.to_string(),
    });
}

fn consume_mark(invocation: &EffectInvocation, deps: &mut EffectDeps<'_>) {
    let EffectSpec::ConsumeMark { tag } = &invocation.spec else {
        return;
    };
    if deps.active.consume_mark(invocation.target, tag) {
        deps.events.emit(SimEvent::Effect {
            source: invocation.source,
            target: invocation.target,
            kind: EffectKind::ConsumeMark.to_string(),
        });
    }
}

fn displace(invocation: &EffectInvocation, deps: &mut EffectDeps<'_>) {
    let target = invocation.target;
    let Some(source) = invocation.source else {
        return;
    };
    let (Some(from), Some(at)) = (deps.arena.position(source), deps.arena.position(target)) else {
        return;
    };

    let intent = match invocation.spec {
        EffectSpec::Knockback { distance, speed } => {
            MovementIntent::new(IntentKind::Knockback, at.away_from(&from, distance), speed)
        }
        EffectSpec::Pull { distance, speed } => {
            let step = distance.min(at.distance(&from));
            MovementIntent::new(IntentKind::Pull, at.toward(&from, step), speed)
        }
        EffectSpec::Dash { distance, speed } => {
            let step = distance.min(at.distance(&from));
            MovementIntent::new(IntentKind::Dash, at.toward(&from, step), speed)
        }
        EffectSpec::Blink => MovementIntent::new(IntentKind::Blink, from, 0.0),
        _ => return,
    };
    deps.movement.set_intent(target, intent.with_source(source));
}

fn spawn_shield(invocation: &EffectInvocation, deps: &mut EffectDeps<'_>) {
    let EffectSpec::SpawnShield { amount, absorbs, duration, priority } = invocation.spec else {
        return;
    };
    deps.shields.add(invocation.target, amount, absorbs, duration, priority, invocation.source);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionDefinition, ActionStore};
    use crate::arena::ComponentArena;
    use crate::combat::{DamagePipeline, DamageType, standard_hooks};
    use crate::config::SimConfig;
    use crate::effect::{ActiveEffectStore, ConditionSpec, EffectDef, apply_effect, dispatch_trigger};
    use crate::entity::{Entity, Faction, Position};
    use crate::events::EventBus;
    use crate::movement::MovementStore;
    use crate::resource::ResourceStore;
    use crate::rng::SimRng;
    use crate::shield::ShieldStore;
    use crate::stats::StatModifierStore;
    use crate::targeting::TargetingStore;
    use std::sync::Arc;

    struct Fixture {
        arena: ComponentArena,
        stats: StatModifierStore,
        resources: ResourceStore,
        shields: ShieldStore,
        movement: MovementStore,
        actions: ActionStore,
        targeting: TargetingStore,
        active: ActiveEffectStore,
        rng: SimRng,
        events: EventBus,
        config: SimConfig,
        pipeline: DamagePipeline,
        registry: EffectRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            let mut pipeline = DamagePipeline::new();
            standard_hooks(&mut pipeline);
            let mut registry = EffectRegistry::new();
            standard_handlers(&mut registry);
            Self {
                arena: ComponentArena::new(),
                stats: StatModifierStore::new(),
                resources: ResourceStore::new(),
                shields: ShieldStore::new(),
                movement: MovementStore::new(),
                actions: ActionStore::new(),
                targeting: TargetingStore::new(),
                active: ActiveEffectStore::new(),
                rng: SimRng::new(11),
                events: EventBus::new(),
                config: SimConfig::default(),
                pipeline,
                registry,
            }
        }

        fn apply(&mut self, def: &EffectDef, source: Option<Entity>, target: Entity) -> bool {
            let mut deps = EffectDeps {
                arena: &mut self.arena,
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
            apply_effect(&self.registry, def, source, target, None, &mut deps)
        }

        fn sweep(&mut self, dt: f32) {
            let due = self.active.tick(dt);
            for trigger in &due {
                let mut deps = EffectDeps {
                    arena: &mut self.arena,
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
                dispatch_trigger(&self.registry, trigger, &mut deps);
            }
        }
    }

    #[test]
    fn stun_writes_timer_and_interrupts_the_cast() {
        let mut fx = Fixture::new();
        let caster = fx.arena.spawn(100.0, Position::default(), Faction(0));
        let def = Arc::new(
            ActionDefinition::new("bolt")
                .windup(1.0)
                .interrupted_by(InterruptCause::STUN),
        );
        fx.actions.start_action(caster, &def, None, 0).unwrap();

        let stun = EffectDef::new(EffectSpec::Stun { duration: 1.5 });
        assert!(fx.apply(&stun, None, caster));
        assert!(fx.arena.stun_timer[caster.index()] >= 1.5);

        let outcome = fx.actions.tick_action(caster, 0.05);
        assert!(outcome.interrupted.is_some());
    }

    #[test]
    fn tenacity_shortens_cc_durations() {
        let mut fx = Fixture::new();
        let target = fx.arena.spawn(100.0, Position::default(), Faction(1));
        fx.stats.add(
            target,
            StatKey::Tenacity,
            ModifierOp::Flat,
            0.5,
            -1.0,
            None,
            None,
        );

        fx.apply(&EffectDef::new(EffectSpec::Stun { duration: 2.0 }), None, target);
        assert!((fx.arena.stun_timer[target.index()] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn slow_refreshes_instead_of_stacking() {
        let mut fx = Fixture::new();
        let target = fx.arena.spawn(100.0, Position::default(), Faction(1));
        let slow = EffectDef::new(EffectSpec::Slow { duration: 2.0, power: 0.6 });

        fx.apply(&slow, None, target);
        fx.apply(&slow, None, target);

        let count = fx.stats.modifiers_for(target, StatKey::MoveSpeed).count();
        assert_eq!(count, 1);
        let speed = fx.stats.value(target, StatKey::MoveSpeed, 100.0);
        assert!((speed - 40.0).abs() < 1e-3);
        assert_eq!(fx.arena.slow_power[target.index()], 0.6);
    }

    #[test]
    fn dot_skips_the_apply_hit_and_lands_on_ticks() {
        let mut fx = Fixture::new();
        let target = fx.arena.spawn(100.0, Position::default(), Faction(1));
        let dot = EffectDef::new(EffectSpec::Damage {
            amount: 5.0,
            damage_type: DamageType::Magic,
            flags: DamageFlags::DOT,
        })
        .lingering(1.0)
        .every(0.5);

        assert!(fx.apply(&dot, None, target));
        assert_eq!(fx.arena.hp(target), Some(100.0));

        fx.sweep(0.5);
        assert_eq!(fx.arena.hp(target), Some(95.0));
        fx.sweep(0.5);
        assert_eq!(fx.arena.hp(target), Some(90.0));
        // Expired: no further ticks.
        fx.sweep(0.5);
        assert_eq!(fx.arena.hp(target), Some(90.0));
    }

    #[test]
    fn failing_condition_means_zero_side_effects() {
        let mut fx = Fixture::new();
        let target = fx.arena.spawn(100.0, Position::default(), Faction(1));
        let gated = EffectDef::new(EffectSpec::Damage {
            amount: 50.0,
            damage_type: DamageType::True,
            flags: DamageFlags::empty(),
        })
        .when(ConditionSpec::HpBelow { fraction: 0.2 });

        assert!(!fx.apply(&gated, None, target));
        assert_eq!(fx.arena.hp(target), Some(100.0));
    }

    #[test]
    fn knockback_pushes_away_from_the_source() {
        let mut fx = Fixture::new();
        let source = fx.arena.spawn(100.0, Position::new(0.0, 0.0), Faction(0));
        let target = fx.arena.spawn(100.0, Position::new(2.0, 0.0), Faction(1));

        let kb = EffectDef::new(EffectSpec::Knockback { distance: 3.0, speed: 20.0 });
        fx.apply(&kb, Some(source), target);

        let intent = fx.movement.current_intent(target).unwrap();
        assert_eq!(intent.kind, IntentKind::Knockback);
        assert!((intent.target.x - 5.0).abs() < 1e-5);
    }

    #[test]
    fn pull_is_capped_at_the_source_position() {
        let mut fx = Fixture::new();
        let source = fx.arena.spawn(100.0, Position::new(0.0, 0.0), Faction(0));
        let target = fx.arena.spawn(100.0, Position::new(2.0, 0.0), Faction(1));

        let pull = EffectDef::new(EffectSpec::Pull { distance: 10.0, speed: 30.0 });
        fx.apply(&pull, Some(source), target);

        let intent = fx.movement.current_intent(target).unwrap();
        assert!(intent.target.x.abs() < 1e-5);
    }

    #[test]
    fn mark_then_consume_round_trip() {
        let mut fx = Fixture::new();
        let target = fx.arena.spawn(100.0, Position::default(), Faction(1));

        fx.apply(
            &EffectDef::new(EffectSpec::ApplyMark { tag: "brand".into(), duration: 4.0 }),
            None,
            target,
        );
        assert!(fx.active.has_mark(target, "brand"));

        // A consuming effect gated on the mark fires and removes it.
        let detonate = EffectDef::new(EffectSpec::ConsumeMark { tag: "brand".into() })
            .when(ConditionSpec::TargetMarked { tag: "brand".into() });
        assert!(fx.apply(&detonate, None, target));
        assert!(!fx.active.has_mark(target, "brand"));
        assert!(!fx.apply(&detonate, None, target));
    }

    #[test]
    fn spawn_shield_routes_through_the_shield_store() {
        let mut fx = Fixture::new();
        let target = fx.arena.spawn(100.0, Position::default(), Faction(0));

        fx.apply(
            &EffectDef::new(EffectSpec::SpawnShield {
                amount: 40.0,
                absorbs: crate::shield::AbsorbKind::All,
                duration: -1.0,
                priority: 0,
            }),
            None,
            target,
        );
        assert_eq!(fx.shields.total(target, DamageType::Physical), 40.0);
    }
}

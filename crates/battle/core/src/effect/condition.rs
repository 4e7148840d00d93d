//! Effect gating conditions.
//!
//! Conditions are evaluated left to right with AND semantics; the first
//! failure cancels the effect before any handler runs. Missing data (stale
//! handles, no resource state, no triggering hit) evaluates to `false`,
//! never to an error.

use crate::arena::ComponentArena;
use crate::combat::{DamageContext, DamageFlags};
use crate::entity::Entity;
use crate::events::StatusKind;
use crate::resource::ResourceStore;
use crate::rng::SimRng;

use super::active::ActiveEffectStore;

#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionSpec {
    Always,
    /// Target HP fraction strictly below `fraction`.
    HpBelow { fraction: f32 },
    /// Target HP fraction strictly above `fraction`.
    HpAbove { fraction: f32 },
    /// Target missing-HP fraction strictly above `fraction`.
    HpMissingAbove { fraction: f32 },
    HasStatus { status: StatusKind },
    NoStatus { status: StatusKind },
    /// The triggering hit carries this annotation tag.
    HasTag { tag: String },
    /// The target carries an active mark with this tag.
    TargetMarked { tag: String },
    /// One draw from the shared RNG, below `probability`.
    Chance { probability: f32 },
    /// The triggering hit was a critical strike.
    OnCrit,
    /// The triggering hit killed its target.
    OnKill,
    SameFaction,
    OppositeFaction,
    /// The target's stack resource holds at least `count` stacks.
    StacksAtLeast { count: u32 },
}

impl ConditionSpec {
    #[allow(clippy::too_many_arguments)]
    pub fn eval(
        &self,
        source: Option<Entity>,
        target: Entity,
        arena: &ComponentArena,
        active: &ActiveEffectStore,
        resources: &ResourceStore,
        trigger: Option<&DamageContext>,
        rng: &mut SimRng,
    ) -> bool {
        match self {
            ConditionSpec::Always => true,
            ConditionSpec::HpBelow { fraction } => {
                hp_fraction(arena, target).is_some_and(|f| f < *fraction)
            }
            ConditionSpec::HpAbove { fraction } => {
                hp_fraction(arena, target).is_some_and(|f| f > *fraction)
            }
            ConditionSpec::HpMissingAbove { fraction } => {
                hp_fraction(arena, target).is_some_and(|f| 1.0 - f > *fraction)
            }
            ConditionSpec::HasStatus { status } => has_status(arena, target, *status),
            ConditionSpec::NoStatus { status } => {
                arena.is_alive(target) && !has_status(arena, target, *status)
            }
            ConditionSpec::HasTag { tag } => {
                trigger.is_some_and(|ctx| ctx.tags.contains(tag))
            }
            ConditionSpec::TargetMarked { tag } => active.has_mark(target, tag),
            ConditionSpec::Chance { probability } => rng.chance(*probability),
            ConditionSpec::OnCrit => {
                trigger.is_some_and(|ctx| ctx.flags.contains(DamageFlags::CRIT))
            }
            ConditionSpec::OnKill => trigger.is_some_and(|ctx| ctx.did_kill),
            ConditionSpec::SameFaction => factions(arena, source, target)
                .is_some_and(|(a, b)| a == b),
            ConditionSpec::OppositeFaction => factions(arena, source, target)
                .is_some_and(|(a, b)| a != b),
            ConditionSpec::StacksAtLeast { count } => resources
                .get(target)
                .is_some_and(|state| state.stacks >= *count),
        }
    }
}

fn hp_fraction(arena: &ComponentArena, entity: Entity) -> Option<f32> {
    let hp = arena.hp(entity)?;
    let hp_max = arena.hp_max(entity)?;
    if hp_max <= 0.0 {
        return None;
    }
    Some(hp / hp_max)
}

fn has_status(arena: &ComponentArena, entity: Entity, status: StatusKind) -> bool {
    if !arena.is_alive(entity) {
        return false;
    }
    let i = entity.index();
    let timer = match status {
        StatusKind::Stunned => arena.stun_timer.get(i),
        StatusKind::Slowed => arena.slow_timer.get(i),
        StatusKind::Buffed => arena.buff_timer.get(i),
    };
    timer.copied().unwrap_or(0.0) > 0.0
}

fn factions(
    arena: &ComponentArena,
    source: Option<Entity>,
    target: Entity,
) -> Option<(crate::entity::Faction, crate::entity::Faction)> {
    Some((arena.faction(source?)?, arena.faction(target)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Faction, Position};

    struct Fixture {
        arena: ComponentArena,
        active: ActiveEffectStore,
        resources: ResourceStore,
        rng: SimRng,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                arena: ComponentArena::new(),
                active: ActiveEffectStore::new(),
                resources: ResourceStore::new(),
                rng: SimRng::new(3),
            }
        }

        fn eval(&mut self, condition: &ConditionSpec, source: Option<Entity>, target: Entity) -> bool {
            condition.eval(
                source,
                target,
                &self.arena,
                &self.active,
                &self.resources,
                None,
                &mut self.rng,
            )
        }
    }

    #[test]
    fn hp_thresholds() {
        let mut fx = Fixture::new();
        let e = fx.arena.spawn(100.0, Position::default(), Faction(0));
        fx.arena.set_hp(e, 30.0);

        assert!(fx.eval(&ConditionSpec::HpBelow { fraction: 0.5 }, None, e));
        assert!(!fx.eval(&ConditionSpec::HpAbove { fraction: 0.5 }, None, e));
        assert!(fx.eval(&ConditionSpec::HpMissingAbove { fraction: 0.5 }, None, e));
    }

    #[test]
    fn missing_data_is_false_not_an_error() {
        let mut fx = Fixture::new();
        let stale = Entity(42);
        assert!(!fx.eval(&ConditionSpec::HpBelow { fraction: 1.0 }, None, stale));
        assert!(!fx.eval(&ConditionSpec::SameFaction, None, stale));
        assert!(!fx.eval(&ConditionSpec::StacksAtLeast { count: 1 }, None, stale));
        // NoStatus on a stale handle is also false: we cannot affirm anything
        // about an entity that does not resolve.
        assert!(!fx.eval(&ConditionSpec::NoStatus { status: StatusKind::Stunned }, None, stale));
    }

    #[test]
    fn status_checks_read_the_legacy_timers() {
        let mut fx = Fixture::new();
        let e = fx.arena.spawn(100.0, Position::default(), Faction(0));
        fx.arena.stun_timer[e.index()] = 1.0;

        assert!(fx.eval(&ConditionSpec::HasStatus { status: StatusKind::Stunned }, None, e));
        assert!(!fx.eval(&ConditionSpec::NoStatus { status: StatusKind::Stunned }, None, e));
        assert!(fx.eval(&ConditionSpec::NoStatus { status: StatusKind::Slowed }, None, e));
    }

    #[test]
    fn faction_match() {
        let mut fx = Fixture::new();
        let a = fx.arena.spawn(100.0, Position::default(), Faction(0));
        let b = fx.arena.spawn(100.0, Position::default(), Faction(1));
        let c = fx.arena.spawn(100.0, Position::default(), Faction(0));

        assert!(fx.eval(&ConditionSpec::OppositeFaction, Some(a), b));
        assert!(fx.eval(&ConditionSpec::SameFaction, Some(a), c));
        assert!(!fx.eval(&ConditionSpec::SameFaction, None, c));
    }

    #[test]
    fn trigger_context_conditions() {
        let mut fx = Fixture::new();
        let e = fx.arena.spawn(100.0, Position::default(), Faction(0));
        let mut ctx = crate::combat::DamageContext {
            source: None,
            target: e,
            base_amount: 10.0,
            amount: 10.0,
            damage_type: crate::combat::DamageType::Physical,
            flags: DamageFlags::CRIT,
            tags: std::collections::BTreeSet::new(),
            shield_absorbed: 0.0,
            previous_hp: 100.0,
            did_kill: false,
        };
        ctx.tags.insert("empowered".into());

        let eval = |fx: &mut Fixture, condition: &ConditionSpec, trigger: Option<&DamageContext>| {
            condition.eval(None, e, &fx.arena, &fx.active, &fx.resources, trigger, &mut fx.rng)
        };

        assert!(eval(&mut fx, &ConditionSpec::OnCrit, Some(&ctx)));
        assert!(!eval(&mut fx, &ConditionSpec::OnKill, Some(&ctx)));
        assert!(eval(&mut fx, &ConditionSpec::HasTag { tag: "empowered".into() }, Some(&ctx)));
        // No triggering hit at all: context conditions are false.
        assert!(!eval(&mut fx, &ConditionSpec::OnCrit, None));
    }

    #[test]
    fn chance_is_deterministic_per_seed() {
        let mut fx = Fixture::new();
        let e = fx.arena.spawn(100.0, Position::default(), Faction(0));
        let always = ConditionSpec::Chance { probability: 1.0 };
        let never = ConditionSpec::Chance { probability: 0.0 };
        assert!(fx.eval(&always, None, e));
        assert!(!fx.eval(&never, None, e));

        // Every evaluation consumes exactly one draw.
        let before = fx.rng.state();
        fx.eval(&never, None, e);
        assert_ne!(fx.rng.state(), before);
    }

    #[test]
    fn stacks_at_least_reads_the_resource_store() {
        let mut fx = Fixture::new();
        let e = fx.arena.spawn(100.0, Position::default(), Faction(0));
        fx.resources.init(e, crate::resource::ResourceState::stacks(5, 4.0, false));
        fx.resources.add_stacks(e, 3);

        assert!(fx.eval(&ConditionSpec::StacksAtLeast { count: 3 }, None, e));
        assert!(!fx.eval(&ConditionSpec::StacksAtLeast { count: 4 }, None, e));
    }
}

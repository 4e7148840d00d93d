//! Data-described gameplay effects.
//!
//! An [`EffectDef`] is a closed [`EffectSpec`] payload plus a condition
//! list. [`apply_effect`] evaluates the conditions with AND semantics (any
//! failure cancels the effect with zero side effects), then dispatches the
//! spec by kind to every handler registered for the `OnApply` stage.
//!
//! Effects that linger (`duration != 0` on the definition) are also parked
//! in the [`ActiveEffectStore`]; a separate sweep counts them down and
//! re-dispatches the same spec at `OnTick` / `OnExpire`, decoupled from the
//! one-shot apply call that created them.

mod active;
mod condition;
mod handlers;
mod registry;

pub use active::{ActiveEffect, ActiveEffectStore, EffectTrigger};
pub use condition::ConditionSpec;
pub use handlers::standard_handlers;
pub use registry::{EffectHandler, EffectRegistry};

use crate::action::ActionStore;
use crate::arena::ComponentArena;
use crate::combat::{DamageContext, DamageFlags, DamagePipeline, DamageType};
use crate::config::SimConfig;
use crate::entity::Entity;
use crate::events::EventBus;
use crate::movement::MovementStore;
use crate::resource::ResourceStore;
use crate::rng::SimRng;
use crate::shield::{AbsorbKind, ShieldStore};
use crate::stats::{ModifierOp, StatKey, StatModifierStore};
use crate::targeting::TargetingStore;

/// The closed set of effect payloads.
#[derive(Clone, Debug, PartialEq)]
#[derive(strum::EnumDiscriminants)]
#[strum_discriminants(name(EffectKind))]
#[strum_discriminants(derive(PartialOrd, Ord, Hash, strum::Display, strum::AsRefStr))]
#[strum_discriminants(strum(serialize_all = "snake_case"))]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectSpec {
    Damage {
        amount: f32,
        damage_type: DamageType,
        flags: DamageFlags,
    },
    Heal {
        amount: f32,
    },
    Stun {
        duration: f32,
    },
    Slow {
        duration: f32,
        /// Move-speed loss fraction in `[0, 1]`.
        power: f32,
    },
    Buff {
        duration: f32,
        stat: StatKey,
        op: ModifierOp,
        value: f32,
        /// Refresh-instead-of-stack tag.
        tag: Option<String>,
    },
    RestoreResource {
        amount: f32,
    },
    DrainResource {
        amount: f32,
    },
    AddStacks {
        count: u32,
    },
    Knockback {
        distance: f32,
        speed: f32,
    },
    Pull {
        distance: f32,
        speed: f32,
    },
    Dash {
        distance: f32,
        speed: f32,
    },
    Blink,
    ApplyMark {
        tag: String,
        duration: f32,
    },
    ConsumeMark {
        tag: String,
    },
    ConsumeStacks {
        tag: String,
        count: u32,
    },
    SpawnShield {
        amount: f32,
        absorbs: AbsorbKind,
        duration: f32,
        priority: i32,
    },
}

/// Lifecycle stage a handler is registered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum EffectStage {
    OnApply,
    OnTick,
    OnExpire,
}

/// One effect with its gating conditions and lingering parameters.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct EffectDef {
    pub spec: EffectSpec,
    #[serde(default)]
    pub conditions: Vec<ConditionSpec>,
    /// Lingering duration in seconds. Zero (the default) is an instant
    /// one-shot; negative lingers until explicitly consumed.
    #[serde(default)]
    pub duration: f32,
    /// Re-dispatch interval for lingering effects; zero or less disables
    /// the periodic `OnTick` trigger.
    #[serde(default)]
    pub period: f32,
}

impl EffectDef {
    pub fn new(spec: EffectSpec) -> Self {
        Self {
            spec,
            conditions: Vec::new(),
            duration: 0.0,
            period: 0.0,
        }
    }

    pub fn when(mut self, condition: ConditionSpec) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Park the effect in the active store for `seconds` after applying.
    pub fn lingering(mut self, seconds: f32) -> Self {
        self.duration = seconds;
        self
    }

    /// Re-dispatch the spec at `OnTick` every `seconds` while lingering.
    pub fn every(mut self, seconds: f32) -> Self {
        self.period = seconds;
        self
    }
}

/// One dispatch of a spec to the handlers of a stage.
#[derive(Clone, Debug)]
pub struct EffectInvocation {
    pub source: Option<Entity>,
    pub target: Entity,
    pub spec: EffectSpec,
    pub stage: EffectStage,
}

/// Everything a handler may touch. The world splits these borrows off its
/// fields; handlers that need the damage/heal pipeline reborrow the subset
/// [`PipelineDeps`](crate::combat::PipelineDeps) wants.
pub struct EffectDeps<'a> {
    pub arena: &'a mut ComponentArena,
    pub stats: &'a mut StatModifierStore,
    pub resources: &'a mut ResourceStore,
    pub shields: &'a mut ShieldStore,
    pub movement: &'a mut MovementStore,
    pub actions: &'a mut ActionStore,
    pub targeting: &'a mut TargetingStore,
    pub active: &'a mut ActiveEffectStore,
    pub rng: &'a mut SimRng,
    pub events: &'a mut EventBus,
    pub config: &'a SimConfig,
    pub pipeline: &'a DamagePipeline,
}

/// Evaluate conditions, dispatch `OnApply` handlers, and park lingering
/// effects. Returns whether the effect actually applied.
pub fn apply_effect(
    registry: &EffectRegistry,
    def: &EffectDef,
    source: Option<Entity>,
    target: Entity,
    trigger: Option<&DamageContext>,
    deps: &mut EffectDeps<'_>,
) -> bool {
    if !deps.arena.is_alive(target) {
        return false;
    }
    let passed = def.conditions.iter().all(|condition| {
        condition.eval(
            source,
            target,
            deps.arena,
            deps.active,
            deps.resources,
            trigger,
            deps.rng,
        )
    });
    if !passed {
        tracing::trace!(?source, %target, kind = %EffectKind::from(&def.spec), "effect gated off");
        return false;
    }

    let invocation = EffectInvocation {
        source,
        target,
        spec: def.spec.clone(),
        stage: EffectStage::OnApply,
    };
    registry.dispatch(&invocation, deps);

    if def.duration != 0.0 {
        deps.active
            .add(target, ActiveEffect::new(def.spec.clone(), def.duration).with_period(def.period).with_source(source));
    }
    true
}

/// Re-dispatch a trigger produced by the active-effect sweep.
pub fn dispatch_trigger(
    registry: &EffectRegistry,
    trigger: &EffectTrigger,
    deps: &mut EffectDeps<'_>,
) {
    let invocation = EffectInvocation {
        source: trigger.source,
        target: trigger.entity,
        spec: trigger.spec.clone(),
        stage: trigger.stage,
    };
    registry.dispatch(&invocation, deps);
}

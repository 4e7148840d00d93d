//! Deterministic combat-simulation core for the two-faction lane battler.
//!
//! `battle-core` defines the canonical combat rules (casts, damage, effects,
//! movement, targeting) as pure tick-driven logic with no rendering or I/O.
//! All mutation flows through [`world::SimWorld`] and the per-tick systems in
//! [`systems`]; given the same seed and the same command stream, two runs
//! produce bit-identical [`replay::Snapshot`] hashes.
pub mod action;
pub mod arena;
pub mod clock;
pub mod combat;
pub mod config;
pub mod effect;
pub mod entity;
pub mod error;
pub mod events;
pub mod movement;
pub mod replay;
pub mod resource;
pub mod rng;
pub mod shield;
pub mod stats;
pub mod systems;
pub mod targeting;
pub mod world;
pub use action::{
    AbilityFlags, ActionDefinition, ActionInstance, ActionStore, CastState, InterruptCause,
    ReleasedCast, StartOutcome, TickOutcome,
};
pub use arena::ComponentArena;
pub use clock::FixedClock;
pub use combat::{
    DamageContext, DamageFlags, DamagePipeline, DamageStage, DamageType, HealContext, HealStage,
    PipelineDeps,
};
pub use config::SimConfig;
pub use effect::{
    ActiveEffect, ActiveEffectStore, ConditionSpec, EffectDef, EffectDeps, EffectKind,
    EffectRegistry, EffectSpec, EffectStage, EffectTrigger,
};
pub use entity::{Entity, Faction, Position};
pub use error::{IneligibleReason, ReplayError, StartFailure};
pub use events::{
    CastPhase, EventBus, EventKind, GameStateKind, LifecycleKind, SimEvent, StatusKind,
    Subscription,
};
pub use movement::{IntentKind, MoveFlags, MoveTickResult, MovementIntent, MovementStore};
pub use replay::{Command, ReplayConfig, ReplayLog, Snapshot, TimedCommand, VerifyOutcome};
pub use resource::{ResourceKind, ResourceState, ResourceStore, SpendResult};
pub use rng::SimRng;
pub use shield::{AbsorbKind, AbsorbOutcome, Shield, ShieldStore};
pub use stats::{ModifierOp, StatBreakdown, StatKey, StatModifier, StatModifierStore};
pub use systems::{Simulation, TickContext};
pub use targeting::{
    InteractionKind, RevealFlags, RevealSource, TargetFlags, TargetQuery, TargetingStore,
};
pub use world::SimWorld;

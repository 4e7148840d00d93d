//! Immutable action definitions.

use bitflags::bitflags;

use crate::effect::EffectDef;

bitflags! {
    /// Crowd-control categories that can cancel an in-progress action.
    ///
    /// The same bits double as an entity's current CC state for the
    /// [`can_cast`](crate::action::ActionStore::can_cast) guard.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    #[derive(serde::Serialize, serde::Deserialize)]
    pub struct InterruptCause: u16 {
        const STUN    = 1 << 0;
        const SILENCE = 1 << 1;
        const DISARM  = 1 << 2;
        const ROOT    = 1 << 3;
        const GROUND  = 1 << 4;
        const KNOCKUP = 1 << 5;
        const DEATH   = 1 << 6;
    }
}

impl InterruptCause {
    /// Hard CC blocks every ability regardless of its flags.
    pub const HARD_CC: InterruptCause = InterruptCause::STUN
        .union(InterruptCause::KNOCKUP)
        .union(InterruptCause::DEATH);
}

bitflags! {
    /// Ability classification flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    #[derive(serde::Serialize, serde::Deserialize)]
    pub struct AbilityFlags: u16 {
        /// Can never be interrupted, whatever the cause mask says.
        const UNSTOPPABLE = 1 << 0;
        /// Counts as a spell (blocked by silence, stopped by spell immunity).
        const SPELL       = 1 << 1;
        /// Counts as an attack (blocked by disarm).
        const ATTACK      = 1 << 2;
        /// Counts as a mobility ability (blocked by ground).
        const MOBILITY    = 1 << 3;
    }
}

/// Immutable data describing one ability.
///
/// Definitions are shared behind `Arc` between the content layer, live cast
/// instances and the replay command resolver; the store never mutates them.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ActionDefinition {
    pub id: String,
    pub windup: f32,
    pub channel: f32,
    pub recovery: f32,
    pub cooldown: f32,
    /// Causes that cancel this action while it is in progress.
    pub interrupted_by: InterruptCause,
    pub flags: AbilityFlags,
    /// Cost in the caster's own resource kind.
    pub cost: f32,
    /// Effects applied, in order, when the cast releases.
    pub effects: Vec<EffectDef>,
}

impl ActionDefinition {
    /// Minimal definition with every duration zeroed. Builder methods fill
    /// in the rest; content loaders deserialize the full struct instead.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            windup: 0.0,
            channel: 0.0,
            recovery: 0.0,
            cooldown: 0.0,
            interrupted_by: InterruptCause::empty(),
            flags: AbilityFlags::empty(),
            cost: 0.0,
            effects: Vec::new(),
        }
    }

    pub fn windup(mut self, seconds: f32) -> Self {
        self.windup = seconds;
        self
    }

    pub fn channel(mut self, seconds: f32) -> Self {
        self.channel = seconds;
        self
    }

    pub fn recovery(mut self, seconds: f32) -> Self {
        self.recovery = seconds;
        self
    }

    pub fn cooldown(mut self, seconds: f32) -> Self {
        self.cooldown = seconds;
        self
    }

    pub fn interrupted_by(mut self, causes: InterruptCause) -> Self {
        self.interrupted_by = causes;
        self
    }

    pub fn flags(mut self, flags: AbilityFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn cost(mut self, cost: f32) -> Self {
        self.cost = cost;
        self
    }

    pub fn effect(mut self, effect: EffectDef) -> Self {
        self.effects.push(effect);
        self
    }
}

//! Damage and heal resolution.
//!
//! All health changes funnel through [`DamagePipeline`]: a fixed-stage hook
//! chain (`PreMitigation → Mitigation → apply → PostDamage → OnKill`, and
//! `PreHeal → apply → PostHeal` for healing). The standard combat rules,
//! crit, execute scaling, resist curves, flat reduction, shields, lifesteal
//! and anti-heal, are all ordinary hooks installed by [`standard_hooks`];
//! game-specific mechanics register alongside them.

mod hooks;
mod pipeline;

pub use hooks::standard_hooks;
pub use pipeline::{
    DamageContext, DamageHook, DamagePipeline, DamageStage, HealContext, HealHook, HealStage,
    PipelineDeps,
};

use bitflags::bitflags;

/// How a hit interacts with mitigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::EnumString, strum::AsRefStr)]
#[derive(serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DamageType {
    /// Reduced by armor, absorbed by shields.
    Physical,
    /// Reduced by magic resist, absorbed by shields.
    Magic,
    /// Ignores resists and flat reduction; still absorbed by shields.
    True,
    /// Ignores everything, including shields.
    Pure,
}

bitflags! {
    /// Properties of a single damage instance.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    #[derive(serde::Serialize, serde::Deserialize)]
    pub struct DamageFlags: u16 {
        /// Originates from a basic attack; enables lifesteal.
        const ATTACK   = 1 << 0;
        /// Originates from an ability.
        const SPELL    = 1 << 1;
        /// Eligible for the critical strike roll.
        const CAN_CRIT = 1 << 2;
        /// Set by the crit hook when the roll succeeds.
        const CRIT     = 1 << 3;
        /// Periodic tick; never crits.
        const DOT      = 1 << 4;
        /// Scales up against missing health.
        const EXECUTE  = 1 << 5;
        /// Part of an area hit.
        const AOE      = 1 << 6;
    }
}

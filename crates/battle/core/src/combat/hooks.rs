//! The standard combat rule set, expressed as pipeline hooks.
//!
//! Installation order within each stage is the rule order:
//!
//! - PreMitigation: crit roll, execute scaling
//! - Mitigation: resist curve, flat reduction, shield absorption
//! - PostDamage: lifesteal / omnivamp
//! - OnKill: death event
//! - PreHeal: heal-power amplification, grievous wounds
//!
//! Resists and penetration come off the stat store with a base of zero;
//! champions carry their base armor as permanent flat modifiers, so the
//! hooks never need a second stat source.

use super::pipeline::{DamagePipeline, DamageStage, HealStage, PipelineDeps};
use super::{DamageFlags, DamageType};
use crate::events::SimEvent;
use crate::stats::StatKey;

/// Install the standard rules on a fresh pipeline.
pub fn standard_hooks(pipeline: &mut DamagePipeline) {
    pipeline.register(DamageStage::PreMitigation, Box::new(crit_roll));
    pipeline.register(DamageStage::PreMitigation, Box::new(execute_scaling));
    pipeline.register(DamageStage::Mitigation, Box::new(resist_curve));
    pipeline.register(DamageStage::Mitigation, Box::new(flat_reduction));
    pipeline.register(DamageStage::Mitigation, Box::new(shield_absorption));
    pipeline.register(DamageStage::PostDamage, Box::new(lifesteal));
    pipeline.register(DamageStage::OnKill, Box::new(death_event));
    pipeline.register_heal(HealStage::PreHeal, Box::new(heal_power));
    pipeline.register_heal(HealStage::PreHeal, Box::new(grievous_wounds));
}

/// One RNG draw per crit-eligible hit, even at 0% chance, so crit items
/// never shift the random stream.
fn crit_roll(
    _pipeline: &DamagePipeline,
    ctx: &mut super::DamageContext,
    deps: &mut PipelineDeps<'_>,
) {
    if !ctx.flags.contains(DamageFlags::CAN_CRIT) || ctx.flags.contains(DamageFlags::DOT) {
        return;
    }
    let Some(source) = ctx.source else {
        return;
    };
    let chance = deps.stats.value(source, StatKey::CritChance, 0.0);
    if deps.rng.chance(chance) {
        let multiplier =
            deps.stats
                .value(source, StatKey::CritMultiplier, deps.config.base_crit_multiplier);
        ctx.amount *= multiplier;
        ctx.flags |= DamageFlags::CRIT;
    }
}

/// `amount × (1 + missing_fraction × execute_scaling)`.
fn execute_scaling(
    _pipeline: &DamagePipeline,
    ctx: &mut super::DamageContext,
    deps: &mut PipelineDeps<'_>,
) {
    if !ctx.flags.contains(DamageFlags::EXECUTE) {
        return;
    }
    let (Some(hp), Some(hp_max)) = (deps.arena.hp(ctx.target), deps.arena.hp_max(ctx.target))
    else {
        return;
    };
    if hp_max <= 0.0 {
        return;
    }
    let missing = (1.0 - hp / hp_max).clamp(0.0, 1.0);
    ctx.amount *= 1.0 + missing * deps.config.execute_scaling;
}

/// The armor/magic-resist curve, with penetration applied source-side.
///
/// Positive resist: `amount × k / (k + resist)` where `k` is the armor
/// constant. Negative resist amplifies: `amount × (2 − k / (k − resist))`.
/// Percent penetration is applied before flat, and penetration never takes
/// a positive resist below zero.
fn resist_curve(
    _pipeline: &DamagePipeline,
    ctx: &mut super::DamageContext,
    deps: &mut PipelineDeps<'_>,
) {
    let (resist_key, pen_flat_key, pen_pct_key) = match ctx.damage_type {
        DamageType::Physical => (StatKey::Armor, StatKey::ArmorPenFlat, StatKey::ArmorPenPercent),
        DamageType::Magic => (StatKey::MagicResist, StatKey::MagicPenFlat, StatKey::MagicPenPercent),
        DamageType::True | DamageType::Pure => return,
    };

    let mut resist = deps.stats.value(ctx.target, resist_key, 0.0);
    if resist > 0.0 {
        if let Some(source) = ctx.source {
            let pct = deps.stats.value(source, pen_pct_key, 0.0).clamp(0.0, 1.0);
            resist *= 1.0 - pct;
            resist -= deps.stats.value(source, pen_flat_key, 0.0);
            resist = resist.max(0.0);
        }
    }

    let k = deps.config.armor_constant;
    let multiplier = if resist >= 0.0 {
        k / (k + resist)
    } else {
        2.0 - k / (k - resist)
    };
    ctx.amount *= multiplier;
}

/// Post-curve flat reduction, floored at zero. True and pure skip it.
fn flat_reduction(
    _pipeline: &DamagePipeline,
    ctx: &mut super::DamageContext,
    deps: &mut PipelineDeps<'_>,
) {
    if matches!(ctx.damage_type, DamageType::True | DamageType::Pure) {
        return;
    }
    let reduction = deps.stats.value(ctx.target, StatKey::FlatReduction, 0.0);
    if reduction > 0.0 {
        ctx.amount = (ctx.amount - reduction).max(0.0);
    }
}

/// Shields soak fully mitigated damage, so this runs last in the stage.
fn shield_absorption(
    _pipeline: &DamagePipeline,
    ctx: &mut super::DamageContext,
    deps: &mut PipelineDeps<'_>,
) {
    if ctx.damage_type == DamageType::Pure || ctx.amount <= 0.0 {
        return;
    }
    let outcome = deps.shields.absorb(ctx.target, ctx.amount, ctx.damage_type);
    if outcome.absorbed > 0.0 {
        ctx.shield_absorbed += outcome.absorbed;
        ctx.amount = outcome.remaining;
        deps.events.emit(SimEvent::Shield {
            target: ctx.target,
            absorbed: outcome.absorbed,
            broken: !outcome.broken.is_empty(),
        });
    }
}

/// Lifesteal (attacks only) plus omnivamp (everything), healing the source
/// through the full heal pipeline so anti-heal applies. Counts shield
/// absorption as damage dealt.
fn lifesteal(
    pipeline: &DamagePipeline,
    ctx: &mut super::DamageContext,
    deps: &mut PipelineDeps<'_>,
) {
    let Some(source) = ctx.source else {
        return;
    };
    let dealt = ctx.amount + ctx.shield_absorbed;
    if dealt <= 0.0 {
        return;
    }
    let mut fraction = deps.stats.value(source, StatKey::Omnivamp, 0.0);
    if ctx.flags.contains(DamageFlags::ATTACK) {
        fraction += deps.stats.value(source, StatKey::Lifesteal, 0.0);
    }
    if fraction > 0.0 {
        pipeline.apply_heal_tagged(deps, Some(source), source, dealt * fraction, &["lifesteal"]);
    }
}

fn death_event(
    _pipeline: &DamagePipeline,
    ctx: &mut super::DamageContext,
    deps: &mut PipelineDeps<'_>,
) {
    deps.events.emit_death(ctx.target);
}

/// Source-side healing amplification: `amount × (1 + heal_power)`.
fn heal_power(
    _pipeline: &DamagePipeline,
    ctx: &mut super::HealContext,
    deps: &mut PipelineDeps<'_>,
) {
    let Some(source) = ctx.source else {
        return;
    };
    let amp = deps.stats.value(source, StatKey::HealPower, 0.0);
    if amp != 0.0 {
        ctx.amount *= 1.0 + amp;
    }
}

/// Target-side anti-heal: `amount × (1 − grievous_wounds)`, clamped to
/// `[0, 1]` so stacked sources cannot turn heals into damage.
fn grievous_wounds(
    _pipeline: &DamagePipeline,
    ctx: &mut super::HealContext,
    deps: &mut PipelineDeps<'_>,
) {
    let severity = deps.stats.value(ctx.target, StatKey::GrievousWounds, 0.0).clamp(0.0, 1.0);
    if severity > 0.0 {
        ctx.amount *= 1.0 - severity;
    }
}

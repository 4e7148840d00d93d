//! Timed stat modifiers and on-demand stat calculation.
//!
//! Effective stat values are never cached. The live modifier list is the
//! single source of truth and [`StatModifierStore::calculate`] recomputes
//! from it on every call:
//!
//! ```text
//! final = (base + Σflat) × (1 + Σpercent_add) × Π percent_mult
//! ```
//!
//! Handlers conventionally tag modifiers by mechanic name (for example
//! `"slow_generic"`) and remove-by-tag before re-adding, so repeated
//! application of the same debuff refreshes instead of stacking duplicates.

use std::collections::BTreeMap;

use crate::entity::Entity;

/// Named stats the combat core computes. Base values come from the caller;
/// the store only holds adjustments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(strum::Display, strum::EnumString, strum::AsRefStr)]
#[derive(serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StatKey {
    Armor,
    MagicResist,
    AttackDamage,
    AbilityPower,
    AttackSpeed,
    MoveSpeed,
    CritChance,
    CritMultiplier,
    Lifesteal,
    Omnivamp,
    HealPower,
    GrievousWounds,
    FlatReduction,
    ArmorPenFlat,
    ArmorPenPercent,
    MagicPenFlat,
    MagicPenPercent,
    Tenacity,
}

/// How a modifier combines with the base value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[derive(strum::Display, strum::AsRefStr)]
#[derive(serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum ModifierOp {
    /// Added to the base before any percentages.
    Flat,
    /// Summed with other percent-add modifiers, then applied once.
    PercentAdd,
    /// Multiplied in sequentially.
    PercentMult,
}

/// A single timed adjustment to one stat.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct StatModifier {
    pub id: u64,
    pub stat: StatKey,
    pub op: ModifierOp,
    pub value: f32,
    /// Entity that applied the modifier, when known.
    pub source: Option<Entity>,
    /// Remaining seconds; negative means permanent.
    pub remaining: f32,
    /// Mechanic tag used for refresh-instead-of-stack semantics.
    pub tag: Option<String>,
}

/// Breakdown returned by [`StatModifierStore::calculate`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatBreakdown {
    pub base: f32,
    pub flat: f32,
    pub percent_add: f32,
    pub percent_mult: f32,
    pub value: f32,
}

/// Per-entity modifier lists.
#[derive(Debug, Default)]
pub struct StatModifierStore {
    modifiers: BTreeMap<Entity, Vec<StatModifier>>,
    next_id: u64,
}

impl StatModifierStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a modifier and return its id.
    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &mut self,
        entity: Entity,
        stat: StatKey,
        op: ModifierOp,
        value: f32,
        duration: f32,
        source: Option<Entity>,
        tag: Option<String>,
    ) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.modifiers.entry(entity).or_default().push(StatModifier {
            id,
            stat,
            op,
            value,
            source,
            remaining: duration,
            tag,
        });
        id
    }

    /// Remove one modifier by id. Returns whether anything was removed.
    pub fn remove(&mut self, entity: Entity, id: u64) -> bool {
        let Some(list) = self.modifiers.get_mut(&entity) else {
            return false;
        };
        let before = list.len();
        list.retain(|m| m.id != id);
        before != list.len()
    }

    /// Remove every modifier carrying the given tag.
    pub fn remove_by_tag(&mut self, entity: Entity, tag: &str) -> usize {
        let Some(list) = self.modifiers.get_mut(&entity) else {
            return 0;
        };
        let before = list.len();
        list.retain(|m| m.tag.as_deref() != Some(tag));
        before - list.len()
    }

    /// Remove every modifier applied by the given source entity.
    pub fn remove_by_source(&mut self, entity: Entity, source: Entity) -> usize {
        let Some(list) = self.modifiers.get_mut(&entity) else {
            return 0;
        };
        let before = list.len();
        list.retain(|m| m.source != Some(source));
        before - list.len()
    }

    /// Modifiers currently affecting one stat of one entity.
    pub fn modifiers_for(&self, entity: Entity, stat: StatKey) -> impl Iterator<Item = &StatModifier> {
        self.modifiers
            .get(&entity)
            .into_iter()
            .flatten()
            .filter(move |m| m.stat == stat)
    }

    /// Fold every matching modifier over `base` and return the breakdown.
    ///
    /// This is a pure read with no caching; callers on hot inner loops must
    /// amortize it themselves.
    pub fn calculate(&self, entity: Entity, stat: StatKey, base: f32) -> StatBreakdown {
        let mut flat = 0.0f32;
        let mut percent_add = 0.0f32;
        let mut percent_mult = 1.0f32;

        for modifier in self.modifiers_for(entity, stat) {
            match modifier.op {
                ModifierOp::Flat => flat += modifier.value,
                ModifierOp::PercentAdd => percent_add += modifier.value,
                ModifierOp::PercentMult => percent_mult *= modifier.value,
            }
        }

        let value = (base + flat) * (1.0 + percent_add) * percent_mult;
        StatBreakdown {
            base,
            flat,
            percent_add,
            percent_mult,
            value,
        }
    }

    /// Convenience wrapper returning only the final value.
    pub fn value(&self, entity: Entity, stat: StatKey, base: f32) -> f32 {
        self.calculate(entity, stat, base).value
    }

    /// Count down every timed modifier, removing the ones that expire.
    /// Permanent modifiers (negative duration) are never auto-removed.
    pub fn tick(&mut self, dt: f32) {
        for list in self.modifiers.values_mut() {
            for modifier in list.iter_mut() {
                if modifier.remaining >= 0.0 {
                    modifier.remaining = (modifier.remaining - dt).max(0.0);
                }
            }
            // Expired timed modifiers sit at exactly 0.0; permanents stay
            // negative forever.
            list.retain(|m| m.remaining != 0.0);
        }
        self.modifiers.retain(|_, list| !list.is_empty());
    }

    pub fn clear_entity(&mut self, entity: Entity) {
        self.modifiers.remove(&entity);
    }

    pub fn clear(&mut self) {
        self.modifiers.clear();
    }
}

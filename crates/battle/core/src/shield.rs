//! Damage absorption shields.
//!
//! Shields on one entity are kept priority-sorted (descending) at insertion
//! time so consumption order is always correct without re-sorting per hit.
//! Absorption runs as a mitigation-stage pipeline hook: shields soak
//! post-armor damage, not raw damage.

use std::collections::BTreeMap;

use crate::combat::DamageType;
use crate::entity::Entity;

/// Which damage types a shield absorbs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::AsRefStr)]
#[derive(serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum AbsorbKind {
    All,
    Physical,
    Magic,
}

impl AbsorbKind {
    /// Whether a shield of this kind soaks the given damage type. Pure
    /// damage is never shielded; the pipeline does not route it here.
    pub fn matches(self, damage_type: DamageType) -> bool {
        match self {
            AbsorbKind::All => true,
            AbsorbKind::Physical => damage_type == DamageType::Physical,
            AbsorbKind::Magic => damage_type == DamageType::Magic,
        }
    }
}

/// One absorption pool.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Shield {
    pub id: u64,
    pub amount: f32,
    pub max_amount: f32,
    pub absorbs: AbsorbKind,
    pub source: Option<Entity>,
    /// Remaining seconds; negative means the shield lasts until consumed.
    pub remaining: f32,
    /// Higher priority shields are consumed first.
    pub priority: i32,
}

/// Outcome of one absorption pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AbsorbOutcome {
    /// Damage soaked by shields.
    pub absorbed: f32,
    /// Damage left over for HP.
    pub remaining: f32,
    /// Ids of shields that were fully consumed by this hit.
    pub broken: Vec<u64>,
}

/// Per-entity priority-ordered shield lists.
#[derive(Debug, Default)]
pub struct ShieldStore {
    shields: BTreeMap<Entity, Vec<Shield>>,
    next_id: u64,
}

impl ShieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a shield, inserting at its priority position, and return its id.
    pub fn add(
        &mut self,
        entity: Entity,
        amount: f32,
        absorbs: AbsorbKind,
        duration: f32,
        priority: i32,
        source: Option<Entity>,
    ) -> u64 {
        self.next_id += 1;
        let shield = Shield {
            id: self.next_id,
            amount,
            max_amount: amount,
            absorbs,
            source,
            remaining: duration,
            priority,
        };
        let list = self.shields.entry(entity).or_default();
        // Descending priority; equal priorities keep insertion order.
        let at = list
            .iter()
            .position(|s| s.priority < priority)
            .unwrap_or(list.len());
        list.insert(at, shield);
        self.next_id
    }

    /// Walk the priority-sorted list consuming matching shields until the
    /// damage is exhausted or shields run out.
    pub fn absorb(&mut self, entity: Entity, amount: f32, damage_type: DamageType) -> AbsorbOutcome {
        let mut outcome = AbsorbOutcome {
            absorbed: 0.0,
            remaining: amount,
            broken: Vec::new(),
        };
        let Some(list) = self.shields.get_mut(&entity) else {
            return outcome;
        };

        for shield in list.iter_mut() {
            if outcome.remaining <= 0.0 {
                break;
            }
            if !shield.absorbs.matches(damage_type) {
                continue;
            }
            let soaked = shield.amount.min(outcome.remaining);
            shield.amount -= soaked;
            outcome.absorbed += soaked;
            outcome.remaining -= soaked;
            if shield.amount <= 0.0 {
                outcome.broken.push(shield.id);
            }
        }

        list.retain(|s| s.amount > 0.0);
        if list.is_empty() {
            self.shields.remove(&entity);
        }
        outcome
    }

    /// Total shielding against a damage type.
    pub fn total(&self, entity: Entity, damage_type: DamageType) -> f32 {
        self.shields
            .get(&entity)
            .into_iter()
            .flatten()
            .filter(|s| s.absorbs.matches(damage_type))
            .map(|s| s.amount)
            .sum()
    }

    pub fn shields_for(&self, entity: Entity) -> &[Shield] {
        self.shields.get(&entity).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Count down timed shields and drop the expired ones. Expiry is not a
    /// break; the returned pairs let the caller emit distinct events.
    pub fn tick(&mut self, dt: f32) -> Vec<(Entity, u64)> {
        let mut expired = Vec::new();
        for (&entity, list) in self.shields.iter_mut() {
            for shield in list.iter_mut() {
                if shield.remaining >= 0.0 {
                    shield.remaining = (shield.remaining - dt).max(0.0);
                    if shield.remaining == 0.0 {
                        expired.push((entity, shield.id));
                    }
                }
            }
            list.retain(|s| s.remaining != 0.0);
        }
        self.shields.retain(|_, list| !list.is_empty());
        expired
    }

    pub fn clear_entity(&mut self, entity: Entity) {
        self.shields.remove(&entity);
    }

    pub fn clear(&mut self) {
        self.shields.clear();
    }
}

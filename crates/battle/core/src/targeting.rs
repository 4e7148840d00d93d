//! Targeting eligibility and visibility.
//!
//! Eligibility is a short-circuit chain: alive → targetable → immunity →
//! vision → range → faction. The first failing check reports its reason and
//! the rest are never evaluated.
//!
//! Hidden entities (invisible or camouflaged) are only eligible for
//! vision-requiring interactions when a live reveal source in radius pierces
//! their hidden kind, or the entity carries the `REVEALED` override flag.

use std::collections::BTreeMap;

use bitflags::bitflags;

use crate::arena::ComponentArena;
use crate::entity::{Entity, Position};
use crate::error::IneligibleReason;

bitflags! {
    /// Per-entity targeting state.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    #[derive(serde::Serialize, serde::Deserialize)]
    pub struct TargetFlags: u16 {
        const UNTARGETABLE  = 1 << 0;
        const INVULNERABLE  = 1 << 1;
        const INVISIBLE     = 1 << 2;
        const CAMOUFLAGED   = 1 << 3;
        /// Overrides both hidden states without consulting reveal sources.
        const REVEALED      = 1 << 4;
        /// Ignores unit collision radius inflation on attack range checks.
        const GHOST         = 1 << 5;
        const SPELL_IMMUNE  = 1 << 6;
        const ATTACK_IMMUNE = 1 << 7;
    }
}

bitflags! {
    /// Which hidden states a reveal source pierces.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    #[derive(serde::Serialize, serde::Deserialize)]
    pub struct RevealFlags: u8 {
        const INVISIBLE   = 1 << 0;
        const CAMOUFLAGED = 1 << 1;
    }
}

/// Interaction kind, for immunity and vision rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[derive(strum::Display, strum::AsRefStr)]
#[derive(serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum InteractionKind {
    Attack,
    Spell,
    /// Generic effect application; bypasses spell/attack immunity.
    Effect,
}

/// A temporary area that strips hidden states for eligibility checks.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct RevealSource {
    pub id: u64,
    pub position: Position,
    pub radius: f32,
    pub pierces: RevealFlags,
    /// Remaining seconds; negative means the source never expires.
    pub remaining: f32,
}

/// One eligibility question. Collision inflation is the sum of source and
/// target collision radii, supplied by the caller for attack range checks.
#[derive(Clone, Copy, Debug)]
pub struct TargetQuery {
    pub source: Entity,
    pub target: Entity,
    pub interaction: InteractionKind,
    pub range: f32,
    pub requires_vision: bool,
    pub ignore_faction: bool,
    pub collision_bonus: f32,
}

impl TargetQuery {
    pub fn new(source: Entity, target: Entity, interaction: InteractionKind, range: f32) -> Self {
        Self {
            source,
            target,
            interaction,
            range,
            requires_vision: true,
            ignore_faction: false,
            collision_bonus: 0.0,
        }
    }
}

/// Per-entity flags plus the world-wide reveal source list.
#[derive(Debug, Default)]
pub struct TargetingStore {
    flags: BTreeMap<Entity, TargetFlags>,
    reveals: Vec<RevealSource>,
    next_reveal_id: u64,
}

impl TargetingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flags(&self, entity: Entity) -> TargetFlags {
        self.flags.get(&entity).copied().unwrap_or_default()
    }

    pub fn set_flags(&mut self, entity: Entity, flags: TargetFlags) {
        if flags.is_empty() {
            self.flags.remove(&entity);
        } else {
            self.flags.insert(entity, flags);
        }
    }

    pub fn insert_flags(&mut self, entity: Entity, flags: TargetFlags) {
        let merged = self.flags(entity) | flags;
        self.set_flags(entity, merged);
    }

    pub fn remove_flags(&mut self, entity: Entity, flags: TargetFlags) {
        let remaining = self.flags(entity) - flags;
        self.set_flags(entity, remaining);
    }

    /// Register a reveal area and return its id.
    pub fn add_reveal_source(
        &mut self,
        position: Position,
        radius: f32,
        pierces: RevealFlags,
        duration: f32,
    ) -> u64 {
        self.next_reveal_id += 1;
        self.reveals.push(RevealSource {
            id: self.next_reveal_id,
            position,
            radius,
            pierces,
            remaining: duration,
        });
        self.next_reveal_id
    }

    pub fn remove_reveal_source(&mut self, id: u64) {
        self.reveals.retain(|r| r.id != id);
    }

    pub fn reveal_sources(&self) -> &[RevealSource] {
        &self.reveals
    }

    /// Count down timed reveal sources and drop the expired ones.
    pub fn tick(&mut self, dt: f32) {
        for reveal in self.reveals.iter_mut() {
            if reveal.remaining >= 0.0 {
                reveal.remaining = (reveal.remaining - dt).max(0.0);
            }
        }
        self.reveals.retain(|r| r.remaining != 0.0);
    }

    /// Full eligibility chain. Position, HP and faction data come from the
    /// arena; the store contributes flags and reveal sources.
    pub fn check_eligibility(
        &self,
        query: &TargetQuery,
        arena: &ComponentArena,
    ) -> Result<(), IneligibleReason> {
        let Some(target_hp) = arena.hp(query.target) else {
            return Err(IneligibleReason::Dead);
        };
        if target_hp <= 0.0 {
            return Err(IneligibleReason::Dead);
        }

        let flags = self.flags(query.target);
        if flags.contains(TargetFlags::UNTARGETABLE) {
            return Err(IneligibleReason::Untargetable);
        }

        match query.interaction {
            InteractionKind::Spell if flags.contains(TargetFlags::SPELL_IMMUNE) => {
                return Err(IneligibleReason::Immune);
            }
            InteractionKind::Attack if flags.contains(TargetFlags::ATTACK_IMMUNE) => {
                return Err(IneligibleReason::Immune);
            }
            _ => {}
        }

        if query.requires_vision && !self.is_visible(query.target, flags, arena) {
            return Err(IneligibleReason::NotVisible);
        }

        let (Some(source_pos), Some(target_pos)) =
            (arena.position(query.source), arena.position(query.target))
        else {
            return Err(IneligibleReason::OutOfRange);
        };
        let effective_range = if flags.contains(TargetFlags::GHOST) {
            query.range
        } else {
            query.range + query.collision_bonus
        };
        if source_pos.distance(&target_pos) > effective_range {
            return Err(IneligibleReason::OutOfRange);
        }

        if !query.ignore_faction
            && arena.faction(query.source).is_some()
            && arena.faction(query.source) == arena.faction(query.target)
        {
            return Err(IneligibleReason::SameFaction);
        }

        Ok(())
    }

    /// Whether a hidden entity is currently pierced by any reveal source.
    fn is_visible(&self, target: Entity, flags: TargetFlags, arena: &ComponentArena) -> bool {
        let hidden = if flags.contains(TargetFlags::INVISIBLE) {
            RevealFlags::INVISIBLE
        } else if flags.contains(TargetFlags::CAMOUFLAGED) {
            RevealFlags::CAMOUFLAGED
        } else {
            return true;
        };
        if flags.contains(TargetFlags::REVEALED) {
            return true;
        }
        let Some(position) = arena.position(target) else {
            return false;
        };
        self.reveals
            .iter()
            .any(|r| r.pierces.contains(hidden) && r.position.distance(&position) <= r.radius)
    }

    pub fn clear_entity(&mut self, entity: Entity) {
        self.flags.remove(&entity);
    }

    pub fn clear(&mut self) {
        self.flags.clear();
        self.reveals.clear();
    }
}

//! Dense per-entity component arrays.
//!
//! The arena owns the numeric component storage the combat core borrows by
//! handle: health, position, faction and the legacy status timers that
//! effect handlers write for cheap presentation queries. In the full game
//! this lives in the ECS layer; the core only assumes "fixed-size numeric
//! arrays indexed by integer entity handle", which is exactly what this is.
//!
//! Handles are never reused within a session: despawning leaves a dead slot
//! behind, so every accessor returns `Option` and a stale handle degrades to
//! a silent no-op instead of aliasing a new entity.

use crate::entity::{Entity, Faction, Position};

/// Dense component storage, indexed by [`Entity`].
#[derive(Debug, Default)]
pub struct ComponentArena {
    alive: Vec<bool>,
    hp: Vec<f32>,
    hp_max: Vec<f32>,
    position: Vec<Position>,
    faction: Vec<Faction>,

    // Legacy status timers. Handlers mirror stun/slow/buff state into these
    // flat arrays so presentation and AI can poll them without walking the
    // active-effect store.
    pub stun_timer: Vec<f32>,
    pub slow_timer: Vec<f32>,
    pub slow_power: Vec<f32>,
    pub buff_timer: Vec<f32>,
    pub buff_power: Vec<f32>,
}

impl ComponentArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new entity slot. Handles are monotonically increasing and
    /// never reused.
    pub fn spawn(&mut self, hp_max: f32, position: Position, faction: Faction) -> Entity {
        let id = Entity(self.alive.len() as u32);
        self.alive.push(true);
        self.hp.push(hp_max);
        self.hp_max.push(hp_max);
        self.position.push(position);
        self.faction.push(faction);
        self.stun_timer.push(0.0);
        self.slow_timer.push(0.0);
        self.slow_power.push(0.0);
        self.buff_timer.push(0.0);
        self.buff_power.push(0.0);
        id
    }

    /// Mark a slot dead. The slot's data stays in place but stops resolving.
    pub fn despawn(&mut self, entity: Entity) {
        if let Some(slot) = self.alive.get_mut(entity.index()) {
            *slot = false;
        }
    }

    /// Whether the handle resolves to a live slot. Note that an entity at
    /// zero HP is still "alive" in the arena sense until despawned; combat
    /// eligibility applies its own HP > 0 check.
    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.alive.get(entity.index()).copied().unwrap_or(false)
    }

    /// Number of live entities, as tracked by state snapshots.
    pub fn alive_count(&self) -> u32 {
        self.alive.iter().filter(|a| **a).count() as u32
    }

    /// Iterate live handles in ascending id order. Systems sweep in this
    /// order; it is part of the determinism contract.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(i, _)| Entity(i as u32))
    }

    pub fn hp(&self, entity: Entity) -> Option<f32> {
        self.checked(entity).map(|i| self.hp[i])
    }

    pub fn hp_max(&self, entity: Entity) -> Option<f32> {
        self.checked(entity).map(|i| self.hp_max[i])
    }

    /// Write HP directly. Only the damage/heal pipeline and resource health
    /// costs are sanctioned callers; everything else must go through
    /// `apply_damage` / `apply_heal`.
    pub fn set_hp(&mut self, entity: Entity, value: f32) {
        if let Some(i) = self.checked(entity) {
            self.hp[i] = value.clamp(0.0, self.hp_max[i]);
        }
    }

    pub fn set_hp_max(&mut self, entity: Entity, value: f32) {
        if let Some(i) = self.checked(entity) {
            self.hp_max[i] = value.max(1.0);
            self.hp[i] = self.hp[i].min(self.hp_max[i]);
        }
    }

    pub fn position(&self, entity: Entity) -> Option<Position> {
        self.checked(entity).map(|i| self.position[i])
    }

    pub fn set_position(&mut self, entity: Entity, position: Position) {
        if let Some(i) = self.checked(entity) {
            self.position[i] = position;
        }
    }

    pub fn faction(&self, entity: Entity) -> Option<Faction> {
        self.checked(entity).map(|i| self.faction[i])
    }

    /// Countdown all legacy status timers, flooring at zero. Slow power is
    /// zeroed when its timer expires so pollers never read a stale power.
    pub fn tick_status_timers(&mut self, dt: f32) {
        for i in 0..self.alive.len() {
            if !self.alive[i] {
                continue;
            }
            self.stun_timer[i] = (self.stun_timer[i] - dt).max(0.0);
            self.slow_timer[i] = (self.slow_timer[i] - dt).max(0.0);
            if self.slow_timer[i] <= 0.0 {
                self.slow_power[i] = 0.0;
            }
            self.buff_timer[i] = (self.buff_timer[i] - dt).max(0.0);
            if self.buff_timer[i] <= 0.0 {
                self.buff_power[i] = 0.0;
            }
        }
    }

    #[inline]
    fn checked(&self, entity: Entity) -> Option<usize> {
        let i = entity.index();
        if self.alive.get(i).copied().unwrap_or(false) {
            Some(i)
        } else {
            None
        }
    }
}

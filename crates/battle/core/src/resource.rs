//! Per-entity cast resources: mana, energy, health costs, fury, charges and
//! stacks.
//!
//! Each entity carries exactly one resource kind at a time. The state struct
//! is flat; only the fields relevant to the active kind are meaningful,
//! which keeps the store a plain value map with no per-kind allocation.

use std::collections::BTreeMap;

use crate::entity::Entity;

/// Which resource an entity spends to cast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::EnumString, strum::AsRefStr)]
#[derive(serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ResourceKind {
    /// Casting is free.
    #[default]
    None,
    /// Pool with passive regeneration.
    Mana,
    /// Small, fast-regenerating pool.
    Energy,
    /// Abilities cost HP. Spending always succeeds and can reduce HP to
    /// zero; it never counts as a kill by itself.
    Health,
    /// Pool that only fills through combat; no passive regen here.
    Fury,
    /// Integer ability charges refilled on a recharge timer.
    Charge,
    /// Integer stacks that decay over time.
    Stack,
}

/// Resource state for one entity. Fields outside the active kind are
/// ignored.
#[derive(Clone, Debug, Default, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ResourceState {
    pub kind: ResourceKind,

    // Pool kinds (mana / energy / fury).
    pub current: f32,
    pub max: f32,
    pub regen: f32,

    // Charge kind.
    pub charges: u32,
    pub max_charges: u32,
    pub recharge_time: f32,
    pub recharge_timer: f32,

    // Stack kind.
    pub stacks: u32,
    pub max_stacks: u32,
    pub decay_time: f32,
    pub decay_timer: f32,
    /// When true an expired decay timer drops all stacks at once instead of
    /// one at a time.
    pub decay_all: bool,
}

impl ResourceState {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn mana(max: f32, regen: f32) -> Self {
        Self {
            kind: ResourceKind::Mana,
            current: max,
            max,
            regen,
            ..Self::default()
        }
    }

    pub fn energy(max: f32, regen: f32) -> Self {
        Self {
            kind: ResourceKind::Energy,
            current: max,
            max,
            regen,
            ..Self::default()
        }
    }

    pub fn health() -> Self {
        Self {
            kind: ResourceKind::Health,
            ..Self::default()
        }
    }

    pub fn fury(max: f32) -> Self {
        Self {
            kind: ResourceKind::Fury,
            current: 0.0,
            max,
            ..Self::default()
        }
    }

    pub fn charges(max_charges: u32, recharge_time: f32) -> Self {
        Self {
            kind: ResourceKind::Charge,
            charges: max_charges,
            max_charges,
            recharge_time,
            ..Self::default()
        }
    }

    pub fn stacks(max_stacks: u32, decay_time: f32, decay_all: bool) -> Self {
        Self {
            kind: ResourceKind::Stack,
            max_stacks,
            decay_time,
            decay_all,
            ..Self::default()
        }
    }
}

/// Result of a spend attempt.
///
/// `success` is the only contract; no error is thrown on insufficient
/// resource. For the health kind the cost is reported back instead of
/// applied, because HP lives in the component arena and the caller owns
/// that write.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpendResult {
    pub success: bool,
    /// HP the caller must deduct (health kind only, zero otherwise).
    pub health_cost: f32,
}

impl SpendResult {
    const FAILED: Self = Self {
        success: false,
        health_cost: 0.0,
    };

    const FREE: Self = Self {
        success: true,
        health_cost: 0.0,
    };
}

/// Per-entity resource map.
#[derive(Debug, Default)]
pub struct ResourceStore {
    states: BTreeMap<Entity, ResourceState>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(&mut self, entity: Entity, state: ResourceState) {
        self.states.insert(entity, state);
    }

    pub fn get(&self, entity: Entity) -> Option<&ResourceState> {
        self.states.get(&entity)
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut ResourceState> {
        self.states.get_mut(&entity)
    }

    /// Try to pay `amount`. Uninitialized entities spend as the `none` kind.
    pub fn spend(&mut self, entity: Entity, amount: f32) -> SpendResult {
        let Some(state) = self.states.get_mut(&entity) else {
            return SpendResult::FREE;
        };
        match state.kind {
            ResourceKind::None => SpendResult::FREE,
            ResourceKind::Health => SpendResult {
                success: true,
                health_cost: amount,
            },
            ResourceKind::Mana | ResourceKind::Energy | ResourceKind::Fury => {
                if state.current + 1e-6 < amount {
                    return SpendResult::FAILED;
                }
                state.current -= amount;
                SpendResult {
                    success: true,
                    health_cost: 0.0,
                }
            }
            ResourceKind::Charge => {
                let cost = amount.ceil() as u32;
                if state.charges < cost {
                    return SpendResult::FAILED;
                }
                state.charges -= cost;
                SpendResult {
                    success: true,
                    health_cost: 0.0,
                }
            }
            ResourceKind::Stack => {
                let cost = amount.ceil() as u32;
                if state.stacks < cost {
                    return SpendResult::FAILED;
                }
                state.stacks -= cost;
                SpendResult {
                    success: true,
                    health_cost: 0.0,
                }
            }
        }
    }

    /// Add to a pool kind, capped at max. No-op for other kinds.
    pub fn restore(&mut self, entity: Entity, amount: f32) {
        if let Some(state) = self.states.get_mut(&entity) {
            match state.kind {
                ResourceKind::Mana | ResourceKind::Energy | ResourceKind::Fury => {
                    state.current = (state.current + amount).min(state.max);
                }
                _ => {}
            }
        }
    }

    /// Remove from a pool kind, floored at zero. No-op for other kinds.
    pub fn drain(&mut self, entity: Entity, amount: f32) {
        if let Some(state) = self.states.get_mut(&entity) {
            match state.kind {
                ResourceKind::Mana | ResourceKind::Energy | ResourceKind::Fury => {
                    state.current = (state.current - amount).max(0.0);
                }
                _ => {}
            }
        }
    }

    /// Add stacks (stack kind), capped at max. Resets the decay timer.
    pub fn add_stacks(&mut self, entity: Entity, count: u32) {
        if let Some(state) = self.states.get_mut(&entity) {
            if state.kind == ResourceKind::Stack {
                state.stacks = (state.stacks + count).min(state.max_stacks);
                state.decay_timer = 0.0;
            }
        }
    }

    /// Advance regeneration, charge recharging and stack decay.
    pub fn tick(&mut self, dt: f32) {
        for state in self.states.values_mut() {
            match state.kind {
                ResourceKind::Mana | ResourceKind::Energy => {
                    state.current = (state.current + state.regen * dt).min(state.max);
                }
                ResourceKind::Charge => {
                    if state.charges < state.max_charges && state.recharge_time > 0.0 {
                        state.recharge_timer += dt;
                        // Enough banked time can grant several charges at once.
                        while state.recharge_timer >= state.recharge_time
                            && state.charges < state.max_charges
                        {
                            state.recharge_timer -= state.recharge_time;
                            state.charges += 1;
                        }
                        if state.charges == state.max_charges {
                            state.recharge_timer = 0.0;
                        }
                    }
                }
                ResourceKind::Stack => {
                    if state.stacks > 0 && state.decay_time > 0.0 {
                        state.decay_timer += dt;
                        while state.decay_timer >= state.decay_time && state.stacks > 0 {
                            state.decay_timer -= state.decay_time;
                            if state.decay_all {
                                state.stacks = 0;
                            } else {
                                state.stacks -= 1;
                            }
                        }
                        if state.stacks == 0 {
                            state.decay_timer = 0.0;
                        }
                    }
                }
                ResourceKind::None | ResourceKind::Health | ResourceKind::Fury => {}
            }
        }
    }

    pub fn clear_entity(&mut self, entity: Entity) {
        self.states.remove(&entity);
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const E: Entity = Entity(0);

    #[test]
    fn uninitialized_entity_spends_free() {
        let mut store = ResourceStore::new();
        assert!(store.spend(Entity(42), 100.0).success);
    }

    #[test]
    fn mana_spend_requires_sufficient_pool() {
        let mut store = ResourceStore::new();
        store.init(E, ResourceState::mana(100.0, 5.0));
        assert!(store.spend(E, 60.0).success);
        assert!(!store.spend(E, 60.0).success);
        assert_eq!(store.get(E).unwrap().current, 40.0);
    }

    #[test]
    fn health_spend_always_succeeds_and_reports_cost() {
        let mut store = ResourceStore::new();
        store.init(E, ResourceState::health());
        let result = store.spend(E, 30.0);
        assert!(result.success);
        assert_eq!(result.health_cost, 30.0);
    }

    #[test]
    fn mana_regenerates_to_cap() {
        let mut store = ResourceStore::new();
        store.init(E, ResourceState::mana(100.0, 10.0));
        store.spend(E, 95.0);
        store.tick(2.0);
        assert_eq!(store.get(E).unwrap().current, 25.0);
        store.tick(100.0);
        assert_eq!(store.get(E).unwrap().current, 100.0);
    }

    #[test]
    fn charges_recharge_in_a_loop() {
        let mut store = ResourceStore::new();
        store.init(E, ResourceState::charges(3, 2.0));
        assert!(store.spend(E, 3.0).success);
        // 5 seconds banks two whole charges and half of the next.
        store.tick(5.0);
        let state = store.get(E).unwrap();
        assert_eq!(state.charges, 2);
        assert!((state.recharge_timer - 1.0).abs() < 1e-5);
    }

    #[test]
    fn recharge_stops_at_max() {
        let mut store = ResourceStore::new();
        store.init(E, ResourceState::charges(2, 1.0));
        store.spend(E, 1.0);
        store.tick(10.0);
        let state = store.get(E).unwrap();
        assert_eq!(state.charges, 2);
        assert_eq!(state.recharge_timer, 0.0);
    }

    #[test]
    fn single_stack_decay_restarts_timer() {
        let mut store = ResourceStore::new();
        store.init(E, ResourceState::stacks(5, 1.0, false));
        store.add_stacks(E, 3);
        store.tick(2.5);
        let state = store.get(E).unwrap();
        assert_eq!(state.stacks, 1);
        assert!((state.decay_timer - 0.5).abs() < 1e-5);
    }

    #[test]
    fn decay_all_drops_everything_at_once() {
        let mut store = ResourceStore::new();
        store.init(E, ResourceState::stacks(5, 1.0, true));
        store.add_stacks(E, 4);
        store.tick(1.0);
        assert_eq!(store.get(E).unwrap().stacks, 0);
    }

    #[test]
    fn fury_does_not_regen() {
        let mut store = ResourceStore::new();
        store.init(E, ResourceState::fury(100.0));
        store.restore(E, 40.0);
        store.tick(10.0);
        assert_eq!(store.get(E).unwrap().current, 40.0);
    }
}

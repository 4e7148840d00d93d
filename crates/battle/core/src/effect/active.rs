//! Lingering effect instances and the tick sweep.
//!
//! The store only does bookkeeping: durations, periods, marks and stack
//! counters. It never dispatches handlers itself; [`tick`] returns the due
//! triggers and the caller re-dispatches them through the registry, so the
//! sweep cannot alias the stores a handler wants to mutate.
//!
//! [`tick`]: ActiveEffectStore::tick

use std::collections::BTreeMap;

use crate::entity::Entity;

use super::{EffectKind, EffectSpec, EffectStage};

/// One lingering effect on one entity.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ActiveEffect {
    pub id: u64,
    pub spec: EffectSpec,
    /// Mark tag; also the lookup key for stack consumption.
    pub tag: Option<String>,
    pub source: Option<Entity>,
    /// Remaining seconds; negative lingers until explicitly consumed.
    pub remaining: f32,
    /// `OnTick` re-dispatch interval; zero or less disables it.
    pub period: f32,
    until_next_tick: f32,
    pub stacks: u32,
}

impl ActiveEffect {
    pub fn new(spec: EffectSpec, duration: f32) -> Self {
        Self {
            id: 0,
            spec,
            tag: None,
            source: None,
            remaining: duration,
            period: 0.0,
            until_next_tick: 0.0,
            stacks: 1,
        }
    }

    pub fn with_period(mut self, period: f32) -> Self {
        self.period = period;
        self.until_next_tick = period;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_source(mut self, source: Option<Entity>) -> Self {
        self.source = source;
        self
    }

    pub fn with_stacks(mut self, stacks: u32) -> Self {
        self.stacks = stacks;
        self
    }
}

/// A due `OnTick`/`OnExpire` dispatch produced by the sweep.
#[derive(Clone, Debug)]
pub struct EffectTrigger {
    pub entity: Entity,
    pub effect_id: u64,
    pub stage: EffectStage,
    pub spec: EffectSpec,
    pub source: Option<Entity>,
}

/// Per-entity lingering effects.
#[derive(Clone, Debug, Default)]
pub struct ActiveEffectStore {
    effects: BTreeMap<Entity, Vec<ActiveEffect>>,
    next_id: u64,
}

impl ActiveEffectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an effect and return its id.
    pub fn add(&mut self, entity: Entity, mut effect: ActiveEffect) -> u64 {
        self.next_id += 1;
        effect.id = self.next_id;
        self.effects.entry(entity).or_default().push(effect);
        self.next_id
    }

    /// Insert a mark, refreshing the duration of an existing mark with the
    /// same tag instead of stacking a duplicate.
    pub fn add_mark(
        &mut self,
        entity: Entity,
        tag: &str,
        duration: f32,
        source: Option<Entity>,
    ) -> u64 {
        let list = self.effects.entry(entity).or_default();
        if let Some(existing) = list.iter_mut().find(|e| e.tag.as_deref() == Some(tag)) {
            existing.remaining = duration;
            existing.source = source;
            return existing.id;
        }
        self.next_id += 1;
        list.push(ActiveEffect {
            id: self.next_id,
            spec: EffectSpec::ApplyMark {
                tag: tag.to_owned(),
                duration,
            },
            tag: Some(tag.to_owned()),
            source,
            remaining: duration,
            period: 0.0,
            until_next_tick: 0.0,
            stacks: 1,
        });
        self.next_id
    }

    pub fn has_mark(&self, entity: Entity, tag: &str) -> bool {
        self.effects
            .get(&entity)
            .is_some_and(|list| list.iter().any(|e| e.tag.as_deref() == Some(tag)))
    }

    /// Remove the first effect with a matching tag. Returns whether a mark
    /// was actually consumed.
    pub fn consume_mark(&mut self, entity: Entity, tag: &str) -> bool {
        let Some(list) = self.effects.get_mut(&entity) else {
            return false;
        };
        let Some(at) = list.iter().position(|e| e.tag.as_deref() == Some(tag)) else {
            return false;
        };
        list.remove(at);
        if list.is_empty() {
            self.effects.remove(&entity);
        }
        true
    }

    /// Decrement the stack counter of the first tagged effect, removing it
    /// when the counter reaches zero. Returns the stacks actually consumed.
    pub fn consume_stacks(&mut self, entity: Entity, tag: &str, count: u32) -> u32 {
        let Some(list) = self.effects.get_mut(&entity) else {
            return 0;
        };
        let Some(at) = list.iter().position(|e| e.tag.as_deref() == Some(tag)) else {
            return 0;
        };
        let consumed = list[at].stacks.min(count);
        list[at].stacks -= consumed;
        if list[at].stacks == 0 {
            list.remove(at);
            if list.is_empty() {
                self.effects.remove(&entity);
            }
        }
        consumed
    }

    pub fn effects_for(&self, entity: Entity) -> &[ActiveEffect] {
        self.effects.get(&entity).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn kind_count(&self, entity: Entity, kind: EffectKind) -> usize {
        self.effects_for(entity)
            .iter()
            .filter(|e| EffectKind::from(&e.spec) == kind)
            .count()
    }

    /// Count down every effect and collect due triggers, in ascending
    /// entity order. Periodic triggers fire once per whole period elapsed;
    /// expiry fires once and removes the effect.
    pub fn tick(&mut self, dt: f32) -> Vec<EffectTrigger> {
        let mut due = Vec::new();
        for (&entity, list) in self.effects.iter_mut() {
            for effect in list.iter_mut() {
                if effect.period > 0.0 {
                    effect.until_next_tick -= dt;
                    while effect.until_next_tick <= 1e-9 {
                        due.push(EffectTrigger {
                            entity,
                            effect_id: effect.id,
                            stage: EffectStage::OnTick,
                            spec: effect.spec.clone(),
                            source: effect.source,
                        });
                        effect.until_next_tick += effect.period;
                    }
                }
                if effect.remaining >= 0.0 {
                    effect.remaining = (effect.remaining - dt).max(0.0);
                    if effect.remaining == 0.0 {
                        due.push(EffectTrigger {
                            entity,
                            effect_id: effect.id,
                            stage: EffectStage::OnExpire,
                            spec: effect.spec.clone(),
                            source: effect.source,
                        });
                    }
                }
            }
            list.retain(|e| e.remaining != 0.0);
        }
        self.effects.retain(|_, list| !list.is_empty());
        due
    }

    pub fn clear_entity(&mut self, entity: Entity) {
        self.effects.remove(&entity);
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }
}

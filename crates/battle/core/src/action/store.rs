//! Live cast instances and cooldowns.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::entity::Entity;
use crate::error::StartFailure;

use super::{AbilityFlags, ActionDefinition, InterruptCause};

/// Cast state machine phases.
///
/// `Release` is transient: a cast observed between ticks is always in
/// Windup, Channel or Recovery. The variant exists so a mid-transition
/// query during effect application still reads coherently.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[derive(strum::Display, strum::AsRefStr)]
#[derive(serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum CastState {
    #[default]
    Idle,
    Windup,
    Channel,
    Release,
    Recovery,
}

/// A live cast.
#[derive(Clone, Debug)]
pub struct ActionInstance {
    pub definition: Arc<ActionDefinition>,
    pub state: CastState,
    pub time_remaining: f32,
    pub target: Option<Entity>,
    pub started_at: u64,
    pub interrupted: bool,
    pub interrupt_cause: InterruptCause,
}

/// The one-time release payload handed to the caller so it can apply the
/// action's effect list exactly once.
#[derive(Clone, Debug)]
pub struct ReleasedCast {
    pub definition: Arc<ActionDefinition>,
    pub target: Option<Entity>,
}

/// Result of `start_action`.
///
/// An action whose windup, channel and recovery are all zero completes and
/// sets cooldown inside the starting call; callers must not assume at least
/// one tick of life.
#[derive(Clone, Debug, Default)]
pub struct StartOutcome {
    pub released: Option<ReleasedCast>,
    pub completed: bool,
}

/// Result of one `tick_action` call.
#[derive(Clone, Debug, Default)]
pub struct TickOutcome {
    /// Set exactly once per cast, on the transition into Release.
    pub released: Option<ReleasedCast>,
    /// Ability id, set when the cast completed naturally this call.
    pub completed: Option<String>,
    /// Ability id and cause, set when an interrupt was consumed this call.
    pub interrupted: Option<(String, InterruptCause)>,
    /// Whether a cast instance is still live after this call.
    pub active: bool,
}

/// Per-entity cast instances plus per-ability cooldowns.
#[derive(Debug, Default)]
pub struct ActionStore {
    instances: BTreeMap<Entity, ActionInstance>,
    cooldowns: BTreeMap<Entity, BTreeMap<String, f32>>,
}

impl ActionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stateless guard: can an entity under the given crowd control start
    /// this ability at all?
    ///
    /// Hard-CC bits block everything; silence blocks spell-flagged
    /// abilities; disarm blocks attacks; ground blocks mobility.
    pub fn can_cast(definition: &ActionDefinition, current_cc: InterruptCause) -> bool {
        if current_cc.intersects(InterruptCause::HARD_CC) {
            return false;
        }
        if current_cc.contains(InterruptCause::SILENCE)
            && definition.flags.contains(AbilityFlags::SPELL)
        {
            return false;
        }
        if current_cc.contains(InterruptCause::DISARM)
            && definition.flags.contains(AbilityFlags::ATTACK)
        {
            return false;
        }
        if current_cc.contains(InterruptCause::GROUND)
            && definition.flags.contains(AbilityFlags::MOBILITY)
        {
            return false;
        }
        true
    }

    /// Begin a cast. Fails if the ability is still cooling down or the
    /// entity already has a live instance. Resource costs are checked by
    /// the caller before this point.
    pub fn start_action(
        &mut self,
        entity: Entity,
        definition: &Arc<ActionDefinition>,
        target: Option<Entity>,
        current_tick: u64,
    ) -> Result<StartOutcome, StartFailure> {
        if self.cooldown_remaining(entity, &definition.id) > 0.0 {
            return Err(StartFailure::OnCooldown);
        }
        if self.instances.contains_key(&entity) {
            return Err(StartFailure::AlreadyCasting);
        }

        let mut instance = ActionInstance {
            definition: Arc::clone(definition),
            state: CastState::Windup,
            time_remaining: definition.windup,
            target,
            started_at: current_tick,
            interrupted: false,
            interrupt_cause: InterruptCause::empty(),
        };

        let mut outcome = StartOutcome::default();
        if definition.windup <= 0.0 {
            // Zero windup releases inside the starting call.
            outcome.released = Some(ReleasedCast {
                definition: Arc::clone(definition),
                target,
            });
            if !Self::enter_post_release(&mut instance) {
                self.complete(entity, definition);
                outcome.completed = true;
                return Ok(outcome);
            }
        }
        self.instances.insert(entity, instance);
        Ok(outcome)
    }

    /// Advance the live cast by `dt`, carrying leftover time across phase
    /// boundaries so several phases can elapse in one call. Release still
    /// fires exactly once.
    pub fn tick_action(&mut self, entity: Entity, dt: f32) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        let Some(instance) = self.instances.get_mut(&entity) else {
            return outcome;
        };

        if instance.interrupted {
            let id = instance.definition.id.clone();
            let cause = instance.interrupt_cause;
            self.instances.remove(&entity);
            outcome.interrupted = Some((id, cause));
            return outcome;
        }

        let mut budget = dt;
        loop {
            if instance.time_remaining > budget {
                instance.time_remaining -= budget;
                outcome.active = true;
                return outcome;
            }
            budget -= instance.time_remaining;
            instance.time_remaining = 0.0;

            match instance.state {
                CastState::Windup => {
                    instance.state = CastState::Release;
                    outcome.released = Some(ReleasedCast {
                        definition: Arc::clone(&instance.definition),
                        target: instance.target,
                    });
                    if !Self::enter_post_release(instance) {
                        break;
                    }
                }
                CastState::Channel => {
                    if instance.definition.recovery > 0.0 {
                        instance.state = CastState::Recovery;
                        instance.time_remaining = instance.definition.recovery;
                    } else {
                        break;
                    }
                }
                CastState::Release | CastState::Recovery | CastState::Idle => break,
            }
        }

        let definition = Arc::clone(&instance.definition);
        self.instances.remove(&entity);
        self.complete(entity, &definition);
        outcome.completed = Some(definition.id.clone());
        outcome
    }

    /// Mark the live cast interrupted if the definition is vulnerable to
    /// any of the given causes. The next `tick_action` observes the flag
    /// and clears the instance without setting cooldown.
    pub fn interrupt_action(&mut self, entity: Entity, causes: InterruptCause) -> bool {
        let Some(instance) = self.instances.get_mut(&entity) else {
            return false;
        };
        if instance.definition.flags.contains(AbilityFlags::UNSTOPPABLE) {
            return false;
        }
        if !instance.definition.interrupted_by.intersects(causes) {
            return false;
        }
        instance.interrupted = true;
        instance.interrupt_cause = instance.definition.interrupted_by.intersection(causes);
        true
    }

    pub fn instance(&self, entity: Entity) -> Option<&ActionInstance> {
        self.instances.get(&entity)
    }

    pub fn cast_state(&self, entity: Entity) -> CastState {
        self.instances
            .get(&entity)
            .map(|i| i.state)
            .unwrap_or(CastState::Idle)
    }

    pub fn set_cooldown(&mut self, entity: Entity, ability: &str, seconds: f32) {
        self.cooldowns
            .entry(entity)
            .or_default()
            .insert(ability.to_owned(), seconds);
    }

    pub fn cooldown_remaining(&self, entity: Entity, ability: &str) -> f32 {
        self.cooldowns
            .get(&entity)
            .and_then(|map| map.get(ability))
            .copied()
            .unwrap_or(0.0)
    }

    /// Count all cooldowns down, flooring at zero.
    pub fn tick_cooldowns(&mut self, dt: f32) {
        for map in self.cooldowns.values_mut() {
            for remaining in map.values_mut() {
                *remaining = (*remaining - dt).max(0.0);
            }
            map.retain(|_, remaining| *remaining > 0.0);
        }
        self.cooldowns.retain(|_, map| !map.is_empty());
    }

    pub fn clear_entity(&mut self, entity: Entity) {
        self.instances.remove(&entity);
        self.cooldowns.remove(&entity);
    }

    pub fn clear(&mut self) {
        self.instances.clear();
        self.cooldowns.clear();
    }

    /// Move a just-released instance into its next phase. Returns false
    /// when there is no timed phase left and the cast is complete.
    fn enter_post_release(instance: &mut ActionInstance) -> bool {
        if instance.definition.channel > 0.0 {
            instance.state = CastState::Channel;
            instance.time_remaining = instance.definition.channel;
            true
        } else if instance.definition.recovery > 0.0 {
            instance.state = CastState::Recovery;
            instance.time_remaining = instance.definition.recovery;
            true
        } else {
            false
        }
    }

    fn complete(&mut self, entity: Entity, definition: &ActionDefinition) {
        if definition.cooldown > 0.0 {
            self.set_cooldown(entity, &definition.id, definition.cooldown);
        }
        tracing::trace!(%entity, ability = %definition.id, "cast completed");
    }
}

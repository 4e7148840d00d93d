//! Movement and displacement resolution.
//!
//! Each entity carries at most one movement intent. A new intent replaces
//! the old one only if its priority is strictly greater or it carries the
//! unstoppable flag; that single arbitration rule is the whole
//! collision-avoidance story between simultaneous crowd-control effects.
//!
//! Blink resolves instantly. Everything else advances by `speed × dt`
//! toward the target point, capped at the remaining distance, clamped to
//! world bounds (reporting a wall hit), and clears itself on arrival or
//! when its duration elapses.

use std::collections::BTreeMap;

use bitflags::bitflags;

use crate::config::SimConfig;
use crate::entity::{Entity, Position};

/// Displacement kinds, ordered by arbitration priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::EnumString, strum::AsRefStr)]
#[derive(serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum IntentKind {
    Lane,
    Dash,
    Charge,
    Pull,
    Knockback,
    Blink,
}

impl IntentKind {
    /// Arbitration priority. Strictly greater wins; ties lose.
    pub fn priority(self) -> i32 {
        match self {
            IntentKind::Lane => 1,
            IntentKind::Dash => 2,
            IntentKind::Charge => 3,
            IntentKind::Pull => 4,
            IntentKind::Knockback => 5,
            IntentKind::Blink => 10,
        }
    }
}

bitflags! {
    /// Intent behavior flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    #[derive(serde::Serialize, serde::Deserialize)]
    pub struct MoveFlags: u8 {
        /// Replaces any existing intent regardless of priority.
        const UNSTOPPABLE = 1 << 0;
    }
}

/// Callback invoked when an intent hits a wall or completes.
pub type MoveCallback = Box<dyn FnMut(Entity) + Send>;

/// A single displacement in flight.
pub struct MovementIntent {
    pub id: u64,
    pub kind: IntentKind,
    pub target: Position,
    pub speed: f32,
    /// Maximum lifetime in seconds; negative means until arrival.
    pub duration: f32,
    pub elapsed: f32,
    pub source: Option<Entity>,
    pub flags: MoveFlags,
    pub on_wall: Option<MoveCallback>,
    pub on_complete: Option<MoveCallback>,
}

impl MovementIntent {
    pub fn new(kind: IntentKind, target: Position, speed: f32) -> Self {
        Self {
            id: 0,
            kind,
            target,
            speed,
            duration: -1.0,
            elapsed: 0.0,
            source: None,
            flags: MoveFlags::empty(),
            on_wall: None,
            on_complete: None,
        }
    }

    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_source(mut self, source: Entity) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_flags(mut self, flags: MoveFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn on_wall(mut self, callback: MoveCallback) -> Self {
        self.on_wall = Some(callback);
        self
    }

    pub fn on_complete(mut self, callback: MoveCallback) -> Self {
        self.on_complete = Some(callback);
        self
    }
}

impl core::fmt::Debug for MovementIntent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MovementIntent")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("target", &self.target)
            .field("speed", &self.speed)
            .field("duration", &self.duration)
            .field("elapsed", &self.elapsed)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// What one movement tick did to one entity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MoveTickResult {
    pub moved: bool,
    pub hit_wall: bool,
    pub completed: bool,
}

/// Per-entity intents.
#[derive(Debug, Default)]
pub struct MovementStore {
    intents: BTreeMap<Entity, MovementIntent>,
    next_id: u64,
}

impl MovementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an intent, subject to the arbitration rule. Returns the id
    /// of the intent now active for the entity (the pre-existing one when
    /// the new intent loses arbitration).
    pub fn set_intent(&mut self, entity: Entity, mut intent: MovementIntent) -> u64 {
        if let Some(existing) = self.intents.get(&entity) {
            let unstoppable = intent.flags.contains(MoveFlags::UNSTOPPABLE);
            if !unstoppable && intent.kind.priority() <= existing.kind.priority() {
                tracing::trace!(
                    %entity,
                    kept = %existing.kind,
                    rejected = %intent.kind,
                    "displacement arbitration kept existing intent"
                );
                return existing.id;
            }
        }
        self.next_id += 1;
        intent.id = self.next_id;
        self.intents.insert(entity, intent);
        self.next_id
    }

    pub fn current_intent(&self, entity: Entity) -> Option<&MovementIntent> {
        self.intents.get(&entity)
    }

    pub fn clear_intent(&mut self, entity: Entity) {
        self.intents.remove(&entity);
    }

    /// Advance one entity's intent. The caller supplies the position slot;
    /// the store never touches the arena directly.
    pub fn tick_entity(
        &mut self,
        entity: Entity,
        position: &mut Position,
        dt: f32,
        config: &SimConfig,
    ) -> MoveTickResult {
        let Some(intent) = self.intents.get_mut(&entity) else {
            return MoveTickResult::default();
        };
        let mut result = MoveTickResult::default();

        if intent.kind == IntentKind::Blink {
            let (clamped, hit_wall) = config.clamp_to_bounds(intent.target);
            *position = clamped;
            result.moved = true;
            result.hit_wall = hit_wall;
            result.completed = true;
        } else {
            intent.elapsed += dt;

            let remaining = position.distance(&intent.target);
            let step = (intent.speed * dt).min(remaining);
            if step > 0.0 {
                let stepped = position.toward(&intent.target, step);
                let (clamped, hit_wall) = config.clamp_to_bounds(stepped);
                *position = clamped;
                result.moved = true;
                result.hit_wall = hit_wall;
            }

            let arrived = position.distance(&intent.target) <= 1e-4;
            let timed_out = intent.duration >= 0.0 && intent.elapsed + 1e-9 >= intent.duration;
            result.completed = arrived || timed_out || result.hit_wall;
        }

        if result.hit_wall {
            if let Some(mut callback) = intent.on_wall.take() {
                callback(entity);
            }
        }
        if result.completed {
            if let Some(mut intent) = self.intents.remove(&entity) {
                if let Some(mut callback) = intent.on_complete.take() {
                    callback(entity);
                }
            }
        }
        result
    }

    pub fn clear_entity(&mut self, entity: Entity) {
        self.intents.remove(&entity);
    }

    pub fn clear(&mut self) {
        self.intents.clear();
    }
}

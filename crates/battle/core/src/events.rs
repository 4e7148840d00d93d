//! Simulation event bus.
//!
//! The one-way notification channel from the combat core to presentation
//! and AI. Dispatch is immediate and synchronous; an optional deferred
//! queue lets systems batch notifications until the end of a tick, and an
//! optional recording mode captures tick-stamped events for replay tooling.
//!
//! Subscribers never mutate simulation state through the bus; it carries
//! facts, not commands.

use std::collections::BTreeMap;

use crate::action::InterruptCause;
use crate::combat::{DamageFlags, DamageType};
use crate::entity::{Entity, Position};
use crate::movement::IntentKind;
use crate::resource::ResourceKind;

/// Cast lifecycle notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[derive(strum::Display, strum::AsRefStr)]
#[derive(serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum CastPhase {
    Started,
    Released,
    Completed,
    Interrupted,
}

/// Simple status categories mirrored into the legacy presentation timers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[derive(strum::Display, strum::AsRefStr)]
#[derive(serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum StatusKind {
    Stunned,
    Slowed,
    Buffed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[derive(strum::Display, strum::AsRefStr)]
#[derive(serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleKind {
    Spawned,
    Died,
    Despawned,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[derive(strum::Display, strum::AsRefStr)]
#[derive(serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum GameStateKind {
    MatchStarted,
    MatchEnded,
}

/// Everything the core can tell the outside world.
#[derive(Clone, Debug, PartialEq)]
#[derive(strum::EnumDiscriminants)]
#[strum_discriminants(name(EventKind))]
#[strum_discriminants(derive(PartialOrd, Ord, Hash, strum::Display))]
#[strum_discriminants(strum(serialize_all = "snake_case"))]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum SimEvent {
    Combat {
        source: Option<Entity>,
        target: Entity,
        amount: f32,
        damage_type: DamageType,
        flags: DamageFlags,
        killed: bool,
    },
    Cast {
        entity: Entity,
        ability: String,
        phase: CastPhase,
        target: Option<Entity>,
        interrupt_cause: Option<InterruptCause>,
    },
    Status {
        entity: Entity,
        status: StatusKind,
        applied: bool,
        duration: f32,
        power: f32,
    },
    Movement {
        entity: Entity,
        kind: IntentKind,
        position: Position,
        hit_wall: bool,
    },
    Heal {
        source: Option<Entity>,
        target: Entity,
        amount: f32,
    },
    Resource {
        entity: Entity,
        kind: ResourceKind,
        current: f32,
        max: f32,
    },
    Lifecycle {
        entity: Entity,
        kind: LifecycleKind,
    },
    Effect {
        source: Option<Entity>,
        target: Entity,
        kind: String,
    },
    Shield {
        target: Entity,
        absorbed: f32,
        broken: bool,
    },
    GameState {
        tick: u64,
        kind: GameStateKind,
    },
}

/// Handle returned by `on`, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Subscription(u64);

struct Subscriber {
    /// None subscribes to every event kind.
    kind: Option<EventKind>,
    handler: Box<dyn FnMut(&SimEvent) + Send>,
}

/// Typed publish/subscribe channel with synchronous dispatch.
#[derive(Default)]
pub struct EventBus {
    subscribers: BTreeMap<u64, Subscriber>,
    next_id: u64,
    queue: Vec<SimEvent>,
    recording: Option<Vec<(u64, SimEvent)>>,
    current_tick: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one event kind. Handlers run in subscription order.
    pub fn on(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&SimEvent) + Send + 'static,
    ) -> Subscription {
        self.subscribe(Some(kind), Box::new(handler))
    }

    /// Subscribe to every event.
    pub fn on_any(&mut self, handler: impl FnMut(&SimEvent) + Send + 'static) -> Subscription {
        self.subscribe(None, Box::new(handler))
    }

    pub fn off(&mut self, subscription: Subscription) {
        self.subscribers.remove(&subscription.0);
    }

    /// Record (when recording) and synchronously dispatch one event.
    pub fn emit(&mut self, event: SimEvent) {
        if let Some(log) = self.recording.as_mut() {
            log.push((self.current_tick, event.clone()));
        }
        let kind = EventKind::from(&event);
        for subscriber in self.subscribers.values_mut() {
            if subscriber.kind.is_none() || subscriber.kind == Some(kind) {
                (subscriber.handler)(&event);
            }
        }
    }

    /// Defer an event until the next `flush`.
    pub fn enqueue(&mut self, event: SimEvent) {
        self.queue.push(event);
    }

    /// Dispatch all deferred events in enqueue order.
    pub fn flush(&mut self) {
        let queued = std::mem::take(&mut self.queue);
        for event in queued {
            self.emit(event);
        }
    }

    /// Tick stamp used for recorded events; the driver updates it once per
    /// simulation tick.
    pub fn set_tick(&mut self, tick: u64) {
        self.current_tick = tick;
    }

    pub fn start_recording(&mut self) {
        self.recording = Some(Vec::new());
    }

    /// Stop recording and return the captured tick-stamped events.
    pub fn stop_recording(&mut self) -> Vec<(u64, SimEvent)> {
        self.recording.take().unwrap_or_default()
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Drop all subscribers and queued events. Test isolation only.
    pub fn clear(&mut self) {
        self.subscribers.clear();
        self.queue.clear();
    }

    // ------------------------------------------------------------------
    // Emit convenience constructors
    // ------------------------------------------------------------------

    pub fn emit_combat(
        &mut self,
        source: Option<Entity>,
        target: Entity,
        amount: f32,
        damage_type: DamageType,
        flags: DamageFlags,
        killed: bool,
    ) {
        self.emit(SimEvent::Combat {
            source,
            target,
            amount,
            damage_type,
            flags,
            killed,
        });
    }

    pub fn emit_cast(
        &mut self,
        entity: Entity,
        ability: &str,
        phase: CastPhase,
        target: Option<Entity>,
    ) {
        self.emit(SimEvent::Cast {
            entity,
            ability: ability.to_owned(),
            phase,
            target,
            interrupt_cause: None,
        });
    }

    pub fn emit_status(
        &mut self,
        entity: Entity,
        status: StatusKind,
        applied: bool,
        duration: f32,
        power: f32,
    ) {
        self.emit(SimEvent::Status {
            entity,
            status,
            applied,
            duration,
            power,
        });
    }

    pub fn emit_heal(&mut self, source: Option<Entity>, target: Entity, amount: f32) {
        self.emit(SimEvent::Heal {
            source,
            target,
            amount,
        });
    }

    pub fn emit_death(&mut self, entity: Entity) {
        self.emit(SimEvent::Lifecycle {
            entity,
            kind: LifecycleKind::Died,
        });
    }

    pub fn emit_spawn(&mut self, entity: Entity) {
        self.emit(SimEvent::Lifecycle {
            entity,
            kind: LifecycleKind::Spawned,
        });
    }

    fn subscribe(
        &mut self,
        kind: Option<EventKind>,
        handler: Box<dyn FnMut(&SimEvent) + Send>,
    ) -> Subscription {
        self.next_id += 1;
        self.subscribers.insert(self.next_id, Subscriber { kind, handler });
        Subscription(self.next_id)
    }
}

impl core::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("queued", &self.queue.len())
            .field("recording", &self.is_recording())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn death(entity: Entity) -> SimEvent {
        SimEvent::Lifecycle {
            entity,
            kind: LifecycleKind::Died,
        }
    }

    #[test]
    fn filtered_subscription_only_sees_its_kind() {
        let mut bus = EventBus::new();
        let seen = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&seen);
        bus.on(EventKind::Lifecycle, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit_death(Entity(1));
        bus.emit_heal(None, Entity(1), 5.0);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let seen = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&seen);
        let sub = bus.on_any(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit_death(Entity(1));
        bus.off(sub);
        bus.emit_death(Entity(2));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn deferred_queue_flushes_in_order() {
        let mut bus = EventBus::new();
        let order = Arc::new(AtomicU32::new(0));
        let tracker = Arc::clone(&order);
        bus.on_any(move |event| {
            if let SimEvent::Lifecycle { entity, .. } = event {
                // Encode arrival order in the low bits.
                tracker.store(tracker.load(Ordering::SeqCst) * 10 + entity.0, Ordering::SeqCst);
            }
        });

        bus.enqueue(death(Entity(1)));
        bus.enqueue(death(Entity(2)));
        assert_eq!(order.load(Ordering::SeqCst), 0);
        bus.flush();
        assert_eq!(order.load(Ordering::SeqCst), 12);
    }

    #[test]
    fn recording_captures_tick_stamps() {
        let mut bus = EventBus::new();
        bus.start_recording();
        bus.set_tick(3);
        bus.emit_death(Entity(1));
        bus.set_tick(7);
        bus.emit_spawn(Entity(2));

        let recorded = bus.stop_recording();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].0, 3);
        assert_eq!(recorded[1].0, 7);
        assert!(!bus.is_recording());
    }
}

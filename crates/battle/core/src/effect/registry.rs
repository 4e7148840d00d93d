//! Handler registry keyed by effect kind and lifecycle stage.
//!
//! The registry is owned by the world, never global; two worlds can carry
//! different handler sets. Handlers within a key run in registration
//! order, and registration happens once at construction, which keeps
//! dispatch order deterministic.

use std::collections::BTreeMap;

use super::{EffectDeps, EffectInvocation, EffectKind, EffectStage};

pub type EffectHandler = Box<dyn Fn(&EffectInvocation, &mut EffectDeps<'_>) + Send + Sync>;

#[derive(Default)]
pub struct EffectRegistry {
    handlers: BTreeMap<(EffectKind, EffectStage), Vec<EffectHandler>>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: EffectKind, stage: EffectStage, handler: EffectHandler) {
        self.handlers.entry((kind, stage)).or_default().push(handler);
    }

    pub fn handler_count(&self, kind: EffectKind, stage: EffectStage) -> usize {
        self.handlers.get(&(kind, stage)).map_or(0, Vec::len)
    }

    /// Run every handler registered for the invocation's kind and stage.
    /// An unhandled kind is a silent no-op, not an error.
    pub fn dispatch(&self, invocation: &EffectInvocation, deps: &mut EffectDeps<'_>) {
        let kind = EffectKind::from(&invocation.spec);
        let Some(handlers) = self.handlers.get(&(kind, invocation.stage)) else {
            tracing::trace!(%kind, stage = %invocation.stage, "no handler registered");
            return;
        };
        for handler in handlers {
            handler(invocation, deps);
        }
    }

    /// Remove every handler. Test isolation only.
    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

impl core::fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EffectRegistry")
            .field("keys", &self.handlers.len())
            .finish()
    }
}

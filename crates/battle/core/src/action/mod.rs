//! The cast/action state machine.
//!
//! An action passes through `Windup → (Channel) → Release → (Recovery)`.
//! The store owns one live instance per entity plus a separate per-ability
//! cooldown map, so a completed action keeps blocking recast after its
//! instance is gone.

mod definition;
mod store;

pub use definition::{AbilityFlags, ActionDefinition, InterruptCause};
pub use store::{ActionInstance, ActionStore, CastState, ReleasedCast, StartOutcome, TickOutcome};

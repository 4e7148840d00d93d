//! Typed failure reasons shared across the crate.
//!
//! Every call site in the combat core runs inside a hot per-tick loop that
//! must keep going for the other entities regardless of one entity's
//! failure, so in-loop failures are modeled as plain result-reason enums.
//! Only operations at the serialization boundary return a real error type.

/// Why `start_action` refused to start a cast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::AsRefStr)]
#[derive(serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum StartFailure {
    /// The ability's cooldown has not elapsed.
    OnCooldown,
    /// The entity already has a live cast instance.
    AlreadyCasting,
    /// The resource cost could not be paid.
    NoResource,
    /// The entity's current crowd control forbids this ability.
    Interrupted,
    /// No registered definition matches the requested ability id.
    UnknownAbility,
}

/// Why `check_eligibility` rejected a target.
///
/// The first failing check short-circuits; there is no partial credit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::AsRefStr)]
#[derive(serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum IneligibleReason {
    /// Target handle does not resolve or its HP is zero.
    Dead,
    /// Target carries the untargetable flag.
    Untargetable,
    /// Target is immune to this interaction kind.
    Immune,
    /// Target is hidden and no reveal source pierces it.
    NotVisible,
    /// Target is beyond the interaction range.
    OutOfRange,
    /// Source and target share a faction and the check did not opt out.
    SameFaction,
}

/// Errors crossing the replay serialization boundary.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// JSON encoding or decoding failed.
    #[error("replay serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Commands were recorded out of tick order.
    #[error("command at tick {found} recorded after tick {previous}")]
    OutOfOrder { previous: u64, found: u64 },
}

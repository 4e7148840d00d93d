//! Common value types shared by every store: entity handles, factions and
//! world positions.
//!
//! An [`Entity`] is an opaque handle minted by the component arena. Handles
//! are never reused within a session, so a stale handle can always be
//! detected (the slot it points at is dead) and treated as a silent no-op.

/// Opaque entity handle.
///
/// The combat core does not own entity lifecycle; it only reacts to handles
/// it is given. Every store is keyed by this handle and must tolerate
/// handles that no longer resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Entity(pub u32);

impl Entity {
    /// Raw index into the component arrays.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Display for Entity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Faction identifier. The lane battler has two of these per match, but the
/// core treats the id as opaque and only ever compares for equality.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Faction(pub u8);

/// World position in lane space.
///
/// Movement in this core is one-dimensional displacement toward a target
/// point, not collision physics; the second axis exists for range checks and
/// reveal radii.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Unit vector pointing from `self` toward `other`.
    ///
    /// Returns the zero vector when the two positions coincide, so a
    /// degenerate displacement moves nothing instead of producing NaN.
    pub fn direction_to(&self, other: &Position) -> (f32, f32) {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let len = (dx * dx + dy * dy).sqrt();
        if len <= f32::EPSILON {
            (0.0, 0.0)
        } else {
            (dx / len, dy / len)
        }
    }

    /// Position moved `distance` along the direction toward `other`.
    pub fn toward(&self, other: &Position, distance: f32) -> Position {
        let (dx, dy) = self.direction_to(other);
        Position::new(self.x + dx * distance, self.y + dy * distance)
    }

    /// Position moved `distance` along the direction away from `other`.
    pub fn away_from(&self, other: &Position, distance: f32) -> Position {
        let (dx, dy) = self.direction_to(other);
        Position::new(self.x - dx * distance, self.y - dy * distance)
    }

    /// Clamp both axes into the rectangle spanned by `min` and `max`.
    pub fn clamped(&self, min: &Position, max: &Position) -> Position {
        Position::new(self.x.clamp(min.x, max.x), self.y.clamp(min.y, max.y))
    }
}

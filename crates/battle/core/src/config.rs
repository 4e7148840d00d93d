//! Simulation configuration.
//!
//! All balance constants and world parameters live here so that a match, a
//! test and a replay-verification world can each be constructed with an
//! explicit, serializable config instead of reaching for globals.

use crate::entity::Position;

/// Tunable parameters for one simulation instance.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SimConfig {
    /// Fixed simulation timestep in seconds.
    pub tick_length: f32,

    /// Upper bound on a single frame's contribution to the tick accumulator.
    ///
    /// Prevents spiral-of-death catch-up after a long stall: one slow frame
    /// can never schedule more than `max_frame_delta / tick_length` ticks.
    pub max_frame_delta: f32,

    /// Lower-left corner of the playable area.
    pub world_min: Position,

    /// Upper-right corner of the playable area.
    pub world_max: Position,

    /// Constant in the armor reduction curve `d × (1 − a / (k + a))`.
    pub armor_constant: f32,

    /// Damage multiplier applied on a critical strike before crit-damage
    /// modifiers.
    pub base_crit_multiplier: f32,

    /// Bonus damage fraction per point of the target's missing-HP fraction
    /// for execute-flagged damage.
    pub execute_scaling: f32,

    /// Fixed-point scale used when quantizing floats into snapshot hashes.
    pub snapshot_quantization: f32,

    /// Base move speed used for lane movement, before modifiers.
    pub base_move_speed: f32,
}

impl SimConfig {
    /// Clamp a position into the configured world bounds, reporting whether
    /// clamping actually happened (a wall hit).
    pub fn clamp_to_bounds(&self, pos: Position) -> (Position, bool) {
        let clamped = pos.clamped(&self.world_min, &self.world_max);
        let hit_wall = clamped != pos;
        (clamped, hit_wall)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_length: 0.05,
            max_frame_delta: 0.25,
            world_min: Position::new(-100.0, -100.0),
            world_max: Position::new(100.0, 100.0),
            armor_constant: 100.0,
            base_crit_multiplier: 2.0,
            execute_scaling: 1.0,
            snapshot_quantization: 1000.0,
            base_move_speed: 3.5,
        }
    }
}

//! Fixed-timestep accumulator clock.
//!
//! The outer loop feeds in variable wall-clock deltas; the clock converts
//! them into a whole number of fixed simulation ticks. Fractional remainders
//! carry over to the next frame so no simulated time is lost.

/// Converts variable frame deltas into whole fixed-size ticks.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock {
    tick_length: f32,
    max_frame_delta: f32,
    accumulator: f32,
    tick: u64,
}

impl FixedClock {
    /// Create a clock. `max_frame_delta` caps a single frame's contribution
    /// so a stalled frame cannot schedule an unbounded catch-up burst.
    pub fn new(tick_length: f32, max_frame_delta: f32) -> Self {
        Self {
            tick_length,
            max_frame_delta,
            accumulator: 0.0,
            tick: 0,
        }
    }

    /// Fixed timestep in seconds.
    #[inline]
    pub fn tick_length(&self) -> f32 {
        self.tick_length
    }

    /// Number of whole ticks completed so far.
    #[inline]
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Feed a frame delta and return how many whole ticks are now due.
    ///
    /// The returned count has already been added to [`current_tick`].
    /// Negative deltas are ignored.
    ///
    /// [`current_tick`]: FixedClock::current_tick
    pub fn advance(&mut self, real_delta: f32) -> u32 {
        let delta = real_delta.clamp(0.0, self.max_frame_delta);
        self.accumulator += delta;

        let mut ticks = 0u32;
        while self.accumulator + 1e-9 >= self.tick_length {
            self.accumulator -= self.tick_length;
            ticks += 1;
        }
        self.tick += u64::from(ticks);
        ticks
    }

    /// Drop any banked fractional time. Used when the caller pauses the
    /// simulation and does not want the pause to replay as a catch-up burst.
    pub fn reset_accumulator(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_fractional_frames() {
        let mut clock = FixedClock::new(0.05, 0.25);
        assert_eq!(clock.advance(0.03), 0);
        assert_eq!(clock.advance(0.03), 1);
        assert_eq!(clock.current_tick(), 1);
    }

    #[test]
    fn large_frame_yields_multiple_ticks() {
        let mut clock = FixedClock::new(0.05, 0.25);
        assert_eq!(clock.advance(0.20), 4);
    }

    #[test]
    fn stall_is_clamped() {
        let mut clock = FixedClock::new(0.05, 0.25);
        // A two-second stall contributes at most max_frame_delta.
        assert_eq!(clock.advance(2.0), 5);
    }

    #[test]
    fn negative_delta_is_ignored() {
        let mut clock = FixedClock::new(0.05, 0.25);
        assert_eq!(clock.advance(-1.0), 0);
        assert_eq!(clock.current_tick(), 0);
    }
}

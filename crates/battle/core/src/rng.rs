//! Deterministic random number generation.
//!
//! The whole simulation draws from a single xorshift32 stream so that two
//! runs from the same seed and command sequence consume randomness in the
//! same order and stay bit-identical. Consumers must never construct their
//! own generator; crit rolls, chance conditions and any future AI draws all
//! share this one stream.
//!
//! # Determinism
//!
//! The stream is reseeded only via explicit [`SimRng::reseed`]. The raw
//! state is exposed for state snapshots so a desync in RNG consumption is
//! caught by replay verification.

/// Fallback seed used when a caller passes zero.
///
/// Xorshift32 has a fixed point at state 0: it would emit zeros forever.
const ZERO_SEED_REPLACEMENT: u32 = 0x9e37_79b9;

/// Single-stream xorshift32 generator.
///
/// # Properties
///
/// - **Deterministic**: same seed always produces the same sequence
/// - **Small state**: 32 bits, trivially snapshotted
/// - **Fast**: three shifts and three xors per draw
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SimRng {
    state: u32,
}

impl SimRng {
    /// Create a generator from a seed. A zero seed is remapped to a fixed
    /// nonzero constant.
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { ZERO_SEED_REPLACEMENT } else { seed },
        }
    }

    /// Replace the stream state. This is the only sanctioned reseed path.
    pub fn reseed(&mut self, seed: u32) {
        self.state = if seed == 0 { ZERO_SEED_REPLACEMENT } else { seed };
    }

    /// Raw generator state, for snapshot hashing and desync detection.
    #[inline]
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Next raw 32-bit draw.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Uniform float in `[0, 1)`.
    ///
    /// Uses the top 24 bits so the value is exactly representable in f32.
    #[inline]
    pub fn next_float(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / 16_777_216.0
    }

    /// Uniform integer in `[min, max]` inclusive.
    pub fn range(&mut self, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        let span = max - min + 1;
        min + self.next_u32() % span
    }

    /// Roll a probability in `[0, 1]`. Always consumes exactly one draw.
    pub fn chance(&mut self, probability: f32) -> bool {
        self.next_float() < probability
    }
}

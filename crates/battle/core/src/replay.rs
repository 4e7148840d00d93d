//! Replay capture and desync detection.
//!
//! A replay is a seed, a tick length and an ordered list of tick-stamped
//! commands. Re-running the same commands against the same seed must
//! reproduce the simulation bit for bit; [`Snapshot`] hashes verify that.
//! The snapshot is a same-build desync detector, not a savegame format —
//! hashes are not comparable across versions.

use crate::action::InterruptCause;
use crate::arena::ComponentArena;
use crate::config::SimConfig;
use crate::entity::Entity;
use crate::error::ReplayError;
use crate::rng::SimRng;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Everything the outside world can ask the simulation to do.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    StartAction {
        entity: Entity,
        ability: String,
        target: Option<Entity>,
    },
    Interrupt {
        entity: Entity,
        cause: InterruptCause,
    },
    Move {
        entity: Entity,
        x: f32,
        y: f32,
    },
    Spawn {
        hp_max: f32,
        x: f32,
        y: f32,
        faction: u8,
    },
    Despawn {
        entity: Entity,
    },
    /// Escape hatch for game-specific commands the core does not interpret.
    Custom {
        name: String,
        data: serde_json::Value,
    },
}

#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct TimedCommand {
    pub tick: u64,
    pub command: Command,
}

/// Ordered, tick-stamped command log with a monotone read cursor.
#[derive(Clone, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ReplayLog {
    commands: Vec<TimedCommand>,
    #[serde(skip)]
    cursor: usize,
}

impl ReplayLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command. Ticks must be non-decreasing.
    pub fn push(&mut self, tick: u64, command: Command) -> Result<(), ReplayError> {
        if let Some(last) = self.commands.last() {
            if tick < last.tick {
                return Err(ReplayError::OutOfOrder {
                    previous: last.tick,
                    found: tick,
                });
            }
        }
        self.commands.push(TimedCommand { tick, command });
        Ok(())
    }

    /// Commands stamped at or before `tick` that have not been consumed
    /// yet. The cursor only moves forward; each command is returned exactly
    /// once, in log order.
    pub fn get_for_tick(&mut self, tick: u64) -> &[TimedCommand] {
        let start = self.cursor;
        let mut end = start;
        while end < self.commands.len() && self.commands[end].tick <= tick {
            end += 1;
        }
        self.cursor = end;
        &self.commands[start..end]
    }

    /// Rewind for a fresh playback of the same log.
    pub fn reset_cursor(&mut self) {
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[TimedCommand] {
        &self.commands
    }

    pub fn to_json(&self) -> Result<String, ReplayError> {
        Ok(serde_json::to_string(&self.commands)?)
    }

    /// Parse a command array, validating tick order.
    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        let commands: Vec<TimedCommand> = serde_json::from_str(json)?;
        for pair in commands.windows(2) {
            if pair[1].tick < pair[0].tick {
                return Err(ReplayError::OutOfOrder {
                    previous: pair[0].tick,
                    found: pair[1].tick,
                });
            }
        }
        Ok(Self { commands, cursor: 0 })
    }
}

/// A full replay: everything needed to reproduce a run.
#[derive(Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ReplayConfig {
    pub seed: u32,
    pub tick_length: f32,
    pub commands: Vec<TimedCommand>,
}

impl ReplayConfig {
    pub fn to_json(&self) -> Result<String, ReplayError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Hash of the tracked simulation state at one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub hash: u64,
    pub rng_state: u32,
    pub entity_count: u32,
}

/// Hash every tracked component of every live entity, in handle order.
/// Floats are quantized to the configured precision first so the hash is
/// insensitive to sub-quantum noise but catches real divergence.
pub fn snapshot(tick: u64, arena: &ComponentArena, rng: &SimRng, config: &SimConfig) -> Snapshot {
    let mut hash = FNV_OFFSET;
    let q = config.snapshot_quantization;
    for entity in arena.entities() {
        fold(&mut hash, u64::from(entity.0));
        fold_f32(&mut hash, arena.hp(entity).unwrap_or(0.0), q);
        fold_f32(&mut hash, arena.hp_max(entity).unwrap_or(0.0), q);
        if let Some(position) = arena.position(entity) {
            fold_f32(&mut hash, position.x, q);
            fold_f32(&mut hash, position.y, q);
        }
        if let Some(faction) = arena.faction(entity) {
            fold(&mut hash, u64::from(faction.0));
        }
    }
    fold(&mut hash, u64::from(rng.state()));
    Snapshot {
        tick,
        hash,
        rng_state: rng.state(),
        entity_count: arena.alive_count(),
    }
}

fn fold(hash: &mut u64, value: u64) {
    for byte in value.to_le_bytes() {
        *hash ^= u64::from(byte);
        *hash = hash.wrapping_mul(FNV_PRIME);
    }
}

fn fold_f32(hash: &mut u64, value: f32, quantization: f32) {
    let quantized = (value * quantization).round() as i64;
    fold(hash, quantized as u64);
}

/// Result of comparing two snapshot streams.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub valid: bool,
    /// Tick of the first divergence, when invalid.
    pub desync_tick: Option<u64>,
}

impl VerifyOutcome {
    pub const VALID: VerifyOutcome = VerifyOutcome {
        valid: true,
        desync_tick: None,
    };
}

/// Compare two runs checkpoint by checkpoint. Never halts the simulation;
/// the caller decides what to do with a desync.
pub fn verify(expected: &[Snapshot], actual: &[Snapshot]) -> VerifyOutcome {
    for (e, a) in expected.iter().zip(actual.iter()) {
        if e != a {
            tracing::warn!(tick = e.tick, "replay desync");
            return VerifyOutcome {
                valid: false,
                desync_tick: Some(e.tick.min(a.tick)),
            };
        }
    }
    if expected.len() != actual.len() {
        let first_extra = expected
            .get(actual.len())
            .or_else(|| actual.get(expected.len()))
            .map(|s| s.tick);
        return VerifyOutcome {
            valid: false,
            desync_tick: first_extra,
        };
    }
    VerifyOutcome::VALID
}

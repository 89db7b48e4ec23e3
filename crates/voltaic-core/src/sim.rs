//! Simulation configuration, clock state and run options.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Engine configuration. Chosen at engine construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Pacing target when a run does not ignore speed.
    pub ticks_per_second: u32,
}

impl SimConfig {
    pub const DEFAULT_TICKS_PER_SECOND: u32 = 20;

    /// Wall-clock budget of one paced tick. A rate of zero is treated as one.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs(1) / self.ticks_per_second.max(1)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: Self::DEFAULT_TICKS_PER_SECOND,
        }
    }
}

/// Per-call options for `Engine::run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Run ticks back-to-back instead of pacing them.
    pub ignore_speed: bool,
    /// Hand a report to the reporter after every tick.
    pub report: bool,
}

impl RunOptions {
    /// Unpaced, no reports. What tests and batch runs usually want.
    pub fn fast() -> Self {
        Self {
            ignore_speed: true,
            report: false,
        }
    }

    pub fn ignore_speed(mut self, ignore: bool) -> Self {
        self.ignore_speed = ignore;
        self
    }

    pub fn report(mut self, report: bool) -> Self {
        self.report = report;
        self
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            ignore_speed: false,
            report: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

/// Mutable simulation state tracked by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimState {
    /// The tick the next step will compute. Starts at 0.
    pub tick: Ticks,
}

impl SimState {
    pub fn new() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of simulation state for desync detection.
///
/// Uses FNV-1a (64-bit) for speed and simplicity. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u8(&mut self, v: u8) {
        self.write(&[v]);
    }

    /// Length-prefixed so adjacent strings cannot alias.
    pub fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write(s.as_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

//! Simulation driver.
//!
//! This module wires controllers into a runnable system. It provides:
//! 1. **Context:** [`SimContext`] carries the clock, the warm-up boundary, and the RNG.
//! 2. **System:** [`MemorySystem`] owns one controller per channel and routes requests.
//! 3. **Workload:** [`Workload`] generates synthetic random, stream, and hammer traffic.

/// Multi-channel memory system.
pub mod system;

/// Synthetic request generators.
pub mod workload;

pub use system::MemorySystem;
pub use workload::{Pattern, Workload};

use crate::common::Clock;
use crate::config::SimConfig;

/// Xorshift64 pseudo-random generator.
///
/// Deterministic for a given seed; a zero seed is remapped since xorshift
/// never leaves the all-zero state.
#[derive(Clone, Debug)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Creates a generator from `seed`.
    pub const fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
        }
    }

    /// Next 64 random bits.
    pub const fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform value in `0..bound` (`0` when `bound` is zero).
    pub const fn below(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        (self.next_u64() % bound as u64) as usize
    }

    /// Uniform value in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Simulation-wide state shared by every channel.
#[derive(Clone, Debug)]
pub struct SimContext {
    clk: Clock,
    warmup_cycles: u64,
    /// Random source for workload generation.
    pub rng: XorShift64,
}

impl SimContext {
    /// Creates a context at clock 0.
    pub const fn new(config: &SimConfig) -> Self {
        Self {
            clk: 0,
            warmup_cycles: config.warmup_cycles,
            rng: XorShift64::new(config.seed),
        }
    }

    /// Current clock.
    pub const fn clock(&self) -> Clock {
        self.clk
    }

    /// Returns `true` while statistics are still being discarded.
    pub const fn in_warmup(&self) -> bool {
        (self.clk as u64) < self.warmup_cycles
    }

    /// Advances one cycle; returns `true` on the cycle warm-up ends.
    pub const fn advance(&mut self) -> bool {
        self.clk += 1;
        self.warmup_cycles > 0 && self.clk as u64 == self.warmup_cycles
    }
}

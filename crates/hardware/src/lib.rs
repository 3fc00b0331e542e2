//! Cycle-accurate DRAM device and memory controller simulator.
//!
//! This crate models DRAM timing at command granularity with the following:
//! 1. **Device:** A hierarchical state/timing tree driven by a per-standard command table (DDR3, DDR4, SALP).
//! 2. **Controller:** Request queues, write-drain hysteresis, refresh, row policies, and pluggable schedulers.
//! 3. **Defense hooks:** An admission oracle that can delay, throttle, or add preventive activates.
//! 4. **Simulation:** A multi-channel memory system, synthetic workloads, configuration, and statistics.

/// Common types (clock, address vectors, configuration errors).
pub mod common;
/// Configuration structures with serde defaults.
pub mod config;
/// Channel memory controller (queues, schedulers, row policy, refresh, oracle).
pub mod controller;
/// DRAM device model (commands, command tables, device tree, standards).
pub mod dram;
/// Memory system and synthetic workloads.
pub mod sim;
/// Controller statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or `Config::from_json`.
pub use crate::config::Config;
/// Channel controller; construct with `Controller::new`.
pub use crate::controller::Controller;
/// Multi-channel system; construct with `MemorySystem::new`.
pub use crate::sim::MemorySystem;

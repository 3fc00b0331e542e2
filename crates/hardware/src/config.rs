//! Configuration system for the memory simulator.
//!
//! This module defines all configuration structures and enums used to parameterize
//! the simulator. It provides:
//! 1. **Defaults:** Baseline controller constants (queue sizes, watermarks, caps).
//! 2. **Structures:** Hierarchical config for the DRAM device, the controller, and the run.
//! 3. **Enums:** DRAM standard, scheduler, and row-policy selection.
//!
//! Configuration is supplied as JSON (every field optional) or built with
//! `Config::default()`.

use serde::{Deserialize, Serialize};

use crate::common::{Clock, ConfigError};
use crate::dram::CommandTable;
use crate::dram::standards::{Ddr3, Ddr4, Salp, Standard};

/// Default configuration constants for the simulator.
mod defaults {
    /// Channels in the memory system.
    pub const CHANNELS: usize = 1;

    /// Ranks per channel.
    pub const RANKS: usize = 1;

    /// Capacity of each controller queue.
    pub const QUEUE_CAPACITY: usize = 64;

    /// Write-queue fill fraction that switches the controller to write mode.
    pub const WRITE_HIGH_WATERMARK: f64 = 0.8;

    /// Write-queue fill fraction below which the controller returns to reads.
    pub const WRITE_LOW_WATERMARK: f64 = 0.2;

    /// Row hits after which FR-FCFS with a cap stops prioritizing a row.
    pub const FRFCFS_CAP: u32 = 16;

    /// Idle cycles before the timeout row policy closes a row.
    pub const TIMEOUT_THRESHOLD: i64 = 120;

    /// Cores issuing requests.
    pub const CORES: usize = 1;

    /// Consecutive serves after which BLISS blacklists a core.
    pub const BLISS_ROW_HIT_CAP: u32 = 4;

    /// Cycles between BLISS blacklist clears.
    pub const BLISS_SHUFFLE_CYCLES: u64 = 10_000;

    /// Requests PAR-BS marks per (core, bank) per batch.
    pub const PARBS_BATCH_CAP: usize = 5;

    /// Seed for the synthetic workload generator.
    pub const SEED: u64 = 0x9E37_79B9_7F4A_7C15;
}

/// Request scheduling algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum SchedulerKind {
    /// First come, first served.
    #[serde(alias = "FCFS")]
    Fcfs,
    /// Ready requests first, then oldest.
    #[serde(alias = "FRFCFS")]
    Frfcfs,
    /// FR-FCFS that stops favoring a row after a number of hits.
    #[default]
    #[serde(alias = "FRFCFS_Cap")]
    FrfcfsCap,
    /// FR-FCFS that never closes a row another request still hits.
    #[serde(alias = "FRFCFS_PriorHit")]
    FrfcfsPriorHit,
    /// Blacklisting scheduler.
    #[serde(alias = "BLISS")]
    Bliss,
    /// Parallelism-aware batch scheduler.
    #[serde(alias = "PARBS")]
    Parbs,
}

/// Row-buffer management policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum RowPolicyKind {
    /// Precharge as soon as nothing else can issue.
    #[serde(alias = "closed")]
    Closed,
    /// Keep rows open until a conflict.
    #[default]
    #[serde(alias = "opened")]
    Opened,
    /// Precharge rows idle for `timeout_threshold` cycles.
    #[serde(alias = "timeout")]
    Timeout,
}

/// DRAM standard with its organization and speed bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "standard")]
pub enum DramStandard {
    /// DDR3.
    #[serde(rename = "DDR3")]
    Ddr3(Ddr3),
    /// DDR4.
    #[serde(rename = "DDR4")]
    Ddr4(Ddr4),
    /// DDR3 with subarray-level parallelism.
    #[serde(rename = "SALP")]
    Salp(Salp),
}

impl Default for DramStandard {
    fn default() -> Self {
        Self::Ddr4(Ddr4::default())
    }
}

impl DramStandard {
    fn standard(&self) -> &dyn Standard {
        match self {
            Self::Ddr3(s) => s,
            Self::Ddr4(s) => s,
            Self::Salp(s) => s,
        }
    }

    /// Standard name.
    pub fn name(&self) -> &'static str {
        self.standard().name()
    }

    /// Builds the command table for `channels` x `ranks`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the organization is malformed.
    pub fn command_table(&self, channels: usize, ranks: usize) -> Result<CommandTable, ConfigError> {
        self.standard().command_table(channels, ranks)
    }
}

/// DRAM device configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct DramConfig {
    /// Standard, organization, and speed bin.
    #[serde(default)]
    pub device: DramStandard,
    /// Channels in the memory system.
    #[serde(default = "DramConfig::default_channels")]
    pub channels: usize,
    /// Ranks per channel.
    #[serde(default = "DramConfig::default_ranks")]
    pub ranks: usize,
}

impl DramConfig {
    fn default_channels() -> usize {
        defaults::CHANNELS
    }

    fn default_ranks() -> usize {
        defaults::RANKS
    }

    /// Builds the command table for this device.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the organization is malformed.
    pub fn command_table(&self) -> Result<CommandTable, ConfigError> {
        self.device.command_table(self.channels, self.ranks)
    }
}

impl Default for DramConfig {
    fn default() -> Self {
        Self {
            device: DramStandard::default(),
            channels: defaults::CHANNELS,
            ranks: defaults::RANKS,
        }
    }
}

/// BLISS parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct BlissConfig {
    /// Consecutive serves after which a core is blacklisted.
    #[serde(default = "BlissConfig::default_row_hit_cap")]
    pub row_hit_cap: u32,
    /// Cycles between blacklist clears.
    #[serde(default = "BlissConfig::default_shuffle_cycles")]
    pub shuffle_cycles: u64,
}

impl BlissConfig {
    fn default_row_hit_cap() -> u32 {
        defaults::BLISS_ROW_HIT_CAP
    }

    fn default_shuffle_cycles() -> u64 {
        defaults::BLISS_SHUFFLE_CYCLES
    }
}

impl Default for BlissConfig {
    fn default() -> Self {
        Self {
            row_hit_cap: defaults::BLISS_ROW_HIT_CAP,
            shuffle_cycles: defaults::BLISS_SHUFFLE_CYCLES,
        }
    }
}

/// PAR-BS parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ParbsConfig {
    /// Requests marked per (core, bank) per batch.
    #[serde(default = "ParbsConfig::default_batch_cap")]
    pub batch_cap: usize,
}

impl ParbsConfig {
    fn default_batch_cap() -> usize {
        defaults::PARBS_BATCH_CAP
    }
}

impl Default for ParbsConfig {
    fn default() -> Self {
        Self {
            batch_cap: defaults::PARBS_BATCH_CAP,
        }
    }
}

/// Channel controller configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ControllerConfig {
    /// Scheduling algorithm.
    #[serde(default)]
    pub scheduler: SchedulerKind,
    /// Row-hit cap for `FrfcfsCap`.
    #[serde(default = "ControllerConfig::default_frfcfs_cap")]
    pub frfcfs_cap: u32,
    /// Row-buffer policy.
    #[serde(default)]
    pub row_policy: RowPolicyKind,
    /// Idle threshold for the timeout row policy.
    #[serde(default = "ControllerConfig::default_timeout_threshold")]
    pub timeout_threshold: Clock,
    /// Capacity of each request queue.
    #[serde(default = "ControllerConfig::default_queue_capacity")]
    pub queue_capacity: usize,
    /// Write-queue fraction that enters write mode.
    #[serde(default = "ControllerConfig::default_write_high_watermark")]
    pub write_high_watermark: f64,
    /// Write-queue fraction that leaves write mode.
    #[serde(default = "ControllerConfig::default_write_low_watermark")]
    pub write_low_watermark: f64,
    /// Suppress periodic refresh.
    #[serde(default)]
    pub disable_refresh: bool,
    /// Cores issuing requests (sizes per-core scheduler state).
    #[serde(default = "ControllerConfig::default_cores")]
    pub cores: usize,
    /// Log every issued command at `trace` level.
    #[serde(default)]
    pub print_cmd_trace: bool,
    /// BLISS parameters.
    #[serde(default)]
    pub bliss: BlissConfig,
    /// PAR-BS parameters.
    #[serde(default)]
    pub parbs: ParbsConfig,
}

impl ControllerConfig {
    fn default_frfcfs_cap() -> u32 {
        defaults::FRFCFS_CAP
    }

    fn default_timeout_threshold() -> Clock {
        defaults::TIMEOUT_THRESHOLD
    }

    fn default_queue_capacity() -> usize {
        defaults::QUEUE_CAPACITY
    }

    fn default_write_high_watermark() -> f64 {
        defaults::WRITE_HIGH_WATERMARK
    }

    fn default_write_low_watermark() -> f64 {
        defaults::WRITE_LOW_WATERMARK
    }

    fn default_cores() -> usize {
        defaults::CORES
    }

    /// Write-queue length at which write mode starts (`ceil(high * capacity)`).
    pub fn write_enter_threshold(&self) -> usize {
        (self.write_high_watermark * self.queue_capacity as f64).ceil() as usize
    }

    /// Write-queue length below which write mode ends (`floor(low * capacity)`).
    pub fn write_exit_threshold(&self) -> usize {
        (self.write_low_watermark * self.queue_capacity as f64).floor() as usize
    }

    /// Checks the controller parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Zero`] for a zero queue capacity or core count and
    /// [`ConfigError::Watermarks`] unless `0 <= low < high <= 1`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Zero {
                field: "queue_capacity",
            });
        }
        if self.cores == 0 {
            return Err(ConfigError::Zero { field: "cores" });
        }
        let (low, high) = (self.write_low_watermark, self.write_high_watermark);
        if !(0.0..=1.0).contains(&low) || !(0.0..=1.0).contains(&high) || low >= high {
            return Err(ConfigError::Watermarks { low, high });
        }
        Ok(())
    }

    /// Checks that each queue can hold one refresh round for `ranks` ranks.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::QueueBelowRanks`] when `queue_capacity < ranks`.
    pub const fn validate_ranks(&self, ranks: usize) -> Result<(), ConfigError> {
        if self.queue_capacity < ranks {
            return Err(ConfigError::QueueBelowRanks {
                capacity: self.queue_capacity,
                ranks,
            });
        }
        Ok(())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerKind::default(),
            frfcfs_cap: defaults::FRFCFS_CAP,
            row_policy: RowPolicyKind::default(),
            timeout_threshold: defaults::TIMEOUT_THRESHOLD,
            queue_capacity: defaults::QUEUE_CAPACITY,
            write_high_watermark: defaults::WRITE_HIGH_WATERMARK,
            write_low_watermark: defaults::WRITE_LOW_WATERMARK,
            disable_refresh: false,
            cores: defaults::CORES,
            print_cmd_trace: false,
            bliss: BlissConfig::default(),
            parbs: ParbsConfig::default(),
        }
    }
}

/// Run-level settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SimConfig {
    /// Cycles run before statistics are reset.
    #[serde(default)]
    pub warmup_cycles: u64,
    /// Seed for the synthetic workload generator.
    #[serde(default = "SimConfig::default_seed")]
    pub seed: u64,
}

impl SimConfig {
    fn default_seed() -> u64 {
        defaults::SEED
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            warmup_cycles: 0,
            seed: defaults::SEED,
        }
    }
}

/// Root configuration structure containing all simulator settings.
///
/// # Examples
///
/// ```
/// use memsim_core::config::{Config, SchedulerKind};
///
/// let config = Config::default();
/// assert_eq!(config.controller.scheduler, SchedulerKind::FrfcfsCap);
/// assert_eq!(config.dram.device.name(), "DDR4");
/// ```
///
/// Deserializing from JSON:
///
/// ```
/// use memsim_core::config::{Config, RowPolicyKind, SchedulerKind};
///
/// let json = r#"{
///     "dram": {
///         "device": { "standard": "SALP", "subarrays": 16 },
///         "channels": 2
///     },
///     "controller": { "scheduler": "FRFCFS_PriorHit", "row_policy": "Timeout" }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.dram.channels, 2);
/// assert_eq!(config.dram.device.name(), "SALP");
/// assert_eq!(config.controller.scheduler, SchedulerKind::FrfcfsPriorHit);
/// assert_eq!(config.controller.row_policy, RowPolicyKind::Timeout);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// DRAM device configuration.
    #[serde(default)]
    pub dram: DramConfig,
    /// Channel controller configuration.
    #[serde(default)]
    pub controller: ControllerConfig,
    /// Run-level settings.
    #[serde(default)]
    pub sim: SimConfig,
}

impl Config {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and any error from
    /// [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the whole configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Zero`] for zero channels or ranks,
    /// [`ConfigError::QueueBelowRanks`] when a queue cannot hold one refresh
    /// per rank, and any other controller error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dram.channels == 0 {
            return Err(ConfigError::Zero { field: "channels" });
        }
        if self.dram.ranks == 0 {
            return Err(ConfigError::Zero { field: "ranks" });
        }
        self.controller.validate()?;
        self.controller.validate_ranks(self.dram.ranks)
    }
}

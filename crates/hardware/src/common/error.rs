//! Configuration errors.
//!
//! Every misconfiguration (unknown names, malformed timing tables, impossible
//! organizations) is detected when a table, controller, or memory system is
//! built. Nothing here is ever raised from `tick()`: runtime contract
//! violations panic instead, because they indicate a bug in the controller or
//! a command table rather than a condition a caller could recover from.

use thiserror::Error;

/// Errors detected while building command tables, controllers, or memory systems.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A command table failed validation.
    #[error("invalid command table for {standard}: {reason}")]
    InvalidTable {
        /// Name of the DRAM standard that produced the table.
        standard: &'static str,
        /// Human-readable description of the violated rule.
        reason: String,
    },

    /// A count or capacity that must be positive was zero.
    #[error("`{field}` must be greater than zero")]
    Zero {
        /// Name of the offending configuration field.
        field: &'static str,
    },

    /// The write-drain watermarks are not `0 <= low < high <= 1`.
    #[error("write watermarks must satisfy 0 <= low < high <= 1 (low = {low}, high = {high})")]
    Watermarks {
        /// Low watermark (leave write mode).
        low: f64,
        /// High watermark (enter write mode).
        high: f64,
    },

    /// A request queue cannot hold one refresh per rank.
    #[error("queue capacity {capacity} is smaller than the {ranks} ranks per channel")]
    QueueBelowRanks {
        /// Configured queue capacity.
        capacity: usize,
        /// Ranks per channel.
        ranks: usize,
    },

    /// Subarray growth was requested for a standard without a subarray level.
    #[error("{standard} has no subarray level")]
    NoSubarrays {
        /// Name of the DRAM standard.
        standard: &'static str,
    },

    /// Subarray growth asked for fewer subarrays than already exist.
    #[error("cannot shrink subarrays from {current} to {requested}")]
    ShrinkSubarrays {
        /// Current subarrays per bank.
        current: usize,
        /// Requested subarrays per bank.
        requested: usize,
    },

    /// The configuration document could not be parsed.
    #[error("malformed configuration: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

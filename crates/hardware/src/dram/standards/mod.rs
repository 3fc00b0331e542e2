//! DRAM standard definitions.
//!
//! Each standard turns an organization and speed grade into a validated
//! [`CommandTable`]. It provides:
//! 1. **DDR4:** Bank-group hierarchy with short/long CAS and activate spacing.
//! 2. **DDR3:** Flat rank/bank hierarchy.
//! 3. **SALP:** DDR3 with per-bank subarrays, each holding a local row buffer.

use crate::common::ConfigError;

use super::table::CommandTable;

/// DDR3 organizations, speed grades, and the table builder shared with SALP.
pub mod ddr3;

/// DDR4 organizations, speed grades, and table.
pub mod ddr4;

/// Subarray-level parallelism on top of DDR3 timing.
pub mod salp;

/// Resolvers and transitions reused across standards.
pub(super) mod shared;

pub use ddr3::{Ddr3, Ddr3Org, Ddr3Speed};
pub use ddr4::{Ddr4, Ddr4Org, Ddr4Speed};
pub use salp::Salp;

/// A DRAM standard that can describe itself as a command table.
pub trait Standard {
    /// Standard name (for example `"DDR4"`).
    fn name(&self) -> &'static str;

    /// Builds the command table for a system of `channels` x `ranks`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the resulting organization is malformed
    /// (for example zero channels or ranks).
    fn command_table(&self, channels: usize, ranks: usize) -> Result<CommandTable, ConfigError>;
}

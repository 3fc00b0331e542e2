//! Subarray-level parallelism (SALP).
//!
//! DDR3 timing with a Subarray level between Bank and Row. Each subarray owns
//! a local row buffer, so activates and precharges to different subarrays of
//! one bank do not wait on each other's tRC/tRAS/tRP. The subarray count can
//! be raised after construction with `DeviceTree::grow_subarrays`.

use serde::{Deserialize, Serialize};

use crate::common::ConfigError;
use crate::dram::table::CommandTable;

use super::Standard;
use super::ddr3::{Ddr3Org, Ddr3Speed, family_table};

mod defaults {
    pub const SUBARRAYS: usize = 8;
}

/// A SALP device configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Salp {
    /// Underlying DDR3 organization.
    #[serde(default)]
    pub org: Ddr3Org,
    /// Underlying DDR3 speed bin.
    #[serde(default)]
    pub speed: Ddr3Speed,
    /// Subarrays per bank.
    #[serde(default = "Salp::default_subarrays")]
    pub subarrays: usize,
}

impl Salp {
    /// Creates a SALP configuration.
    pub const fn new(org: Ddr3Org, speed: Ddr3Speed, subarrays: usize) -> Self {
        Self {
            org,
            speed,
            subarrays,
        }
    }

    fn default_subarrays() -> usize {
        defaults::SUBARRAYS
    }
}

impl Default for Salp {
    fn default() -> Self {
        Self::new(Ddr3Org::default(), Ddr3Speed::default(), defaults::SUBARRAYS)
    }
}

impl Standard for Salp {
    fn name(&self) -> &'static str {
        "SALP"
    }

    fn command_table(&self, channels: usize, ranks: usize) -> Result<CommandTable, ConfigError> {
        family_table(
            "SALP",
            self.org,
            self.speed,
            channels,
            ranks,
            Some(self.subarrays),
        )
    }
}

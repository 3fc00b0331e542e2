//! DRAM device model.
//!
//! This module implements the device side of the simulator. It provides:
//! 1. **Vocabulary:** Hierarchy levels, DRAM commands, and coarse node states.
//! 2. **Command Tables:** Per-standard prerequisite, row-state, transition, and timing tables.
//! 3. **Device Tree:** The arena of channel/rank/bank nodes that enforces timing legality.
//! 4. **Standards:** DDR3, DDR4, and subarray-parallel (SALP) table builders.

use std::fmt;

use crate::common::Clock;

/// Per-standard command tables and their builder.
pub mod table;

/// Arena-based device tree: decode, check, and update.
pub mod tree;

/// DRAM standard definitions (DDR3, DDR4, SALP).
pub mod standards;

pub use table::{CommandTable, CommandTableBuilder, RestorationTiming};
pub use tree::{DeviceTree, Node, NodeId};

/// A level of the DRAM hierarchy, outermost first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    /// Independent command/data bus with its own controller.
    Channel,
    /// Set of chips sharing chip-select.
    Rank,
    /// DDR4 bank group (shares I/O gating between its banks).
    BankGroup,
    /// Bank with its own row buffer.
    Bank,
    /// Subarray with a local row buffer (subarray-level parallelism).
    Subarray,
    /// Row (never instantiated as a node).
    Row,
    /// Column (never instantiated as a node).
    Column,
}

impl Level {
    /// Short display name used in traces and diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Channel => "Channel",
            Self::Rank => "Rank",
            Self::BankGroup => "BankGroup",
            Self::Bank => "Bank",
            Self::Subarray => "Subarray",
            Self::Row => "Row",
            Self::Column => "Column",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// DRAM command vocabulary shared by every supported standard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Command {
    /// Activate: open a row into the row buffer.
    Act,
    /// Precharge: close the row buffer of one bank (or subarray).
    Pre,
    /// Precharge all banks of a rank.
    PreA,
    /// Column read.
    Rd,
    /// Column write.
    Wr,
    /// Column read with auto-precharge.
    RdA,
    /// Column write with auto-precharge.
    WrA,
    /// Auto-refresh of a rank.
    Ref,
    /// Power-down entry.
    Pde,
    /// Power-down exit.
    Pdx,
    /// Self-refresh entry.
    Sre,
    /// Self-refresh exit.
    Srx,
}

impl Command {
    /// Number of commands; sizes every per-command table.
    pub const COUNT: usize = 12;

    /// Every command in table order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Act,
        Self::Pre,
        Self::PreA,
        Self::Rd,
        Self::Wr,
        Self::RdA,
        Self::WrA,
        Self::Ref,
        Self::Pde,
        Self::Pdx,
        Self::Sre,
        Self::Srx,
    ];

    /// Position of this command in per-command tables.
    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// JEDEC mnemonic.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Act => "ACT",
            Self::Pre => "PRE",
            Self::PreA => "PREA",
            Self::Rd => "RD",
            Self::Wr => "WR",
            Self::RdA => "RDA",
            Self::WrA => "WRA",
            Self::Ref => "REF",
            Self::Pde => "PDE",
            Self::Pdx => "PDX",
            Self::Sre => "SRE",
            Self::Srx => "SRX",
        }
    }

    /// Opens a row.
    pub const fn is_opening(self) -> bool {
        matches!(self, Self::Act)
    }

    /// Transfers data on the column bus.
    pub const fn is_accessing(self) -> bool {
        matches!(self, Self::Rd | Self::Wr | Self::RdA | Self::WrA)
    }

    /// Closes one or more rows.
    pub const fn is_closing(self) -> bool {
        matches!(self, Self::Pre | Self::PreA | Self::RdA | Self::WrA)
    }

    /// Refreshes a rank.
    pub const fn is_refreshing(self) -> bool {
        matches!(self, Self::Ref)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Coarse state held by a node (bank open/closed, rank power state).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    /// Row buffer holds an open row.
    Opened,
    /// Row buffer is precharged.
    Closed,
    /// Rank is powered up and accepting commands.
    PowerUp,
    /// Rank in power-down with at least one bank open.
    ActPowerDown,
    /// Rank in power-down with every bank precharged.
    PrePowerDown,
    /// Rank in self-refresh.
    SelfRefresh,
}

/// One timing constraint: after the owning command issues, `cmd` may not
/// target the node until `val` cycles have elapsed.
///
/// With `dist > 1` the constraint is measured from the `dist`-th most recent
/// issue of the owning command (the four-activate window uses `dist = 4`).
/// Sibling entries apply to the target's siblings instead of the target
/// itself and always use `dist = 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimingEntry {
    /// Command being constrained.
    pub cmd: Command,
    /// History depth the delay is measured from.
    pub dist: usize,
    /// Delay in cycles.
    pub val: Clock,
    /// Applies to sibling nodes rather than the target.
    pub sibling: bool,
}

impl TimingEntry {
    /// Target-node constraint measured from the most recent issue.
    pub const fn new(cmd: Command, val: Clock) -> Self {
        Self {
            cmd,
            dist: 1,
            val,
            sibling: false,
        }
    }

    /// Measures the delay from the `dist`-th most recent issue instead.
    pub const fn window(mut self, dist: usize) -> Self {
        self.dist = dist;
        self
    }

    /// Applies the constraint to siblings of the target.
    pub const fn sibling(mut self) -> Self {
        self.sibling = true;
        self
    }
}

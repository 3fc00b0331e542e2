//! Open-row tracking.
//!
//! The controller mirrors which row each row buffer holds, how many column
//! accesses it has served since it opened, and when it was last touched.
//! Schedulers read the hit counts (FR-FCFS with a cap) and row policies scan
//! the timestamps for victims.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::common::addr::{rowgroup, shares_prefix};
use crate::common::{AddrVec, Clock};
use crate::dram::{Command, CommandTable};

/// One open row buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowEntry {
    /// Open row.
    pub row: i32,
    /// Column accesses since the row opened.
    pub hits: u32,
    /// Clock of the most recent open or access.
    pub timestamp: Clock,
}

/// Map from row-group (address prefix above Row) to its open row.
#[derive(Clone, Debug)]
pub struct RowTracker {
    table: Arc<CommandTable>,
    entries: BTreeMap<AddrVec, RowEntry>,
}

impl RowTracker {
    /// Creates an empty tracker for the given standard.
    pub fn new(table: Arc<CommandTable>) -> Self {
        Self {
            table,
            entries: BTreeMap::new(),
        }
    }

    fn split<'a>(&self, addr: &'a [i32]) -> (&'a [i32], i32) {
        let depth = self.table.row_depth();
        (rowgroup(addr, depth), addr[depth])
    }

    /// Records that `cmd` issued to `addr` at `clk`.
    ///
    /// # Panics
    ///
    /// Panics if an access targets a row buffer that is not tracked as open on
    /// the accessed row, or if a closing command finds nothing to close. Both
    /// mean the tracker and the device tree disagree.
    pub fn update(&mut self, cmd: Command, addr: &[i32], clk: Clock) {
        let (group, row) = self.split(addr);

        if cmd.is_opening() {
            let _ = self.entries.entry(group.to_vec()).or_insert(RowEntry {
                row,
                hits: 0,
                timestamp: clk,
            });
        }

        if cmd.is_accessing() {
            let entry = self
                .entries
                .get_mut(group)
                .unwrap_or_else(|| panic!("{cmd} to {addr:?} hits no open row"));
            assert_eq!(entry.row, row, "{cmd} to {addr:?} targets a closed row");
            entry.hits += 1;
            entry.timestamp = clk;
        }

        if cmd.is_closing() {
            let scope = self.table.scope(cmd);
            let before = self.entries.len();
            self.entries
                .retain(|key, _| !shares_prefix(addr, key, scope + 1));
            assert!(
                self.entries.len() < before,
                "{cmd} to {addr:?} closes no tracked row"
            );
        }
    }

    /// Hits served by the row `addr` targets.
    ///
    /// With `to_open_row` set, returns the hits of whatever row is open in
    /// the row group, even if it is not the row `addr` names.
    pub fn hits(&self, addr: &[i32], to_open_row: bool) -> u32 {
        let (group, row) = self.split(addr);
        match self.entries.get(group) {
            Some(entry) if to_open_row || entry.row == row => entry.hits,
            _ => 0,
        }
    }

    /// Row currently open in the row group of `addr`.
    pub fn open_row(&self, addr: &[i32]) -> Option<i32> {
        let (group, _) = self.split(addr);
        self.entries.get(group).map(|entry| entry.row)
    }

    /// Open row buffers in address order.
    pub fn entries(&self) -> impl Iterator<Item = (&AddrVec, &RowEntry)> {
        self.entries.iter()
    }

    /// Number of open row buffers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if every row buffer is closed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

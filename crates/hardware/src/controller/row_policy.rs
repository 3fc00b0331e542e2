//! Row-buffer management policies.
//!
//! When no queued request can issue, the controller asks the row policy for a
//! row buffer to close speculatively.

use crate::common::addr::widen;
use crate::common::{AddrVec, Clock};
use crate::config::RowPolicyKind;

use super::row_table::RowTracker;

/// Speculative-precharge policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowPolicy {
    /// Close any open row as soon as a precharge is legal.
    Closed,
    /// Leave rows open until a conflict forces a precharge.
    Opened,
    /// Close rows left untouched for at least `threshold` cycles.
    Timeout {
        /// Idle cycles before a row becomes a victim.
        threshold: Clock,
    },
}

impl RowPolicy {
    /// Builds the policy named in the configuration.
    pub const fn from_config(kind: RowPolicyKind, threshold: Clock) -> Self {
        match kind {
            RowPolicyKind::Closed => Self::Closed,
            RowPolicyKind::Opened => Self::Opened,
            RowPolicyKind::Timeout => Self::Timeout { threshold },
        }
    }

    /// Picks an open row buffer to precharge, if any.
    ///
    /// Candidates are scanned in address order; the first one the policy
    /// selects and `ready` accepts wins. The returned address is full arity
    /// with wildcards below the row group.
    pub fn get_victim(
        &self,
        clk: Clock,
        rows: &RowTracker,
        arity: usize,
        mut ready: impl FnMut(&[i32]) -> bool,
    ) -> Option<AddrVec> {
        let threshold = match *self {
            Self::Opened => return None,
            Self::Closed => 0,
            Self::Timeout { threshold } => threshold,
        };
        rows.entries()
            .filter(|(_, entry)| clk - entry.timestamp >= threshold)
            .map(|(key, _)| widen(key, arity))
            .find(|addr| ready(addr))
    }
}

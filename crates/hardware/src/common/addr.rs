//! Decoded DRAM address vectors.
//!
//! A request carries one integer coordinate per hierarchy level, outermost
//! first (channel, rank, ..., row, column). This module provides:
//! 1. **Wildcards:** A coordinate of [`WILDCARD`] addresses every node at that level.
//! 2. **Rowgroups:** The address prefix that identifies a row buffer (bank or subarray).
//! 3. **Prefix matching:** Used to find every rowgroup under a closing command's scope.

/// Coordinate value meaning "unspecified": every child at this level.
///
/// Refresh requests use it below the rank level, which turns every bank of the
/// rank into a sibling during timing propagation.
pub const WILDCARD: i32 = -1;

/// One coordinate per hierarchy level, outermost first.
pub type AddrVec = Vec<i32>;

/// Returns the rowgroup key of an address: every coordinate before the row.
///
/// # Arguments
///
/// * `addr` - Full address vector.
/// * `row_depth` - Index of the Row level in the vector.
pub fn rowgroup(addr: &[i32], row_depth: usize) -> &[i32] {
    &addr[..row_depth]
}

/// Returns `true` when the first `len` coordinates of `key` equal those of `addr`.
///
/// Comparison is clamped to the shorter of the two vectors, so a closing
/// command whose scope reaches past the rowgroup compares the whole key.
pub fn shares_prefix(addr: &[i32], key: &[i32], len: usize) -> bool {
    let len = len.min(addr.len()).min(key.len());
    addr[..len] == key[..len]
}

/// Widens a rowgroup key back into a full-arity address, padding with wildcards.
pub fn widen(key: &[i32], arity: usize) -> AddrVec {
    let mut addr = key.to_vec();
    addr.resize(arity, WILDCARD);
    addr
}

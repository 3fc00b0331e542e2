//! Common types shared across the DRAM simulator.
//!
//! This module provides the building blocks used by every other component:
//! 1. **Clock:** The signed cycle counter (`-1` means "never").
//! 2. **Address Vectors:** Decoded per-level coordinates with a wildcard value.
//! 3. **Error Handling:** Configuration errors reported at construction time.

/// Decoded address vectors and rowgroup helpers.
pub mod addr;

/// Configuration error type.
pub mod error;

pub use addr::{AddrVec, WILDCARD};
pub use error::ConfigError;

/// Simulation clock in memory-controller cycles.
///
/// Signed so that `-1` can stand for "never issued" in timing history and
/// "never constrained" in earliest-legal-time tables.
pub type Clock = i64;

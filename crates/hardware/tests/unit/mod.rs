//! # Unit Components
//!
//! This module serves as the central hub for the per-component tests, from
//! the device tree up to the multi-channel memory system.





/// Unit tests for the memory system and synthetic workloads.
pub mod sim;

/// Unit tests for statistics accumulation and reporting.
pub mod stats;

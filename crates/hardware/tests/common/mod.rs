//! Shared test infrastructure.

/// Hand-built command tables and request helpers.
pub mod builder;

/// Controller test context.
pub mod harness;

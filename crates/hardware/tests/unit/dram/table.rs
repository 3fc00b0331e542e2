//! Command Table Builder Tests.
//!
//! Verifies that malformed organizations and timing lists are rejected when
//! the table is built, and that a valid table reports its geometry.

use memsim_core::common::ConfigError;
use memsim_core::controller::request::RequestKind;
use memsim_core::dram::{Command, CommandTableBuilder, Level, TimingEntry};

use crate::common::builder::toy_builder;

fn reason(err: ConfigError) -> String {
    match err {
        ConfigError::InvalidTable { reason, .. } => reason,
        other => panic!("expected InvalidTable, got {other:?}"),
    }
}

// ══════════════════════════════════════════════════════════
// 1. Geometry of a valid table
// ══════════════════════════════════════════════════════════

#[test]
fn toy_table_geometry() {
    let table = toy_builder().build().expect("valid");
    assert_eq!(table.name(), "TOY");
    assert_eq!(table.arity(), 5);
    assert_eq!(table.row_depth(), 3);
    assert_eq!(table.row_buffer_depth(), 2);
    assert_eq!(table.bank_depth(), 2);
    assert_eq!(table.depth_of(Level::Bank), Some(2));
    assert_eq!(table.depth_of(Level::BankGroup), None);
    assert_eq!(table.scope(Command::Act), 3);
    assert_eq!(table.scope(Command::Pre), 2);
    assert_eq!(table.scope(Command::Rd), 4);
    assert_eq!(table.translate(RequestKind::Read), Some(Command::Rd));
    assert_eq!(table.translate(RequestKind::PowerDown), None);
    assert_eq!(table.read_latency(), 12);
    assert_eq!(table.refresh_interval(), 1000);
    assert!(table.restoration().is_none());
}

#[test]
fn history_depth_follows_longest_window() {
    let table = toy_builder()
        .timing(Level::Rank, &[Command::Act], &[
            TimingEntry::new(Command::Act, 20).window(4),
        ])
        .build()
        .expect("valid");
    assert_eq!(table.history_depth(1, Command::Act), 4);
    assert_eq!(table.history_depth(2, Command::Act), 1);
    assert_eq!(table.history_depth(2, Command::Pde), 0);
}

// ══════════════════════════════════════════════════════════
// 2. Rejected organizations
// ══════════════════════════════════════════════════════════

#[test]
fn rejects_missing_row_column_tail() {
    let err = CommandTableBuilder::new(
        "BAD",
        &[Level::Channel, Level::Rank, Level::Bank, Level::Column],
        &[1, 1, 8, 8],
    )
    .refresh_interval(100)
    .build()
    .unwrap_err();
    assert!(reason(err).contains("Row, Column"));
}

#[test]
fn rejects_zero_count() {
    let err = CommandTableBuilder::new(
        "BAD",
        &[Level::Channel, Level::Rank, Level::Bank, Level::Row, Level::Column],
        &[1, 0, 8, 8, 8],
    )
    .refresh_interval(100)
    .build()
    .unwrap_err();
    assert!(reason(err).contains("zero nodes"));
}

#[test]
fn rejects_count_length_mismatch() {
    let err = CommandTableBuilder::new(
        "BAD",
        &[Level::Channel, Level::Rank, Level::Bank, Level::Row, Level::Column],
        &[1, 1, 8],
    )
    .refresh_interval(100)
    .build()
    .unwrap_err();
    assert!(reason(err).contains("counts given"));
}

#[test]
fn rejects_level_outside_organization() {
    let err = toy_builder()
        .timing(Level::BankGroup, &[Command::Act], &[TimingEntry::new(Command::Act, 4)])
        .build()
        .unwrap_err();
    assert!(reason(err).contains("not part of the organization"));
}

#[test]
fn rejects_non_positive_refresh_interval() {
    let err = toy_builder().refresh_interval(0).build().unwrap_err();
    assert!(reason(err).contains("refresh interval"));
}

// ══════════════════════════════════════════════════════════
// 3. Rejected timing entries
// ══════════════════════════════════════════════════════════

#[test]
fn rejects_zero_history_depth() {
    let err = toy_builder()
        .timing(Level::Bank, &[Command::Rd], &[TimingEntry::new(Command::Pre, 5).window(0)])
        .build()
        .unwrap_err();
    assert!(reason(err).contains("history depth 0"));
}

#[test]
fn rejects_sibling_entry_looking_back_further_than_one() {
    let err = toy_builder()
        .timing(Level::Rank, &[Command::Rd], &[
            TimingEntry::new(Command::Rd, 6).window(2).sibling(),
        ])
        .build()
        .unwrap_err();
    assert!(reason(err).contains("sibling entry"));
}

#[test]
fn rejects_used_command_without_scope() {
    let err = toy_builder()
        .timing(Level::Rank, &[Command::Pde], &[TimingEntry::new(Command::Pdx, 4)])
        .build()
        .unwrap_err();
    assert!(reason(err).contains("has no scope"));
}

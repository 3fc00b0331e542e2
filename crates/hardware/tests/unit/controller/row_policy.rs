//! Row Policy Tests.
//!
//! Verifies victim selection for the closed, opened, and timeout policies.

use memsim_core::config::RowPolicyKind;
use memsim_core::controller::row_policy::RowPolicy;
use memsim_core::controller::row_table::RowTracker;
use memsim_core::dram::Command;
use rstest::rstest;

use crate::common::builder::ddr4_addr;
use crate::common::harness::ddr4_table;

const ARITY: usize = 6;

fn one_open_row(at: i64) -> RowTracker {
    let mut rows = RowTracker::new(ddr4_table(1));
    rows.update(Command::Act, &ddr4_addr(0, 0, 0, 5, 0), at);
    rows
}

#[test]
fn closed_picks_any_open_row() {
    let rows = one_open_row(0);
    let victim = RowPolicy::Closed.get_victim(10, &rows, ARITY, |_| true);
    assert_eq!(victim, Some(vec![0, 0, 0, 0, -1, -1]));
}

#[test]
fn opened_never_picks() {
    let rows = one_open_row(0);
    assert_eq!(RowPolicy::Opened.get_victim(1_000_000, &rows, ARITY, |_| true), None);
}

#[rstest]
#[case(119, false)]
#[case(120, true)]
#[case(500, true)]
fn timeout_waits_for_threshold(#[case] clk: i64, #[case] expected: bool) {
    let rows = one_open_row(0);
    let policy = RowPolicy::Timeout { threshold: 120 };
    assert_eq!(policy.get_victim(clk, &rows, ARITY, |_| true).is_some(), expected);
}

#[test]
fn victim_must_be_ready() {
    let rows = one_open_row(0);
    assert_eq!(RowPolicy::Closed.get_victim(10, &rows, ARITY, |_| false), None);
}

#[test]
fn first_ready_candidate_in_address_order_wins() {
    let mut rows = RowTracker::new(ddr4_table(1));
    rows.update(Command::Act, &ddr4_addr(0, 2, 0, 5, 0), 0);
    rows.update(Command::Act, &ddr4_addr(0, 0, 1, 5, 0), 0);
    rows.update(Command::Act, &ddr4_addr(0, 3, 3, 5, 0), 0);

    let mut asked = Vec::new();
    let victim = RowPolicy::Closed.get_victim(10, &rows, ARITY, |addr| {
        asked.push(addr.to_vec());
        addr[2] != 0
    });
    assert_eq!(victim, Some(vec![0, 0, 2, 0, -1, -1]));
    assert_eq!(asked.len(), 2);
}

#[rstest]
#[case(RowPolicyKind::Closed, RowPolicy::Closed)]
#[case(RowPolicyKind::Opened, RowPolicy::Opened)]
#[case(RowPolicyKind::Timeout, RowPolicy::Timeout { threshold: 77 })]
fn built_from_config(#[case] kind: RowPolicyKind, #[case] expected: RowPolicy) {
    assert_eq!(RowPolicy::from_config(kind, 77), expected);
}

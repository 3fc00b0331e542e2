//! Device Tree Property Tests.
//!
//! Drives a two-rank DDR4 tree with random legal command sequences and
//! checks decode stability, readiness monotonicity, and agreement between
//! the tree's row state and the controller's row tracker.

use std::sync::Arc;

use memsim_core::common::Clock;
use memsim_core::controller::row_table::RowTracker;
use memsim_core::dram::{Command, DeviceTree};
use proptest::prelude::*;

use crate::common::harness::ddr4_table;

/// One random access: read or write, rank, group, bank, row.
fn access() -> impl Strategy<Value = (bool, i32, i32, i32, i32)> {
    (any::<bool>(), 0..2i32, 0..4i32, 0..2i32, 0..3i32)
}

/// Issues whatever `target` needs next at the earliest legal clock.
fn step(tree: &mut DeviceTree, rows: &mut RowTracker, target: Command, addr: &[i32], clk: &mut Clock) -> Command {
    let cmd = tree.decode(target, addr);
    *clk = (*clk).max(tree.get_next(cmd, addr));
    assert!(tree.check(cmd, addr, *clk), "{cmd} to {addr:?} not ready at {clk}");
    tree.update(cmd, addr, *clk);
    rows.update(cmd, addr, *clk);
    cmd
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn decode_is_stable(seq in prop::collection::vec(access(), 1..40)) {
        let table = ddr4_table(2);
        let mut tree = DeviceTree::new(Arc::clone(&table), 0);
        let mut rows = RowTracker::new(table);
        let mut clk = 0;
        for (write, rank, group, bank, row) in seq {
            let target = if write { Command::Wr } else { Command::Rd };
            let addr = vec![0, rank, group, bank, row, 0];
            let first = tree.decode(target, &addr);
            // Asking again without an update in between answers the same.
            prop_assert_eq!(tree.decode(target, &addr), first);
            prop_assert_eq!(tree.decode(first, &addr), first);
            let _ = step(&mut tree, &mut rows, target, &addr, &mut clk);
        }
    }

    #[test]
    fn readiness_holds_from_get_next_on(
        seq in prop::collection::vec(access(), 1..40),
        probe in access(),
        slack in 0..64i64,
    ) {
        let table = ddr4_table(2);
        let mut tree = DeviceTree::new(Arc::clone(&table), 0);
        let mut rows = RowTracker::new(table);
        let mut clk = 0;
        for (write, rank, group, bank, row) in seq {
            let target = if write { Command::Wr } else { Command::Rd };
            let _ = step(&mut tree, &mut rows, target, &[0, rank, group, bank, row, 0], &mut clk);
        }

        let (write, rank, group, bank, row) = probe;
        let addr = vec![0, rank, group, bank, row, 0];
        let target = if write { Command::Wr } else { Command::Rd };
        let cmd = tree.decode(target, &addr);
        let next = tree.get_next(cmd, &addr);
        prop_assert!(next >= clk);
        prop_assert!(tree.check(cmd, &addr, next));
        prop_assert!(tree.check(cmd, &addr, next + slack));
    }

    #[test]
    fn row_tracker_mirrors_tree(seq in prop::collection::vec(access(), 1..60)) {
        let table = ddr4_table(2);
        let mut tree = DeviceTree::new(Arc::clone(&table), 0);
        let mut rows = RowTracker::new(table);
        let mut clk = 0;
        let mut accesses = 0;
        for (write, rank, group, bank, row) in seq {
            let target = if write { Command::Wr } else { Command::Rd };
            let addr = vec![0, rank, group, bank, row, 0];
            // Serve the access fully: at most a PRE and an ACT come first.
            for _ in 0..3 {
                if step(&mut tree, &mut rows, target, &addr, &mut clk).is_accessing() {
                    accesses += 1;
                    break;
                }
            }
            prop_assert_eq!(rows.open_row(&addr), Some(row));
        }
        prop_assert!(accesses > 0);

        for rank in 0..2 {
            for group in 0..4 {
                for bank in 0..2 {
                    for row in 0..3 {
                        let addr = [0, rank, group, bank, row, 0];
                        let open = rows.open_row(&addr);
                        prop_assert_eq!(tree.check_row_open(Command::Rd, &addr), open.is_some());
                        prop_assert_eq!(tree.check_row_hit(Command::Rd, &addr), open == Some(row));
                    }
                }
            }
        }
    }
}

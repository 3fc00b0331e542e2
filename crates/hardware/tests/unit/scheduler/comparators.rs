//! Scheduler Comparator Tests.
//!
//! Verifies head selection for FCFS, FR-FCFS, FR-FCFS with a row-hit cap,
//! and FR-FCFS with prior-hit protection against a scripted probe.

use memsim_core::config::{ControllerConfig, SchedulerKind};
use memsim_core::controller::queue::RequestQueue;
use memsim_core::controller::request::{Request, RequestKind};
use memsim_core::controller::scheduler::Scheduler;
use rstest::rstest;

use crate::common::builder::{ddr4_addr, request};
use crate::common::mocks::FakeProbe;

/// DDR4 precharges at bank depth.
const PRE_SCOPE: usize = 3;

fn scheduler(kind: SchedulerKind) -> Scheduler {
    let config = ControllerConfig {
        scheduler: kind,
        ..ControllerConfig::default()
    };
    Scheduler::new(&config, 16)
}

fn read(arrive: i64, addr_vec: Vec<i32>) -> Request {
    let mut req = request(RequestKind::Read, addr_vec);
    req.arrive = arrive;
    req
}

fn queue(reqs: Vec<Request>) -> RequestQueue {
    let mut q = RequestQueue::new(16);
    for req in reqs {
        assert!(q.push(req).is_ok());
    }
    q
}

fn flat(q: &RequestQueue, index: usize) -> u64 {
    q.get(index).map_or(0, |r| r.addr)
}

// ══════════════════════════════════════════════════════════
// 1. FCFS and FR-FCFS
// ══════════════════════════════════════════════════════════

#[test]
fn empty_queue_has_no_head() {
    let mut probe = FakeProbe::new(PRE_SCOPE);
    let q = RequestQueue::new(4);
    assert_eq!(scheduler(SchedulerKind::Fcfs).get_head(&q, &mut probe), None);
}

#[test]
fn fcfs_picks_oldest() {
    let mut probe = FakeProbe::new(PRE_SCOPE);
    let q = queue(vec![
        read(5, ddr4_addr(0, 0, 0, 1, 0)),
        read(2, ddr4_addr(0, 1, 0, 1, 0)),
        read(9, ddr4_addr(0, 2, 0, 1, 0)),
    ]);
    probe.set_ready(flat(&q, 2), true);
    assert_eq!(scheduler(SchedulerKind::Fcfs).get_head(&q, &mut probe), Some(1));
}

#[test]
fn fcfs_tie_keeps_queue_order() {
    let mut probe = FakeProbe::new(PRE_SCOPE);
    let q = queue(vec![
        read(3, ddr4_addr(0, 0, 0, 1, 0)),
        read(3, ddr4_addr(0, 1, 0, 1, 0)),
    ]);
    assert_eq!(scheduler(SchedulerKind::Fcfs).get_head(&q, &mut probe), Some(0));
}

#[rstest]
#[case::frfcfs(SchedulerKind::Frfcfs)]
#[case::capped(SchedulerKind::FrfcfsCap)]
fn ready_beats_older(#[case] kind: SchedulerKind) {
    let mut probe = FakeProbe::new(PRE_SCOPE);
    let q = queue(vec![
        read(0, ddr4_addr(0, 0, 0, 1, 0)),
        read(4, ddr4_addr(0, 1, 0, 1, 0)),
        read(8, ddr4_addr(0, 2, 0, 1, 0)),
    ]);
    probe.set_ready(flat(&q, 1), true);
    probe.set_ready(flat(&q, 2), true);
    assert_eq!(scheduler(kind).get_head(&q, &mut probe), Some(1));
}

#[test]
fn frfcfs_nothing_ready_falls_back_to_oldest() {
    let mut probe = FakeProbe::new(PRE_SCOPE);
    let q = queue(vec![
        read(7, ddr4_addr(0, 0, 0, 1, 0)),
        read(1, ddr4_addr(0, 1, 0, 1, 0)),
    ]);
    assert_eq!(scheduler(SchedulerKind::Frfcfs).get_head(&q, &mut probe), Some(1));
    assert!(probe.ready_calls > 0);
}

// ══════════════════════════════════════════════════════════
// 2. Row-hit cap
// ══════════════════════════════════════════════════════════

#[test]
fn capped_row_loses_priority() {
    let mut probe = FakeProbe::new(PRE_SCOPE);
    let hot = ddr4_addr(0, 0, 0, 1, 0);
    let q = queue(vec![read(0, hot.clone()), read(5, ddr4_addr(0, 1, 0, 1, 0))]);
    probe.set_ready(flat(&q, 0), true);
    probe.set_ready(flat(&q, 1), true);

    // Default cap is 16.
    probe.set_hits(&hot, 16);
    assert_eq!(scheduler(SchedulerKind::FrfcfsCap).get_head(&q, &mut probe), Some(0));
    probe.set_hits(&hot, 17);
    assert_eq!(scheduler(SchedulerKind::FrfcfsCap).get_head(&q, &mut probe), Some(1));
}

#[test]
fn hammer_pairs_compare_by_age() {
    let mut probe = FakeProbe::new(PRE_SCOPE);
    let mut older = read(0, ddr4_addr(0, 0, 0, 1, 0));
    older.is_real_hammer = true;
    let mut younger = read(5, ddr4_addr(0, 1, 0, 1, 0));
    younger.is_real_hammer = true;
    let q = queue(vec![older, younger]);
    probe.set_ready(flat(&q, 1), true);
    assert_eq!(scheduler(SchedulerKind::FrfcfsCap).get_head(&q, &mut probe), Some(0));
}

// ══════════════════════════════════════════════════════════
// 3. Prior-hit protection
// ══════════════════════════════════════════════════════════

#[test]
fn prior_hit_prefers_ready_hit() {
    let mut probe = FakeProbe::new(PRE_SCOPE);
    let q = queue(vec![
        read(0, ddr4_addr(0, 0, 0, 1, 0)),
        read(3, ddr4_addr(0, 1, 0, 1, 0)),
    ]);
    probe.set_ready(flat(&q, 0), true);
    probe.set_ready(flat(&q, 1), true);
    probe.set_hit(flat(&q, 1), true);
    assert_eq!(scheduler(SchedulerKind::FrfcfsPriorHit).get_head(&q, &mut probe), Some(1));
}

#[test]
fn prior_hit_protects_row_another_request_hits() {
    let mut probe = FakeProbe::new(PRE_SCOPE);
    let q = queue(vec![
        // Conflicts with the row B still hits in bank (0, 0).
        read(0, ddr4_addr(0, 0, 0, 2, 0)),
        // Hits bank (0, 0), but not ready yet.
        read(1, ddr4_addr(0, 0, 0, 1, 4)),
        // Ready, different bank group.
        read(2, ddr4_addr(0, 3, 0, 1, 0)),
    ]);
    probe.set_open(flat(&q, 0), true);
    probe.set_hit(flat(&q, 1), true);
    probe.set_ready(flat(&q, 0), true);
    probe.set_ready(flat(&q, 2), true);
    assert_eq!(scheduler(SchedulerKind::FrfcfsPriorHit).get_head(&q, &mut probe), Some(2));
}

#[test]
fn prior_hit_without_competing_hits_takes_oldest() {
    let mut probe = FakeProbe::new(PRE_SCOPE);
    let q = queue(vec![
        read(0, ddr4_addr(0, 0, 0, 2, 0)),
        read(1, ddr4_addr(0, 1, 1, 1, 0)),
    ]);
    probe.set_open(flat(&q, 0), true);
    assert_eq!(scheduler(SchedulerKind::FrfcfsPriorHit).get_head(&q, &mut probe), Some(0));
}

#[rstest]
#[case(SchedulerKind::Fcfs, "FCFS")]
#[case(SchedulerKind::FrfcfsCap, "FRFCFS_Cap")]
#[case(SchedulerKind::Bliss, "Policy")]
#[case(SchedulerKind::Parbs, "Policy")]
fn debug_names_comparator(#[case] kind: SchedulerKind, #[case] name: &str) {
    assert!(format!("{:?}", scheduler(kind)).contains(name));
}

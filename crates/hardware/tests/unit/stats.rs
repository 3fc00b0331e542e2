//! Statistics Tests.
//!
//! Verifies counter accumulation, per-core breakdowns, merging across
//! channels, and the derived averages.

use memsim_core::stats::{ControllerStats, CoreStats, RowOutcome};
use pretty_assertions::assert_eq;

#[test]
fn row_outcomes_count_overall_and_per_core() {
    let mut stats = ControllerStats::default();
    stats.record_row(0, true, RowOutcome::Hit);
    stats.record_row(0, true, RowOutcome::Hit);
    stats.record_row(2, false, RowOutcome::Conflict);
    stats.record_row(1, true, RowOutcome::Miss);

    assert_eq!((stats.row_hits, stats.row_misses, stats.row_conflicts), (2, 1, 1));
    assert_eq!(stats.cores.len(), 3);
    assert_eq!(stats.cores[0].read_row_hits, 2);
    assert_eq!(stats.cores[1].read_row_misses, 1);
    assert_eq!(stats.cores[2].write_row_conflicts, 1);
    assert!((stats.row_hit_rate() - 0.5).abs() < f64::EPSILON);
}

#[test]
fn empty_stats_have_zero_rates() {
    let mut stats = ControllerStats::default();
    stats.finalize();
    assert!(stats.row_hit_rate().abs() < f64::EPSILON);
    assert!(stats.avg_read_latency.abs() < f64::EPSILON);
    assert!(stats.avg_readq_len.abs() < f64::EPSILON);
}

#[test]
fn core_record_picks_counter() {
    let mut core = CoreStats::default();
    core.record(false, RowOutcome::Hit);
    core.record(false, RowOutcome::Miss);
    core.record(true, RowOutcome::Conflict);
    assert_eq!(
        core,
        CoreStats {
            write_row_hits: 1,
            write_row_misses: 1,
            read_row_conflicts: 1,
            ..CoreStats::default()
        }
    );
}

#[test]
fn read_latency_averages_and_clamps() {
    let mut stats = ControllerStats::default();
    stats.record_read(1, 30);
    stats.record_read(1, 50);
    stats.record_read(0, -5);
    stats.finalize();

    assert_eq!(stats.reads_served, 3);
    assert_eq!(stats.read_latency_sum, 80);
    assert_eq!(stats.cores[1].reads_served, 2);
    assert_eq!(stats.cores[1].read_latency_sum, 80);
    assert!((stats.avg_read_latency - 80.0 / 3.0).abs() < 1e-9);
}

#[test]
fn queue_samples_track_sums_and_peaks() {
    let mut stats = ControllerStats::default();
    stats.sample_queues(4, 0, 1);
    stats.sample_queues(2, 6, 0);
    stats.finalize();

    assert_eq!(stats.cycles, 2);
    assert_eq!(stats.readq_len_sum, 6);
    assert_eq!(stats.writeq_len_sum, 6);
    assert_eq!(stats.pending_len_sum, 1);
    assert_eq!((stats.readq_len_max, stats.writeq_len_max), (4, 6));
    assert!((stats.avg_readq_len - 3.0).abs() < f64::EPSILON);
    assert!((stats.avg_writeq_len - 3.0).abs() < f64::EPSILON);
}

#[test]
fn merge_sums_counters_and_keeps_longest_run() {
    let mut a = ControllerStats::default();
    for _ in 0..10 {
        a.sample_queues(1, 0, 0);
    }
    a.activates = 3;
    a.record_row(0, true, RowOutcome::Hit);

    let mut b = ControllerStats::default();
    for _ in 0..7 {
        b.sample_queues(5, 2, 0);
    }
    b.activates = 4;
    b.preventive_dropped = 1;
    b.trr_refreshes = 2;
    b.record_row(1, false, RowOutcome::Miss);
    b.record_row(0, true, RowOutcome::Hit);

    a.merge(&b);
    assert_eq!(a.cycles, 10);
    assert_eq!(a.activates, 7);
    assert_eq!(a.preventive_dropped, 1);
    assert_eq!(a.trr_refreshes, 2);
    assert_eq!(a.row_hits, 2);
    assert_eq!(a.readq_len_sum, 45);
    assert_eq!(a.readq_len_max, 5);
    assert_eq!(a.cores.len(), 2);
    assert_eq!(a.cores[0].read_row_hits, 2);
    assert_eq!(a.cores[1].write_row_misses, 1);
}

#[test]
fn report_prints_selected_sections() {
    let mut stats = ControllerStats::default();
    stats.record_row(0, true, RowOutcome::Hit);
    stats.finalize();
    stats.print_sections(&["rows".to_owned()]);
    stats.print();
}

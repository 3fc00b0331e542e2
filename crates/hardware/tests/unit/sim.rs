//! Simulation Driver Tests.
//!
//! Verifies the random source, warm-up bookkeeping, channel routing in the
//! memory system, and the shape of each synthetic workload.

use memsim_core::config::{Config, DramConfig, SimConfig};
use memsim_core::controller::QueueKind;
use memsim_core::controller::request::{Request, RequestKind};
use memsim_core::common::ConfigError;
use memsim_core::sim::{MemorySystem, Pattern, SimContext, Workload, XorShift64};

use crate::common::harness::{ddr4_table, init_tracing};

fn system(channels: usize) -> MemorySystem {
    init_tracing();
    let config = Config {
        dram: DramConfig {
            channels,
            ..DramConfig::default()
        },
        ..Config::default()
    };
    MemorySystem::new(&config).expect("valid config")
}

fn draw(workload: &mut Workload, n: usize) -> Vec<Request> {
    let mut rng = XorShift64::new(42);
    (0..n).map(|_| workload.next_request(&mut rng)).collect()
}

// ══════════════════════════════════════════════════════════
// 1. Random source and context
// ══════════════════════════════════════════════════════════

#[test]
fn xorshift_is_deterministic() {
    let mut a = XorShift64::new(7);
    let mut b = XorShift64::new(7);
    for _ in 0..16 {
        assert_eq!(a.next_u64(), b.next_u64());
    }
    let mut c = XorShift64::new(8);
    assert_ne!(XorShift64::new(7).next_u64(), c.next_u64());
}

#[test]
fn zero_seed_still_produces_values() {
    let mut rng = XorShift64::new(0);
    assert_ne!(rng.next_u64(), 0);
    assert_eq!(rng.below(0), 0);
}

#[test]
fn bounded_draws_stay_in_range() {
    let mut rng = XorShift64::new(3);
    for _ in 0..1000 {
        assert!(rng.below(10) < 10);
        let x = rng.unit();
        assert!((0.0..1.0).contains(&x));
    }
}

#[test]
fn warmup_ends_exactly_once() {
    let mut ctx = SimContext::new(&SimConfig {
        warmup_cycles: 3,
        seed: 1,
    });
    assert!(ctx.in_warmup());
    let ends: Vec<bool> = (0..5).map(|_| ctx.advance()).collect();
    assert_eq!(ends, vec![false, false, true, false, false]);
    assert!(!ctx.in_warmup());
    assert_eq!(ctx.clock(), 5);
}

#[test]
fn no_warmup_never_signals() {
    let mut ctx = SimContext::new(&SimConfig::default());
    assert!(!ctx.in_warmup());
    assert!((0..10).all(|_| !ctx.advance()));
}

// ══════════════════════════════════════════════════════════
// 2. Memory system
// ══════════════════════════════════════════════════════════

#[test]
fn one_controller_per_channel() {
    let sys = system(2);
    assert_eq!(sys.controllers().len(), 2);
    assert_eq!(sys.table().count(0), 2);
}

#[test]
fn requests_route_by_channel_coordinate() {
    let mut sys = system(2);
    let req = Request::new(RequestKind::Read, vec![1, 0, 0, 0, 5, 0]);
    assert!(sys.send(req).is_ok());
    assert_eq!(sys.controllers()[0].queue_len(QueueKind::Read), 0);
    assert_eq!(sys.controllers()[1].queue_len(QueueKind::Read), 1);
}

#[test]
#[should_panic(expected = "targets channel 2 of 2")]
fn out_of_range_channel_panics() {
    let mut sys = system(2);
    let _ = sys.send(Request::new(RequestKind::Read, vec![2, 0, 0, 0, 5, 0]));
}

#[test]
fn read_is_served_through_the_system() {
    let mut sys = system(1);
    assert!(sys.send(Request::new(RequestKind::Read, vec![0, 0, 0, 0, 5, 0])).is_ok());
    for _ in 0..20 {
        sys.tick();
    }
    assert!(sys.is_active());
    assert_eq!(sys.pending_len(), 1);
    for _ in 0..20 {
        sys.tick();
    }
    assert!(!sys.is_active());
    assert_eq!(sys.context().clock(), 40);

    let stats = sys.finish();
    assert_eq!(stats.reads_served, 1);
    assert_eq!(stats.row_misses, 1);
    assert!((stats.avg_read_latency - 37.0).abs() < f64::EPSILON);
}

#[test]
fn warmup_discards_early_statistics() {
    init_tracing();
    let config = Config {
        sim: SimConfig {
            warmup_cycles: 50,
            seed: 1,
        },
        ..Config::default()
    };
    let mut sys = MemorySystem::new(&config).expect("valid config");
    assert!(sys.send(Request::new(RequestKind::Read, vec![0, 0, 0, 0, 5, 0])).is_ok());
    for _ in 0..60 {
        sys.tick();
    }
    let stats = sys.finish();
    assert_eq!(stats.reads_served, 0);
    assert_eq!(stats.activates, 0);
    assert_eq!(stats.cycles, 10);
}

#[test]
fn subarrays_only_grow_on_salp() {
    let mut sys = system(1);
    assert_eq!(
        sys.grow_subarrays(4),
        Err(ConfigError::NoSubarrays { standard: "DDR4" })
    );

    let config = Config::from_json(r#"{ "dram": { "device": { "standard": "SALP", "subarrays": 2 } } }"#)
        .expect("SALP parses");
    let mut salp = MemorySystem::new(&config).expect("valid config");
    assert!(salp.grow_subarrays(4).is_ok());
}

#[test]
fn invalid_config_is_rejected() {
    let config = Config {
        dram: DramConfig {
            ranks: 0,
            ..DramConfig::default()
        },
        ..Config::default()
    };
    assert_eq!(
        MemorySystem::new(&config).err(),
        Some(ConfigError::Zero { field: "ranks" })
    );
}

#[test]
fn runs_are_reproducible() {
    let run = || {
        let mut sys = system(1);
        let mut workload = Workload::new(Pattern::Random, sys.table(), 0.3, 2);
        sys.run(&mut workload, 3000);
        sys.finish()
    };
    let first = run();
    assert_eq!(first.cycles, 3000);
    assert!(first.issued_reads > 0);
    assert!(first.reads_served > 0);
    assert_eq!(first, run());
}

// ══════════════════════════════════════════════════════════
// 3. Workloads
// ══════════════════════════════════════════════════════════

#[test]
fn random_coordinates_stay_in_organization() {
    let table = ddr4_table(2);
    let mut workload = Workload::new(Pattern::Random, &table, 0.5, 4);
    for req in draw(&mut workload, 500) {
        for (depth, &x) in req.addr_vec.iter().enumerate() {
            assert!(x >= 0 && (x as usize) < table.count(depth), "{:?}", req.addr_vec);
        }
        assert_eq!(req.addr % 64, 0);
        assert!(req.core_id < 4);
        assert!(matches!(req.kind, RequestKind::Read | RequestKind::Write));
    }
}

#[test]
fn write_ratio_selects_kind() {
    let table = ddr4_table(1);
    let mut reads = Workload::new(Pattern::Random, &table, 0.0, 1);
    assert!(draw(&mut reads, 50).iter().all(|r| r.kind == RequestKind::Read));
    let mut writes = Workload::new(Pattern::Random, &table, 1.0, 1);
    assert!(draw(&mut writes, 50).iter().all(|r| r.kind == RequestKind::Write));
}

#[test]
fn stream_walks_columns_then_banks() {
    let table = ddr4_table(1);
    let mut workload = Workload::new(Pattern::Stream, &table, 0.0, 1);
    let reqs = draw(&mut workload, 1025);
    assert_eq!(reqs[0].addr_vec, vec![0, 0, 0, 0, 0, 0]);
    assert_eq!(reqs[1].addr_vec, vec![0, 0, 0, 0, 0, 1]);
    assert_eq!(reqs[1].addr - reqs[0].addr, 64);
    assert_eq!(reqs[1023].addr_vec, vec![0, 0, 0, 0, 0, 1023]);
    assert_eq!(reqs[1024].addr_vec, vec![0, 0, 0, 1, 0, 0]);
}

#[test]
fn hammer_alternates_two_rows_of_one_bank() {
    let table = ddr4_table(1);
    let mut workload = Workload::new(Pattern::Hammer, &table, 0.0, 1);
    assert_eq!(workload.pattern(), Pattern::Hammer);
    let rows: Vec<i32> = draw(&mut workload, 6).iter().map(|r| r.addr_vec[4]).collect();
    assert_eq!(rows, vec![32768, 32770, 32768, 32770, 32768, 32770]);
    for req in draw(&mut workload, 6) {
        assert_eq!(req.kind, RequestKind::Hammer);
        assert_eq!(req.addr_vec[..4].to_vec(), vec![0, 0, 0, 0]);
    }
}

#[test]
fn pattern_names_are_lowercase() {
    let pattern: Pattern = serde_json::from_str(r#""hammer""#).expect("pattern parses");
    assert_eq!(pattern, Pattern::Hammer);
    assert_eq!(serde_json::to_string(&Pattern::Stream).expect("serializes"), r#""stream""#);
}

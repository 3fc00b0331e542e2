use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use memsim_core::config::ControllerConfig;
use memsim_core::controller::Controller;
use memsim_core::controller::observer::{CommandTrace, IssuedCommand};
use memsim_core::controller::request::Request;
use memsim_core::dram::standards::{Ddr4, Standard};
use memsim_core::dram::{Command, CommandTable};
use tracing_subscriber::EnvFilter;

/// Routes `tracing` output to the test writer (`RUST_LOG` selects the level).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Default DDR4 (8Gb x8, 2400R) table with one channel.
pub fn ddr4_table(ranks: usize) -> Arc<CommandTable> {
    Arc::new(
        Ddr4::default()
            .command_table(1, ranks)
            .expect("DDR4 table builds"),
    )
}

/// Default controller configuration without periodic refresh.
pub fn quiet_config() -> ControllerConfig {
    ControllerConfig {
        disable_refresh: true,
        ..ControllerConfig::default()
    }
}

/// Shared completion counter and a callback that bumps it.
pub fn completion_counter() -> (Arc<AtomicUsize>, impl FnMut(&Request) + Send + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let handle = Arc::clone(&count);
    (count, move |_: &Request| {
        let _ = handle.fetch_add(1, Ordering::SeqCst);
    })
}

pub struct TestContext {
    pub ctrl: Controller,
    pub trace: CommandTrace,
}

impl TestContext {
    pub fn new(config: &ControllerConfig, table: Arc<CommandTable>) -> Self {
        init_tracing();
        let mut ctrl = Controller::new(config, table, 0).expect("valid controller config");
        let trace = CommandTrace::new();
        ctrl.add_observer(Box::new(trace.clone()));
        Self { ctrl, trace }
    }

    /// Single-rank DDR4 channel without refresh.
    pub fn ddr4() -> Self {
        Self::new(&quiet_config(), ddr4_table(1))
    }

    pub fn enqueue(&mut self, req: Request) {
        if let Err(req) = self.ctrl.enqueue(req) {
            panic!("controller rejected {req:?}");
        }
    }

    pub fn tick_n(&mut self, n: u64) {
        for _ in 0..n {
            self.ctrl.tick();
        }
    }

    /// Ticks until `done` holds, at most `limit` cycles. Returns whether it did.
    pub fn run_until(&mut self, limit: u64, mut done: impl FnMut(&Controller) -> bool) -> bool {
        for _ in 0..limit {
            if done(&self.ctrl) {
                return true;
            }
            self.ctrl.tick();
        }
        done(&self.ctrl)
    }

    pub fn issued(&self) -> Vec<IssuedCommand> {
        self.trace.snapshot()
    }

    /// Commands issued so far, in order.
    pub fn commands(&self) -> Vec<Command> {
        self.issued().into_iter().map(|c| c.cmd).collect()
    }

    /// Clock of the first issue of `cmd`.
    pub fn first(&self, cmd: Command) -> Option<i64> {
        self.issued().into_iter().find(|c| c.cmd == cmd).map(|c| c.clk)
    }
}

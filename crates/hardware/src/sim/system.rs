//! Multi-channel memory system.

use std::sync::Arc;

use super::{SimContext, Workload};
use crate::common::ConfigError;
use crate::config::Config;
use crate::controller::Controller;
use crate::controller::oracle::AdmissionOracle;
use crate::controller::request::Request;
use crate::dram::CommandTable;
use crate::stats::ControllerStats;

/// One controller per channel, sharing a single command table.
#[derive(Debug)]
pub struct MemorySystem {
    table: Arc<CommandTable>,
    controllers: Vec<Controller>,
    ctx: SimContext,
}

impl MemorySystem {
    /// Builds the command table and one controller per configured channel.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration or the standard's table is
    /// invalid.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let table = Arc::new(config.dram.command_table()?);
        let controllers = (0..table.count(0))
            .map(|ch| Controller::new(&config.controller, Arc::clone(&table), ch as i32))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(
            target: "memsim::sim",
            standard = table.name(),
            channels = controllers.len(),
            "memory system built"
        );
        Ok(Self {
            table,
            controllers,
            ctx: SimContext::new(&config.sim),
        })
    }

    /// Installs an admission oracle on every channel, built per channel by `make`.
    #[must_use]
    pub fn with_oracles(mut self, mut make: impl FnMut(usize) -> Box<dyn AdmissionOracle>) -> Self {
        self.controllers = std::mem::take(&mut self.controllers)
            .into_iter()
            .enumerate()
            .map(|(ch, ctrl)| ctrl.with_oracle(make(ch)))
            .collect();
        self
    }

    /// The shared command table.
    pub fn table(&self) -> &Arc<CommandTable> {
        &self.table
    }

    /// The simulation context.
    pub const fn context(&self) -> &SimContext {
        &self.ctx
    }

    /// Controllers in channel order.
    pub fn controllers(&self) -> &[Controller] {
        &self.controllers
    }

    /// Controller of `channel`.
    pub fn controller_mut(&mut self, channel: usize) -> Option<&mut Controller> {
        self.controllers.get_mut(channel)
    }

    fn route(&mut self, req: &Request) -> &mut Controller {
        let ch = req.addr_vec.first().copied().unwrap_or(-1);
        let channels = self.controllers.len();
        usize::try_from(ch)
            .ok()
            .and_then(|ch| self.controllers.get_mut(ch))
            .unwrap_or_else(|| panic!("request {req:?} targets channel {ch} of {channels}"))
    }

    /// Hands `req` to its channel's controller.
    ///
    /// # Errors
    ///
    /// Returns the request if the channel's controller rejects it.
    ///
    /// # Panics
    ///
    /// Panics if the request's channel coordinate is out of range.
    pub fn send(&mut self, req: Request) -> Result<(), Request> {
        self.route(&req).enqueue(req)
    }

    /// Lets a demand read take over a queued prefetch on its channel.
    pub fn upgrade_prefetch(&mut self, req: &mut Request) -> bool {
        let ctrl = self.route(req);
        ctrl.upgrade_prefetch(req)
    }

    /// Grows the subarray count of every channel.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the standard has no subarray level or the
    /// count would shrink.
    pub fn grow_subarrays(&mut self, subarrays: usize) -> Result<(), ConfigError> {
        self.controllers
            .iter_mut()
            .try_for_each(|ctrl| ctrl.grow_subarrays(subarrays))
    }

    /// Returns `true` while any channel serves a request.
    pub fn is_active(&self) -> bool {
        self.controllers.iter().any(Controller::is_active)
    }

    /// Reads waiting for data across all channels.
    pub fn pending_len(&self) -> usize {
        self.controllers.iter().map(Controller::pending_len).sum()
    }

    /// Advances every channel by one cycle, resetting statistics when warm-up ends.
    pub fn tick(&mut self) {
        let warmed_up = self.ctx.advance();
        for ctrl in &mut self.controllers {
            ctrl.tick();
        }
        if warmed_up {
            tracing::info!(target: "memsim::sim", clk = self.ctx.clock(), "warm-up finished, statistics reset");
            for ctrl in &mut self.controllers {
                ctrl.reset_stats();
            }
        }
    }

    /// Drives `workload` for `cycles` cycles, one request offered per cycle.
    ///
    /// A rejected request is retried on following cycles before a new one is
    /// generated.
    pub fn run(&mut self, workload: &mut Workload, cycles: u64) {
        let mut held: Option<Request> = None;
        for _ in 0..cycles {
            let req = held
                .take()
                .unwrap_or_else(|| workload.next_request(&mut self.ctx.rng));
            held = self.send(req).err();
            self.tick();
        }
        if let Some(req) = held {
            tracing::debug!(target: "memsim::sim", ?req, "request still unaccepted at end of run");
        }
    }

    /// Drains every channel and returns the merged statistics.
    pub fn finish(&mut self) -> ControllerStats {
        let mut total = ControllerStats::default();
        for ctrl in &mut self.controllers {
            total.merge(&ctrl.finish());
        }
        total.finalize();
        total
    }
}

//! Channel memory controller.
//!
//! One `Controller` drives one channel's [`DeviceTree`]. Every `tick()` it:
//! 1. **Completes** the oldest pending read whose data has returned.
//! 2. **Refreshes** ranks on schedule by injecting refresh requests.
//! 3. **Arbitrates** between the activated, other, read, and write queues under
//!    a write-drain hysteresis, letting the scheduler pick a head request.
//! 4. **Issues** the head's next legal command (or a speculative precharge from
//!    the row policy), updating the device tree, the row tracker, the admission
//!    oracle, and any command observers.
//!
//! Readiness is `DeviceTree::check` plus, for activates, the admission oracle.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::common::{Clock, ConfigError};
use crate::config::ControllerConfig;
use crate::dram::{Command, CommandTable, DeviceTree};
use crate::stats::{ControllerStats, RowOutcome};

/// Per-core admission oracle hooks (read-disturbance defenses).
pub mod oracle;

/// Issued-command observers and the trace recorder.
pub mod observer;

/// Bounded request queue.
pub mod queue;

/// Periodic refresh generator.
pub mod refresh;

/// Memory requests.
pub mod request;

/// Speculative precharge policies.
pub mod row_policy;

/// Open-row tracker.
pub mod row_table;

/// Request schedulers.
pub mod scheduler;

use oracle::{AdmissionOracle, NoDefense};
use observer::CommandObserver;
use queue::RequestQueue;
use refresh::Refresh;
use request::{Request, RequestKind};
use row_policy::RowPolicy;
use row_table::RowTracker;
use scheduler::{IssueProbe, Scheduler, SchedulingPolicy};

/// Identifies one of the controller's request queues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueKind {
    /// Demand reads and prefetches.
    Read,
    /// Writes.
    Write,
    /// Requests whose row has been activated on their behalf.
    Activated,
    /// Refresh, power, and preventive-activate requests.
    Other,
}

/// Readiness view over the controller's device state for one cycle.
struct Probe<'a> {
    clk: Clock,
    channel: &'a DeviceTree,
    rows: &'a RowTracker,
    oracle: &'a mut dyn AdmissionOracle,
}

fn final_command(table: &CommandTable, kind: RequestKind) -> Command {
    table
        .translate(kind)
        .unwrap_or_else(|| panic!("{} has no command for {kind:?} requests", table.name()))
}

impl Probe<'_> {
    fn first_command(&self, req: &Request) -> Command {
        let cmd = final_command(self.channel.table(), req.kind);
        self.channel.decode(cmd, &req.addr_vec)
    }

    fn evaluate(&mut self, req: &Request) -> bool {
        let cmd = self.first_command(req);
        if cmd == Command::Act && req.blocked_until.get() > self.clk {
            return false;
        }
        let mut ready = self.channel.check(cmd, &req.addr_vec, self.clk);
        if ready && cmd == Command::Act {
            let until =
                self.oracle
                    .blocked_until(&req.addr_vec, self.clk, req.is_real_hammer, req.core_id);
            if self.clk < until {
                req.blocked_until.set(until);
                ready = false;
            }
        }
        ready
    }
}

impl IssueProbe for Probe<'_> {
    fn is_ready(&mut self, req: &Request) -> bool {
        if let Some((clk, ready)) = req.readiness.get()
            && clk == self.clk
        {
            return ready;
        }
        let ready = self.evaluate(req);
        req.readiness.set(Some((self.clk, ready)));
        ready
    }

    fn is_row_hit(&self, req: &Request) -> bool {
        let cmd = final_command(self.channel.table(), req.kind);
        self.channel.check_row_hit(cmd, &req.addr_vec)
    }

    fn is_row_open(&self, req: &Request) -> bool {
        let cmd = final_command(self.channel.table(), req.kind);
        self.channel.check_row_open(cmd, &req.addr_vec)
    }

    fn row_hits(&self, addr: &[i32], to_open_row: bool) -> u32 {
        self.rows.hits(addr, to_open_row)
    }

    fn precharge_scope(&self) -> usize {
        self.channel.table().scope(Command::Pre)
    }
}

fn head_if_ready(scheduler: &Scheduler, q: &RequestQueue, probe: &mut Probe<'_>) -> Option<usize> {
    let head = scheduler.get_head(q, probe)?;
    let req = q.get(head)?;
    probe.is_ready(req).then_some(head)
}

/// Memory controller for one DRAM channel.
pub struct Controller {
    clk: Clock,
    channel: DeviceTree,
    table: Arc<CommandTable>,
    readq: RequestQueue,
    writeq: RequestQueue,
    actq: RequestQueue,
    otherq: RequestQueue,
    pending: VecDeque<Request>,
    write_mode: bool,
    write_enter: usize,
    write_exit: usize,
    scheduler: Scheduler,
    row_policy: RowPolicy,
    row_table: RowTracker,
    refresh: Option<Refresh>,
    oracle: Box<dyn AdmissionOracle>,
    observers: Vec<Box<dyn CommandObserver>>,
    print_cmd_trace: bool,
    in_flight: usize,
    refresh_until: Clock,
    stats: ControllerStats,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("channel", &self.channel.node(self.channel.root()).id())
            .field("clk", &self.clk)
            .field("readq", &self.readq.len())
            .field("writeq", &self.writeq.len())
            .field("actq", &self.actq.len())
            .field("otherq", &self.otherq.len())
            .field("pending", &self.pending.len())
            .field("write_mode", &self.write_mode)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Creates the controller of channel `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` fails validation or its queues are
    /// smaller than the channel's rank count.
    pub fn new(
        config: &ControllerConfig,
        table: Arc<CommandTable>,
        channel: i32,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        config.validate_ranks(table.count(1))?;
        let tree = DeviceTree::new(Arc::clone(&table), channel);
        let cap = config.queue_capacity;
        let refresh = (!config.disable_refresh).then(|| {
            Refresh::new(channel, table.count(1), table.arity(), table.refresh_interval())
        });
        Ok(Self {
            clk: 0,
            scheduler: Scheduler::new(config, tree.bank_count()),
            channel: tree,
            readq: RequestQueue::new(cap),
            writeq: RequestQueue::new(cap),
            // Holds requests promoted out of the three other queues.
            actq: RequestQueue::new(3 * cap),
            otherq: RequestQueue::new(cap),
            pending: VecDeque::new(),
            write_mode: false,
            write_enter: config.write_enter_threshold(),
            write_exit: config.write_exit_threshold(),
            row_policy: RowPolicy::from_config(config.row_policy, config.timeout_threshold),
            row_table: RowTracker::new(Arc::clone(&table)),
            refresh,
            oracle: Box::new(NoDefense),
            observers: Vec::new(),
            print_cmd_trace: config.print_cmd_trace,
            in_flight: 0,
            refresh_until: -1,
            stats: ControllerStats::default(),
            table,
        })
    }

    /// Replaces the admission oracle.
    #[must_use]
    pub fn with_oracle(mut self, oracle: Box<dyn AdmissionOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    /// Replaces the configured scheduler with a caller-supplied policy.
    #[must_use]
    pub fn with_scheduling_policy(mut self, policy: Box<dyn SchedulingPolicy>) -> Self {
        self.scheduler = Scheduler::with_policy(policy);
        self
    }

    /// Registers an observer of issued commands.
    pub fn add_observer(&mut self, observer: Box<dyn CommandObserver>) {
        self.observers.push(observer);
    }

    /// Current controller clock.
    pub const fn clock(&self) -> Clock {
        self.clk
    }

    /// The channel's device tree.
    pub const fn channel(&self) -> &DeviceTree {
        &self.channel
    }

    /// The open-row tracker.
    pub const fn row_table(&self) -> &RowTracker {
        &self.row_table
    }

    /// The command table this controller runs.
    pub fn table(&self) -> &Arc<CommandTable> {
        &self.table
    }

    /// Statistics collected so far (averages not yet computed).
    pub const fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    /// Returns `true` while the controller drains writes.
    pub const fn write_mode(&self) -> bool {
        self.write_mode
    }

    const fn queue(&self, kind: QueueKind) -> &RequestQueue {
        match kind {
            QueueKind::Read => &self.readq,
            QueueKind::Write => &self.writeq,
            QueueKind::Activated => &self.actq,
            QueueKind::Other => &self.otherq,
        }
    }

    const fn queue_mut(&mut self, kind: QueueKind) -> &mut RequestQueue {
        match kind {
            QueueKind::Read => &mut self.readq,
            QueueKind::Write => &mut self.writeq,
            QueueKind::Activated => &mut self.actq,
            QueueKind::Other => &mut self.otherq,
        }
    }

    const fn queue_for(kind: RequestKind) -> QueueKind {
        match kind {
            RequestKind::Read | RequestKind::Prefetch => QueueKind::Read,
            RequestKind::Write => QueueKind::Write,
            _ => QueueKind::Other,
        }
    }

    /// Occupancy of one queue.
    pub fn queue_len(&self, kind: QueueKind) -> usize {
        self.queue(kind).len()
    }

    /// Reads waiting for their data to return.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` while any read or write is being served.
    pub const fn is_active(&self) -> bool {
        self.in_flight > 0
    }

    /// Returns `true` until the most recent refresh lets activates through again.
    pub const fn is_refreshing(&self) -> bool {
        self.clk <= self.refresh_until
    }

    /// Returns `true` if the queue for `req` has room for it.
    ///
    /// Refresh requests are limited only by capacity; everything else is
    /// also limited by the oracle's per-core throttling coefficient.
    pub fn admission_ok(&mut self, req: &Request) -> bool {
        let kind = Self::queue_for(req.kind);
        if req.kind == RequestKind::Refresh {
            return !self.queue(kind).is_full();
        }
        let is_attacker = req.is_real_hammer || req.kind == RequestKind::Hammer;
        let coeff = self
            .oracle
            .throttling_coeff(&req.addr_vec, req.core_id, is_attacker);
        let q = self.queue(kind);
        (coeff as f64) * (q.max() as f64) > q.len() as f64
    }

    /// Accepts a request, or hands it back when admission fails.
    ///
    /// Hammer requests become reads flagged `is_real_hammer`. A read whose
    /// address matches a queued write completes next cycle without touching
    /// the device.
    ///
    /// # Errors
    ///
    /// Returns the request unchanged when [`admission_ok`](Self::admission_ok) fails.
    ///
    /// # Panics
    ///
    /// Panics if the request's address vector has the wrong arity.
    pub fn enqueue(&mut self, mut req: Request) -> Result<(), Request> {
        assert_eq!(
            req.addr_vec.len(),
            self.table.arity(),
            "request {req:?} has the wrong arity for {}",
            self.table.name()
        );
        if !self.admission_ok(&req) {
            return Err(req);
        }

        req.flat_bank_id = self.channel.flat_bank_id(&req.addr_vec);
        req.dropped = false;
        if req.kind == RequestKind::Hammer {
            req.kind = RequestKind::Read;
            req.is_real_hammer = true;
        }
        req.arrive = self.clk;

        if req.kind.is_read() && self.writeq.iter().any(|w| w.addr == req.addr) {
            req.depart = self.clk + 1;
            self.stats.coalesced_reads += 1;
            self.pending.push_back(req);
            return Ok(());
        }

        if req.kind == RequestKind::Refresh {
            tracing::debug!(target: "memsim::ctrl", clk = self.clk, addr = ?req.addr_vec, "refresh queued");
        }
        let kind = Self::queue_for(req.kind);
        self.queue_mut(kind).push(req)
    }

    /// Queues one of the controller's own refresh requests, ignoring capacity.
    fn queue_refresh(&mut self, mut req: Request) {
        req.flat_bank_id = self.channel.flat_bank_id(&req.addr_vec);
        req.arrive = self.clk;
        tracing::debug!(
            target: "memsim::ctrl",
            clk = self.clk,
            addr = ?req.addr_vec,
            otherq = self.otherq.len(),
            "refresh queued"
        );
        self.otherq.push_unbounded(req);
    }

    /// Upgrades a queued prefetch to the demand read `req`.
    ///
    /// Searches the read queue, the activated queue, and the pending reads for
    /// a prefetch to the same address. On a match the prefetch becomes a read
    /// and takes over `req`'s completion hook.
    pub fn upgrade_prefetch(&mut self, req: &mut Request) -> bool {
        let addr = req.addr;
        let found = self
            .readq
            .iter_mut()
            .chain(self.actq.iter_mut())
            .chain(self.pending.iter_mut())
            .find(|r| r.kind == RequestKind::Prefetch && r.addr == addr);
        match found {
            Some(prefetch) => {
                prefetch.kind = RequestKind::Read;
                prefetch.set_callback(req.take_callback());
                true
            }
            None => false,
        }
    }

    /// Advances the controller by one cycle.
    ///
    /// # Panics
    ///
    /// Panics if the controller would issue a command the device tree rejects.
    pub fn tick(&mut self) {
        self.clk += 1;
        self.stats
            .sample_queues(self.readq.len(), self.writeq.len(), self.pending.len());

        // 1. Serve completed reads
        if self.pending.front().is_some_and(|r| r.depart <= self.clk)
            && let Some(mut req) = self.pending.pop_front()
        {
            let latency = req.depart - req.arrive;
            if latency > 1 {
                self.stats.record_read(req.core_id, latency);
                self.in_flight = self.in_flight.saturating_sub(1);
            }
            req.complete();
        }

        // 2. Refresh
        let due = self.refresh.as_mut().map(Refresh::tick).unwrap_or_default();
        for req in due {
            self.queue_refresh(req);
        }

        // 3. Scheduler bookkeeping
        self.scheduler.on_tick(&mut self.readq);

        // 4. Write-drain hysteresis
        self.update_write_mode();

        // 5. Pick a ready request
        let Some((qkind, index)) = self.select() else {
            self.speculative_precharge();
            return;
        };

        self.serve(qkind, index);
    }

    fn update_write_mode(&mut self) {
        let before = self.write_mode;
        if !self.write_mode {
            self.write_mode = self.writeq.len() >= self.write_enter;
        } else if self.writeq.len() <= self.write_exit && !self.readq.is_empty() {
            self.write_mode = false;
        }
        if before != self.write_mode {
            tracing::debug!(
                target: "memsim::ctrl",
                clk = self.clk,
                write_mode = self.write_mode,
                writeq = self.writeq.len(),
                "write mode switched"
            );
        }
    }

    fn select(&mut self) -> Option<(QueueKind, usize)> {
        let Self {
            clk,
            channel,
            readq,
            writeq,
            actq,
            otherq,
            write_mode,
            scheduler,
            row_table,
            oracle,
            ..
        } = self;
        let mut probe = Probe {
            clk: *clk,
            channel,
            rows: row_table,
            oracle: oracle.as_mut(),
        };

        if let Some(i) = head_if_ready(scheduler, actq, &mut probe) {
            return Some((QueueKind::Activated, i));
        }
        let (kind, q) = if !otherq.is_empty() {
            (QueueKind::Other, &*otherq)
        } else if *write_mode {
            (QueueKind::Write, &*writeq)
        } else {
            (QueueKind::Read, &*readq)
        };
        head_if_ready(scheduler, q, &mut probe).map(|i| (kind, i))
    }

    fn speculative_precharge(&mut self) {
        let clk = self.clk;
        let channel = &self.channel;
        let victim = self.row_policy.get_victim(
            clk,
            &self.row_table,
            self.table.arity(),
            |addr| channel.check(Command::Pre, addr, clk),
        );
        if let Some(addr) = victim {
            self.issue_cmd(Command::Pre, &addr, false, 0);
        }
    }

    fn serve(&mut self, qkind: QueueKind, index: usize) {
        let (kind, core, hammer, addr, first) = match self.queue(qkind).get(index) {
            Some(req) => (
                req.kind,
                req.core_id,
                req.is_real_hammer,
                req.addr_vec.clone(),
                req.is_first_command,
            ),
            None => return,
        };
        let final_cmd = final_command(&self.table, kind);

        if first {
            if let Some(req) = self.queue_mut(qkind).get_mut(index) {
                req.is_first_command = false;
            }
            if matches!(kind, RequestKind::Read | RequestKind::Write | RequestKind::Prefetch) {
                let outcome = if self.channel.check_row_hit(final_cmd, &addr) {
                    RowOutcome::Hit
                } else if self.channel.check_row_open(final_cmd, &addr) {
                    RowOutcome::Conflict
                } else {
                    RowOutcome::Miss
                };
                self.stats.record_row(core, kind.is_read(), outcome);
                self.in_flight += 1;
            }
        }

        let cmd = self.channel.decode(final_cmd, &addr);
        self.issue_cmd(cmd, &addr, hammer, core);

        if cmd != final_cmd {
            if cmd.is_opening()
                && let Some(req) = self.queue_mut(qkind).remove(index)
                && let Err(req) = self.actq.push(req)
            {
                panic!("activated queue overflow with {req:?}");
            }
            return;
        }

        let Some(mut req) = self.queue_mut(qkind).remove(index) else {
            return;
        };
        self.scheduler.on_dequeue(&req);
        if matches!(kind, RequestKind::Read | RequestKind::Write | RequestKind::Prefetch) {
            self.scheduler.on_issue(&req);
        }

        if kind.is_read() {
            req.depart = self.clk + self.table.read_latency();
            self.pending.push_back(req);
        } else {
            if kind == RequestKind::Write {
                self.in_flight = self.in_flight.saturating_sub(1);
            }
            req.depart = self.clk;
            req.complete();
        }
    }

    fn dump_queues(&self) {
        for (name, q) in [
            ("readq", &self.readq),
            ("writeq", &self.writeq),
            ("actq", &self.actq),
            ("otherq", &self.otherq),
        ] {
            for req in q.iter() {
                tracing::error!(target: "memsim::ctrl", queue = name, ?req, "queued");
            }
        }
        for req in &self.pending {
            tracing::error!(target: "memsim::ctrl", queue = "pending", ?req, "queued");
        }
    }

    fn issue_cmd(&mut self, cmd: Command, addr: &[i32], is_attacker: bool, core: usize) {
        if !self.channel.check(cmd, addr, self.clk) {
            tracing::error!(
                target: "memsim::ctrl",
                clk = self.clk,
                %cmd,
                ?addr,
                earliest = self.channel.get_next(cmd, addr),
                "issuing a command before it is legal"
            );
            self.dump_queues();
            panic!("{cmd} to {addr:?} is not legal at clock {}", self.clk);
        }

        self.channel.update(cmd, addr, self.clk);

        if cmd == Command::Pre && self.row_table.hits(addr, true) == 0 {
            self.stats.useless_activates += 1;
        }

        if cmd == Command::Act {
            self.stats.activates += 1;
            self.schedule_preventive(addr, is_attacker, core);
        }

        match cmd {
            Command::Rd | Command::RdA => self.stats.issued_reads += 1,
            Command::Wr | Command::WrA => self.stats.issued_writes += 1,
            Command::Ref => {
                self.stats.refreshes += 1;
                self.stats.trr_refreshes += u64::from(self.oracle.on_refresh(addr, self.clk));
                self.refresh_until = self
                    .refresh_until
                    .max(self.channel.get_next(Command::Act, addr));
            }
            _ => {}
        }

        self.row_table.update(cmd, addr, self.clk);

        if self.print_cmd_trace {
            tracing::info!(target: "memsim::cmd", clk = self.clk, %cmd, ?addr);
        } else {
            tracing::trace!(target: "memsim::cmd", clk = self.clk, %cmd, ?addr);
        }
        for observer in &mut self.observers {
            observer.on_command(cmd, addr, self.clk);
        }
    }

    fn schedule_preventive(&mut self, addr: &[i32], is_attacker: bool, core: usize) {
        let row_depth = self.table.row_depth();
        let mut iteration = 0;
        while let Some(row) = self
            .oracle
            .on_activate(addr, self.clk, iteration, is_attacker, core)
        {
            iteration += 1;
            let mut victim = addr.to_vec();
            victim[row_depth] = row;
            let req = Request::new(RequestKind::Activate, victim).with_core(core);
            match self.enqueue(req) {
                Ok(()) => {
                    self.stats.preventive_activates += 1;
                    tracing::debug!(target: "memsim::ctrl", clk = self.clk, row, "preventive activate queued");
                }
                Err(req) => {
                    self.stats.preventive_dropped += 1;
                    tracing::warn!(
                        target: "memsim::ctrl",
                        clk = self.clk,
                        addr = ?req.addr_vec,
                        "preventive activate dropped, other queue full"
                    );
                }
            }
        }
    }

    /// Returns `true` if some request in `kind` could issue if tRCD were zero.
    pub fn request_held_by_trcd(&self, kind: QueueKind) -> bool {
        self.queue(kind).iter().any(|req| {
            let cmd = self
                .channel
                .decode(final_command(&self.table, req.kind), &req.addr_vec);
            cmd.is_accessing() && self.channel.check_ignoring_trcd(cmd, &req.addr_vec, self.clk)
        })
    }

    /// Returns `true` if some precharge in `kind` waits only on tRAS.
    pub fn request_held_by_tras(&self, kind: QueueKind) -> bool {
        self.queue(kind).iter().any(|req| {
            let cmd = self
                .channel
                .decode(final_command(&self.table, req.kind), &req.addr_vec);
            cmd == Command::Pre && self.channel.check_ignoring_tras(cmd, &req.addr_vec, self.clk)
        })
    }

    /// Grows every bank of a subarray-capable standard to `subarrays`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the standard has no subarray level or the
    /// count would shrink.
    pub fn grow_subarrays(&mut self, subarrays: usize) -> Result<(), ConfigError> {
        self.channel.grow_subarrays(subarrays)
    }

    /// Clears statistics (end of warm-up).
    pub fn reset_stats(&mut self) {
        self.stats = ControllerStats::default();
    }

    /// Completes every pending read and returns the final statistics.
    pub fn finish(&mut self) -> ControllerStats {
        while let Some(mut req) = self.pending.pop_front() {
            let latency = req.depart - req.arrive;
            if latency > 1 {
                self.stats.record_read(req.core_id, latency);
                self.in_flight = self.in_flight.saturating_sub(1);
            }
            req.complete();
        }
        let mut stats = self.stats.clone();
        stats.finalize();
        stats
    }
}

//! PAR-BS: parallelism-aware batch scheduling.
//!
//! When the current batch drains, up to `batch_cap` of the oldest unmarked
//! reads per (core, bank) are marked as the next batch. Cores are ranked
//! shortest-job-first by their heaviest per-bank load, then their total load.
//! Marked requests go first, then ready ones, then higher-ranked cores, then
//! the oldest.

use std::collections::BTreeMap;

use crate::controller::queue::RequestQueue;
use crate::controller::request::Request;

use super::{IssueProbe, SchedulingPolicy, fcfs};

/// Batch scheduler state.
#[derive(Clone, Debug)]
pub struct Parbs {
    cores: usize,
    banks: usize,
    batch_cap: usize,
    marked_load: usize,
    rank: Vec<usize>,
    max_load: Vec<usize>,
    total_load: Vec<usize>,
}

impl Parbs {
    /// Creates a PAR-BS scheduler.
    ///
    /// # Arguments
    ///
    /// * `cores` - Number of cores issuing requests.
    /// * `banks` - Banks per channel (flat bank ids are below this).
    /// * `batch_cap` - Requests marked per (core, bank) per batch.
    pub fn new(cores: usize, banks: usize, batch_cap: usize) -> Self {
        let cores = cores.max(1);
        Self {
            cores,
            banks,
            batch_cap,
            marked_load: 0,
            rank: vec![0; cores],
            max_load: vec![0; cores],
            total_load: vec![0; cores],
        }
    }

    /// Marked requests still waiting to be served.
    pub const fn marked_load(&self) -> usize {
        self.marked_load
    }

    /// Current rank of `core` (higher is served first).
    pub fn rank_of(&self, core: usize) -> usize {
        self.rank.get(core).copied().unwrap_or(0)
    }

    fn form_batch(&mut self, readq: &mut RequestQueue) {
        self.max_load.fill(0);
        self.total_load.fill(0);

        let mut groups: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();
        for (i, req) in readq.iter().enumerate() {
            if req.marked {
                continue;
            }
            if req.core_id >= self.cores || req.flat_bank_id >= self.banks {
                tracing::warn!(
                    target: "memsim::sched",
                    core = req.core_id,
                    bank = req.flat_bank_id,
                    "request outside the batch table"
                );
                continue;
            }
            groups
                .entry((req.core_id, req.flat_bank_id))
                .or_default()
                .push(i);
        }

        for ((core, _), mut members) in groups {
            members.sort_by_key(|&i| readq.get(i).map_or(i64::MAX, |r| r.arrive));
            let marked = members.len().min(self.batch_cap);
            for &i in &members[..marked] {
                if let Some(req) = readq.get_mut(i) {
                    req.marked = true;
                }
            }
            self.marked_load += marked;
            self.total_load[core] += marked;
            self.max_load[core] = self.max_load[core].max(marked);
        }
    }

    fn assign_rank(&mut self) {
        let mut order: Vec<usize> = (0..self.cores).collect();
        // Heaviest first; the lightest core ends up with the highest rank.
        order.sort_by(|&a, &b| {
            (self.max_load[b], self.total_load[b]).cmp(&(self.max_load[a], self.total_load[a]))
        });
        for (position, core) in order.into_iter().enumerate() {
            self.rank[core] = position;
        }
    }
}

impl SchedulingPolicy for Parbs {
    fn prefers(&self, a: &Request, b: &Request, probe: &mut dyn IssueProbe) -> bool {
        if a.marked != b.marked {
            return a.marked;
        }
        let ready_a = probe.is_ready(a);
        let ready_b = probe.is_ready(b);
        if ready_a != ready_b {
            return ready_a;
        }
        let rank_a = self.rank_of(a.core_id);
        let rank_b = self.rank_of(b.core_id);
        if rank_a != rank_b {
            return rank_a > rank_b;
        }
        fcfs(a, b)
    }

    fn on_tick(&mut self, readq: &mut RequestQueue) {
        if self.marked_load > 0 || readq.len() < 3 {
            return;
        }
        self.form_batch(readq);
        self.assign_rank();
        tracing::trace!(
            target: "memsim::sched",
            marked = self.marked_load,
            ranks = ?self.rank,
            "formed batch"
        );
    }

    fn on_dequeue(&mut self, req: &Request) {
        if req.marked {
            self.marked_load = self.marked_load.saturating_sub(1);
        }
    }
}

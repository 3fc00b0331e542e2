//! BLISS: blacklisting memory scheduler.
//!
//! A core that gets `row_hit_cap` consecutive requests served is blacklisted
//! until the next shuffle. Requests from cores that are not blacklisted go
//! first, then ready requests, then the oldest.

use crate::controller::queue::RequestQueue;
use crate::controller::request::Request;

use super::{IssueProbe, SchedulingPolicy, fcfs};

/// Blacklisting scheduler state.
#[derive(Clone, Debug)]
pub struct Bliss {
    marks: Vec<bool>,
    row_hit_cap: u32,
    shuffle_cycles: u64,
    shuffle_left: u64,
    last_core: Option<usize>,
    streak: u32,
}

impl Bliss {
    /// Creates a BLISS scheduler for `cores` cores.
    ///
    /// # Arguments
    ///
    /// * `cores` - Number of cores issuing requests.
    /// * `row_hit_cap` - Consecutive serves after which a core is blacklisted.
    /// * `shuffle_cycles` - Cycles between blacklist clears.
    pub fn new(cores: usize, row_hit_cap: u32, shuffle_cycles: u64) -> Self {
        Self {
            marks: vec![false; cores.max(1)],
            row_hit_cap,
            shuffle_cycles,
            shuffle_left: shuffle_cycles,
            last_core: None,
            streak: 0,
        }
    }

    /// Returns `true` if `core` is currently blacklisted.
    pub fn is_blacklisted(&self, core: usize) -> bool {
        self.marks.get(core).copied().unwrap_or(false)
    }

    fn mark(&mut self, core: usize) {
        if core >= self.marks.len() {
            self.marks.resize(core + 1, false);
        }
        self.marks[core] = true;
    }
}

impl SchedulingPolicy for Bliss {
    fn prefers(&self, a: &Request, b: &Request, probe: &mut dyn IssueProbe) -> bool {
        let clean_a = !self.is_blacklisted(a.core_id);
        let clean_b = !self.is_blacklisted(b.core_id);
        if clean_a != clean_b {
            return clean_a;
        }
        let ready_a = probe.is_ready(a);
        let ready_b = probe.is_ready(b);
        if ready_a != ready_b {
            return ready_a;
        }
        fcfs(a, b)
    }

    fn on_tick(&mut self, _readq: &mut RequestQueue) {
        if self.shuffle_left > 0 {
            self.shuffle_left -= 1;
        } else {
            self.shuffle_left = self.shuffle_cycles;
            self.marks.fill(false);
        }
    }

    fn on_issue(&mut self, req: &Request) {
        let same = self.last_core == Some(req.core_id);
        if same && self.streak < self.row_hit_cap {
            self.streak += 1;
        } else if same && self.streak == self.row_hit_cap {
            self.mark(req.core_id);
            self.streak = 1;
        } else {
            self.streak = 1;
        }
        self.last_core = Some(req.core_id);
    }
}

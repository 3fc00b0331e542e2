//! Request schedulers.
//!
//! A scheduler picks the head of a request queue: the request whose next
//! command the controller tries to issue this cycle. It provides:
//! 1. **Built-in comparators:** FCFS, FR-FCFS, FR-FCFS with a row-hit cap, and
//!    FR-FCFS that never closes a row another queued request still hits.
//! 2. **Pluggable policies:** Stateful schedulers (BLISS, PAR-BS, or a caller's
//!    own) implement [`SchedulingPolicy`] and receive per-cycle, issue, and
//!    dequeue notifications.
//!
//! Readiness and row-buffer state come from an [`IssueProbe`] supplied by the
//! controller, so schedulers never touch the device tree directly.

use crate::config::{ControllerConfig, SchedulerKind};

use super::queue::RequestQueue;
use super::request::Request;

/// Blacklisting scheduler.
pub mod bliss;

/// Parallelism-aware batch scheduler.
pub mod parbs;

pub use bliss::Bliss;
pub use parbs::Parbs;

/// Controller-side view of readiness and row-buffer state.
pub trait IssueProbe {
    /// Returns `true` if the request's next command may issue this cycle.
    fn is_ready(&mut self, req: &Request) -> bool;

    /// Returns `true` if the request targets the currently open row.
    fn is_row_hit(&self, req: &Request) -> bool;

    /// Returns `true` if the request's row buffer holds any open row.
    fn is_row_open(&self, req: &Request) -> bool;

    /// Hits served by the row `addr` targets (or by the open row, with `to_open_row`).
    fn row_hits(&self, addr: &[i32], to_open_row: bool) -> u32;

    /// Depth of the precharge command's scope (the row-group depth).
    fn precharge_scope(&self) -> usize;
}

/// A stateful scheduling policy.
pub trait SchedulingPolicy: Send {
    /// Returns `true` if `a` should be scheduled ahead of `b`.
    fn prefers(&self, a: &Request, b: &Request, probe: &mut dyn IssueProbe) -> bool;

    /// Called once per controller cycle, before any request is picked.
    fn on_tick(&mut self, _readq: &mut RequestQueue) {}

    /// Called when a request's final command issues.
    fn on_issue(&mut self, _req: &Request) {}

    /// Called when a request leaves its queue.
    fn on_dequeue(&mut self, _req: &Request) {}
}

enum Comparator {
    Fcfs,
    Frfcfs,
    FrfcfsCap(u32),
    FrfcfsPriorHit,
    Policy(Box<dyn SchedulingPolicy>),
}

/// Oldest first; ties keep the earlier queue position.
pub(crate) const fn fcfs(a: &Request, b: &Request) -> bool {
    a.arrive <= b.arrive
}

/// Ready first, then oldest.
pub(crate) fn frfcfs(a: &Request, b: &Request, probe: &mut dyn IssueProbe) -> bool {
    let ready_a = probe.is_ready(a);
    let ready_b = probe.is_ready(b);
    if ready_a != ready_b {
        return ready_a;
    }
    fcfs(a, b)
}

impl Comparator {
    fn prefers(&self, a: &Request, b: &Request, probe: &mut dyn IssueProbe) -> bool {
        match self {
            Self::Fcfs => fcfs(a, b),
            Self::Frfcfs => frfcfs(a, b, probe),
            Self::FrfcfsCap(cap) => {
                if a.is_real_hammer && b.is_real_hammer {
                    return fcfs(a, b);
                }
                let ready_a = probe.is_ready(a) && probe.row_hits(&a.addr_vec, false) <= *cap;
                let ready_b = probe.is_ready(b) && probe.row_hits(&b.addr_vec, false) <= *cap;
                if ready_a != ready_b {
                    return ready_a;
                }
                fcfs(a, b)
            }
            Self::FrfcfsPriorHit => {
                let hit_a = probe.is_ready(a) && probe.is_row_hit(a);
                let hit_b = probe.is_ready(b) && probe.is_row_hit(b);
                if hit_a != hit_b {
                    return hit_a;
                }
                fcfs(a, b)
            }
            Self::Policy(policy) => policy.prefers(a, b, probe),
        }
    }
}

/// Picks the head of a request queue.
pub struct Scheduler {
    cmp: Comparator,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self.cmp {
            Comparator::Fcfs => "FCFS",
            Comparator::Frfcfs => "FRFCFS",
            Comparator::FrfcfsCap(_) => "FRFCFS_Cap",
            Comparator::FrfcfsPriorHit => "FRFCFS_PriorHit",
            Comparator::Policy(_) => "Policy",
        };
        f.debug_struct("Scheduler").field("kind", &name).finish()
    }
}

impl Scheduler {
    /// Builds the scheduler named in the controller configuration.
    pub fn new(config: &ControllerConfig, banks: usize) -> Self {
        let cmp = match config.scheduler {
            SchedulerKind::Fcfs => Comparator::Fcfs,
            SchedulerKind::Frfcfs => Comparator::Frfcfs,
            SchedulerKind::FrfcfsCap => Comparator::FrfcfsCap(config.frfcfs_cap),
            SchedulerKind::FrfcfsPriorHit => Comparator::FrfcfsPriorHit,
            SchedulerKind::Bliss => Comparator::Policy(Box::new(Bliss::new(
                config.cores,
                config.bliss.row_hit_cap,
                config.bliss.shuffle_cycles,
            ))),
            SchedulerKind::Parbs => Comparator::Policy(Box::new(Parbs::new(
                config.cores,
                banks,
                config.parbs.batch_cap,
            ))),
        };
        Self { cmp }
    }

    /// Wraps a caller-supplied policy.
    pub fn with_policy(policy: Box<dyn SchedulingPolicy>) -> Self {
        Self {
            cmp: Comparator::Policy(policy),
        }
    }

    /// Forwards the per-cycle notification to a stateful policy.
    pub fn on_tick(&mut self, readq: &mut RequestQueue) {
        if let Comparator::Policy(policy) = &mut self.cmp {
            policy.on_tick(readq);
        }
    }

    /// Forwards the issue notification to a stateful policy.
    pub fn on_issue(&mut self, req: &Request) {
        if let Comparator::Policy(policy) = &mut self.cmp {
            policy.on_issue(req);
        }
    }

    /// Forwards the dequeue notification to a stateful policy.
    pub fn on_dequeue(&mut self, req: &Request) {
        if let Comparator::Policy(policy) = &mut self.cmp {
            policy.on_dequeue(req);
        }
    }

    fn fold(&self, q: &RequestQueue, probe: &mut dyn IssueProbe) -> Option<usize> {
        let mut head = 0;
        let first = q.get(0)?;
        let mut best = first;
        for (i, req) in q.iter().enumerate().skip(1) {
            if !self.cmp.prefers(best, req, probe) {
                head = i;
                best = req;
            }
        }
        Some(head)
    }

    /// Index of the request to serve next, or `None` if nothing should issue.
    pub fn get_head(&self, q: &RequestQueue, probe: &mut dyn IssueProbe) -> Option<usize> {
        let head = self.fold(q, probe)?;
        if !matches!(self.cmp, Comparator::FrfcfsPriorHit) {
            return Some(head);
        }

        let req = q.get(head)?;
        if probe.is_ready(req) && probe.is_row_hit(req) {
            return Some(head);
        }

        // Never close a row some other queued request still hits.
        let scope = probe.precharge_scope();
        let hit_groups: Vec<&[i32]> = q
            .iter()
            .filter(|r| probe.is_row_hit(r))
            .map(|r| &r.addr_vec[..=scope])
            .collect();

        let mut best: Option<(usize, &Request)> = None;
        for (i, req) in q.iter().enumerate() {
            if !probe.is_row_hit(req)
                && probe.is_row_open(req)
                && hit_groups.contains(&&req.addr_vec[..=scope])
            {
                continue;
            }
            best = match best {
                Some((j, b)) if frfcfs(b, req, probe) => Some((j, b)),
                _ => Some((i, req)),
            };
        }
        best.map(|(i, _)| i)
    }
}

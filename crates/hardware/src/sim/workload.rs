//! Synthetic request generators.
//!
//! Addresses are drawn directly as coordinate vectors so every pattern stays
//! inside the organization of the command table it was built for.

use serde::{Deserialize, Serialize};

use super::XorShift64;
use crate::common::AddrVec;
use crate::controller::request::{Request, RequestKind};
use crate::dram::CommandTable;

/// Bytes per request, used to form the flat address.
const LINE_BYTES: u64 = 64;

/// Access pattern of a synthetic workload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    /// Every coordinate uniform at random.
    #[default]
    Random,
    /// Consecutive columns, then banks, then rows: mostly row hits.
    Stream,
    /// Alternates two aggressor rows of one bank, flagged as hammering.
    Hammer,
}

/// Generates requests for one table's organization.
#[derive(Clone, Debug)]
pub struct Workload {
    pattern: Pattern,
    counts: Vec<usize>,
    row_depth: usize,
    write_ratio: f64,
    cores: usize,
    cursor: u64,
}

impl Workload {
    /// Creates a generator over `table`'s organization.
    ///
    /// `write_ratio` is clamped to `[0, 1]`; `cores` of zero is treated as one.
    pub fn new(pattern: Pattern, table: &CommandTable, write_ratio: f64, cores: usize) -> Self {
        Self {
            pattern,
            counts: table.counts().to_vec(),
            row_depth: table.row_depth(),
            write_ratio: write_ratio.clamp(0.0, 1.0),
            cores: cores.max(1),
            cursor: 0,
        }
    }

    /// The pattern this generator follows.
    pub const fn pattern(&self) -> Pattern {
        self.pattern
    }

    /// Mixed-radix flat address of `addr`, one line per column.
    fn flatten(&self, addr: &[i32]) -> u64 {
        let index = addr
            .iter()
            .zip(&self.counts)
            .fold(0u64, |acc, (&x, &n)| acc * n as u64 + x.max(0) as u64);
        index * LINE_BYTES
    }

    /// Coordinates of the `n`th line in stream order: column fastest, then the
    /// levels above the row, then the row.
    fn stream_coords(&self, mut n: u64) -> AddrVec {
        let arity = self.counts.len();
        let mut addr = vec![0; arity];
        let mut order: Vec<usize> = vec![arity - 1];
        order.extend((0..self.row_depth).rev());
        order.push(self.row_depth);
        order.extend(self.row_depth + 1..arity - 1);
        for depth in order {
            let n_here = self.counts[depth].max(1) as u64;
            addr[depth] = (n % n_here) as i32;
            n /= n_here;
        }
        addr
    }

    /// Produces the next request.
    pub fn next_request(&mut self, rng: &mut XorShift64) -> Request {
        let core = rng.below(self.cores);
        let (kind, addr) = match self.pattern {
            Pattern::Random => {
                let addr = self.counts.iter().map(|&n| rng.below(n) as i32).collect();
                (self.access_kind(rng), addr)
            }
            Pattern::Stream => {
                let addr = self.stream_coords(self.cursor);
                self.cursor += 1;
                (self.access_kind(rng), addr)
            }
            Pattern::Hammer => {
                let mut addr = vec![0; self.counts.len()];
                let rows = self.counts[self.row_depth].max(1);
                let base = rows / 2;
                let aggressor = if self.cursor % 2 == 0 { base } else { (base + 2) % rows };
                self.cursor += 1;
                addr[self.row_depth] = aggressor as i32;
                if let Some(col) = addr.last_mut() {
                    *col = rng.below(*self.counts.last().unwrap_or(&1)) as i32;
                }
                (RequestKind::Hammer, addr)
            }
        };
        let flat = self.flatten(&addr);
        Request::new(kind, addr).with_addr(flat).with_core(core)
    }

    fn access_kind(&self, rng: &mut XorShift64) -> RequestKind {
        if rng.unit() < self.write_ratio {
            RequestKind::Write
        } else {
            RequestKind::Read
        }
    }
}

//! Periodic all-bank refresh.

use crate::common::{Clock, WILDCARD};

use super::request::{Request, RequestKind};

/// Generates one refresh request per rank every refresh interval.
#[derive(Clone, Debug)]
pub struct Refresh {
    clk: Clock,
    refreshed: Clock,
    interval: Clock,
    channel: i32,
    ranks: usize,
    arity: usize,
}

impl Refresh {
    /// Creates a refresh generator for one channel.
    ///
    /// # Arguments
    ///
    /// * `channel` - Channel coordinate written into generated requests.
    /// * `ranks` - Ranks in the channel.
    /// * `arity` - Address vector length.
    /// * `interval` - Cycles between refresh rounds (tREFI).
    pub const fn new(channel: i32, ranks: usize, arity: usize, interval: Clock) -> Self {
        Self {
            clk: 0,
            refreshed: 0,
            interval,
            channel,
            ranks,
            arity,
        }
    }

    /// Advances one cycle and returns the refresh requests due now.
    pub fn tick(&mut self) -> Vec<Request> {
        self.clk += 1;
        if self.clk - self.refreshed < self.interval {
            return Vec::new();
        }
        self.refreshed = self.clk;
        (0..self.ranks)
            .map(|rank| {
                let mut addr = vec![WILDCARD; self.arity];
                addr[0] = self.channel;
                addr[1] = rank as i32;
                Request::new(RequestKind::Refresh, addr)
            })
            .collect()
    }
}

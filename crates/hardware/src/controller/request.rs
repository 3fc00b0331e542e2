//! Memory requests as seen by a channel controller.

use std::cell::Cell;
use std::fmt;

use crate::common::{AddrVec, Clock};

/// Completion hook invoked when a request is served.
pub type Completion = Box<dyn FnMut(&Request) + Send>;

/// What a request asks the memory system to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Demand read.
    Read,
    /// Demand write.
    Write,
    /// Rank refresh (generated by the controller).
    Refresh,
    /// Rank power-down.
    PowerDown,
    /// Rank self-refresh.
    SelfRefresh,
    /// Read issued by an access pattern flagged as row-hammering.
    Hammer,
    /// Bare row activation (preventive refresh of a victim row).
    Activate,
    /// Speculative read that may later be upgraded to a demand read.
    Prefetch,
}

impl RequestKind {
    /// Number of kinds; sizes per-kind tables.
    pub const COUNT: usize = 8;

    /// Position of this kind in per-kind tables.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Reads and prefetches return data to the requester.
    pub const fn is_read(self) -> bool {
        matches!(self, Self::Read | Self::Prefetch)
    }
}

/// A request queued at a channel controller.
pub struct Request {
    /// Request kind.
    pub kind: RequestKind,
    /// Flat physical address (informational).
    pub addr: u64,
    /// Decoded coordinates, one per hierarchy level.
    pub addr_vec: AddrVec,
    /// Issuing core.
    pub core_id: usize,
    /// Clock at which the controller accepted the request.
    pub arrive: Clock,
    /// Clock at which the request completes (`-1` until known).
    pub depart: Clock,
    /// No command has issued for this request yet.
    pub is_first_command: bool,
    /// Member of the current scheduler batch.
    pub marked: bool,
    /// Read originated from a hammering access pattern.
    pub is_real_hammer: bool,
    /// Rejected by admission control.
    pub dropped: bool,
    /// Flattened rank/bank index within the channel.
    pub flat_bank_id: usize,
    /// Earliest clock the admission oracle lets this request activate.
    pub(crate) blocked_until: Cell<Clock>,
    /// Readiness computed at a clock, reused for the rest of that cycle.
    pub(crate) readiness: Cell<Option<(Clock, bool)>>,
    callback: Option<Completion>,
}

impl Request {
    /// Creates a request of `kind` to `addr_vec`.
    pub fn new(kind: RequestKind, addr_vec: AddrVec) -> Self {
        Self {
            kind,
            addr: 0,
            addr_vec,
            core_id: 0,
            arrive: -1,
            depart: -1,
            is_first_command: true,
            marked: false,
            is_real_hammer: false,
            dropped: false,
            flat_bank_id: 0,
            blocked_until: Cell::new(-1),
            readiness: Cell::new(None),
            callback: None,
        }
    }

    /// Sets the flat physical address.
    #[must_use]
    pub fn with_addr(mut self, addr: u64) -> Self {
        self.addr = addr;
        self
    }

    /// Sets the issuing core.
    #[must_use]
    pub fn with_core(mut self, core_id: usize) -> Self {
        self.core_id = core_id;
        self
    }

    /// Attaches a completion hook.
    #[must_use]
    pub fn with_callback(mut self, callback: impl FnMut(&Self) + Send + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Returns `true` if a completion hook is attached.
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Moves the completion hook out, leaving none behind.
    pub fn take_callback(&mut self) -> Option<Completion> {
        self.callback.take()
    }

    /// Replaces the completion hook.
    pub fn set_callback(&mut self, callback: Option<Completion>) {
        self.callback = callback;
    }

    /// Earliest clock the admission oracle lets this request activate.
    pub fn blocked_until(&self) -> Clock {
        self.blocked_until.get()
    }

    /// Invokes the completion hook, if any.
    pub fn complete(&mut self) {
        if let Some(mut callback) = self.callback.take() {
            callback(self);
            self.callback = Some(callback);
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("kind", &self.kind)
            .field("addr", &format_args!("{:#x}", self.addr))
            .field("addr_vec", &self.addr_vec)
            .field("core_id", &self.core_id)
            .field("arrive", &self.arrive)
            .field("depart", &self.depart)
            .field("marked", &self.marked)
            .field("is_real_hammer", &self.is_real_hammer)
            .finish_non_exhaustive()
    }
}

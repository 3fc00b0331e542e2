//! Issued-command observers.

use std::sync::{Arc, Mutex, PoisonError};

use crate::common::{AddrVec, Clock};
use crate::dram::Command;

/// Receives every command a controller issues, in issue order.
pub trait CommandObserver: Send {
    /// Called after `cmd` to `addr` has updated the device at `clk`.
    fn on_command(&mut self, cmd: Command, addr: &[i32], clk: Clock);
}

/// One issued command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedCommand {
    /// Issue clock.
    pub clk: Clock,
    /// Command.
    pub cmd: Command,
    /// Target address.
    pub addr: AddrVec,
}

/// Records issued commands into a shared buffer.
///
/// Clones share the buffer, so one handle can be registered with a
/// controller and another kept to read the trace back.
#[derive(Clone, Debug, Default)]
pub struct CommandTrace {
    log: Arc<Mutex<Vec<IssuedCommand>>>,
}

impl CommandTrace {
    /// Creates an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out everything recorded so far.
    pub fn snapshot(&self) -> Vec<IssuedCommand> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded commands.
    pub fn len(&self) -> usize {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CommandObserver for CommandTrace {
    fn on_command(&mut self, cmd: Command, addr: &[i32], clk: Clock) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(IssuedCommand {
                clk,
                cmd,
                addr: addr.to_vec(),
            });
    }
}

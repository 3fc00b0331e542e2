//! Admission oracle.
//!
//! An oracle lets a read-disturbance defense steer the controller without the
//! controller knowing which mechanism it is. It may throttle a core's queue
//! share, delay activates to a row, request preventive activates of victim
//! rows after an activate, and observe refreshes. [`NoDefense`] answers every
//! query with "no objection".

use crate::common::Clock;

/// Defense hooks consulted by the controller.
pub trait AdmissionOracle: Send {
    /// Clock until which an activate to `addr` must wait (`-1`: not blocked).
    ///
    /// Only consulted once the activate is otherwise legal.
    fn blocked_until(&mut self, _addr: &[i32], _clk: Clock, _is_attacker: bool, _core: usize) -> Clock {
        -1
    }

    /// Called after an activate to `addr` issues.
    ///
    /// Returns a victim row to activate preventively, or `None`. The controller
    /// keeps calling with increasing `iteration` until it gets `None`.
    fn on_activate(
        &mut self,
        _addr: &[i32],
        _clk: Clock,
        _iteration: u32,
        _is_attacker: bool,
        _core: usize,
    ) -> Option<i32> {
        None
    }

    /// Fraction of the queue a core may occupy (`1.0`: unthrottled).
    fn throttling_coeff(&mut self, _addr: &[i32], _core: usize, _is_attacker: bool) -> f32 {
        1.0
    }

    /// Called when a refresh issues; returns the number of extra target-row
    /// refreshes the device performed alongside it.
    fn on_refresh(&mut self, _addr: &[i32], _clk: Clock) -> u32 {
        0
    }
}

/// Oracle that never blocks, throttles, or refreshes.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDefense;

impl AdmissionOracle for NoDefense {}

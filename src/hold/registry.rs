/*!
 * Protected Process Registry
 * Single-slot record of the pid currently held
 */

use crate::core::errors::{HoldError, HoldResult};
use crate::core::types::{is_valid_pid, Pid, PID_UNSET};
use std::sync::atomic::{AtomicI32, Ordering};

/// The one pid protected by this module
///
/// Administrative paths (hold, unhold, finish) write through compare-exchange
/// or exchange; the signal hot path only ever loads. Every load observes a
/// value written whole by one of those writers.
#[derive(Debug)]
pub struct ProtectedPidRegistry {
    pid: AtomicI32,
}

impl ProtectedPidRegistry {
    pub const fn new() -> Self {
        Self {
            pid: AtomicI32::new(PID_UNSET),
        }
    }

    /// Currently protected pid, if any
    #[inline(always)]
    pub fn load(&self) -> Option<Pid> {
        let pid = self.pid.load(Ordering::Acquire);
        is_valid_pid(pid).then_some(pid)
    }

    /// Raw slot value, `PID_UNSET` when empty
    #[inline]
    pub fn raw(&self) -> Pid {
        self.pid.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_protected(&self, pid: Pid) -> bool {
        is_valid_pid(pid) && self.load() == Some(pid)
    }

    /// Record `pid` as held
    ///
    /// Claiming the pid already held succeeds; any other occupant is an error.
    pub fn claim(&self, pid: Pid) -> HoldResult<()> {
        if !is_valid_pid(pid) {
            return Err(HoldError::InvalidArgument(format!("pid {}", pid)));
        }
        match self
            .pid
            .compare_exchange(PID_UNSET, pid, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(()),
            Err(current) if current == pid => Ok(()),
            Err(current) => Err(HoldError::SlotOccupied(current)),
        }
    }

    /// Clear the slot if it holds `pid`; returns whether it did
    pub fn release(&self, pid: Pid) -> bool {
        self.pid
            .compare_exchange(pid, PID_UNSET, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Unconditionally empty the slot, returning what it held (`xchg`)
    pub fn reset(&self) -> Option<Pid> {
        let previous = self.pid.swap(PID_UNSET, Ordering::AcqRel);
        is_valid_pid(previous).then_some(previous)
    }
}

impl Default for ProtectedPidRegistry {
    fn default() -> Self {
        Self::new()
    }
}

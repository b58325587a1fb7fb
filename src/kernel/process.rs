/*!
 * Process Objects
 * Tasks, their thread-group signal state, and counted handles to them
 */

use super::cpu::SpinLockIrq;
use crate::core::types::Pid;
use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Bitmask stored on a thread group's signal state
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalFlags(u32);

impl SignalFlags {
    /// Group is exiting after a fatal signal
    pub const GROUP_EXIT: SignalFlags = SignalFlags(0x0000_0004);
    /// Group ignores fatal signals it has no handler for
    pub const UNKILLABLE: SignalFlags = SignalFlags(0x0000_0040);

    pub const fn empty() -> Self {
        SignalFlags(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        SignalFlags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn contains(self, other: SignalFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: SignalFlags) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: SignalFlags) {
        self.0 &= !other.0;
    }
}

impl fmt::Debug for SignalFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignalFlags({:#010x})", self.0)
    }
}

/// Signal state shared by every thread of a group
///
/// `flags` is only touched under `siglock` with interrupts masked.
#[derive(Default)]
pub struct SignalState {
    siglock: SpinLockIrq<SignalFlags>,
}

impl SignalState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_flags(flags: SignalFlags) -> Arc<Self> {
        Arc::new(Self {
            siglock: SpinLockIrq::new(flags),
        })
    }

    /// The lock guarding `flags`
    pub fn siglock(&self) -> &SpinLockIrq<SignalFlags> {
        &self.siglock
    }

    /// Snapshot of the flags, taken under the lock
    pub fn flags(&self) -> SignalFlags {
        *self.siglock.lock_irq()
    }

    pub fn is_unkillable(&self) -> bool {
        self.flags().contains(SignalFlags::UNKILLABLE)
    }
}

impl fmt::Debug for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalState")
            .field("flags", &self.flags())
            .finish()
    }
}

/// A schedulable entity in the process table
pub struct Task {
    pid: Pid,
    tgid: Pid,
    signal: ArcSwapOption<SignalState>,
    uses: AtomicUsize,
}

impl Task {
    /// Thread group leader with fresh signal state
    pub fn leader(pid: Pid) -> Arc<Self> {
        Arc::new(Self {
            pid,
            tgid: pid,
            signal: ArcSwapOption::from(Some(SignalState::new())),
            uses: AtomicUsize::new(0),
        })
    }

    /// Thread sharing `leader`'s signal state
    pub fn thread_of(leader: &Task, tid: Pid) -> Arc<Self> {
        Arc::new(Self {
            pid: tid,
            tgid: leader.tgid,
            signal: ArcSwapOption::new(leader.signal.load_full()),
            uses: AtomicUsize::new(0),
        })
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn tgid(&self) -> Pid {
        self.tgid
    }

    /// Signal state, gone once the task is a zombie
    pub fn signal(&self) -> Option<Arc<SignalState>> {
        self.signal.load_full()
    }

    /// Release signal state on exit
    pub fn detach_signal(&self) -> Option<Arc<SignalState>> {
        self.signal.swap(None)
    }

    pub fn is_zombie(&self) -> bool {
        self.signal.load().is_none()
    }

    /// Outstanding handles (`get_pid` minus `put_pid`)
    pub fn uses(&self) -> usize {
        self.uses.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("pid", &self.pid)
            .field("tgid", &self.tgid)
            .field("zombie", &self.is_zombie())
            .field("uses", &self.uses())
            .finish()
    }
}

/// Counted reference to a live task
///
/// Taking one bumps the task's use count; dropping it puts the reference back.
/// Handles are short-lived and never stored by the hold engine.
#[must_use]
pub struct ProcessHandle {
    task: Arc<Task>,
}

impl ProcessHandle {
    /// `get_pid`
    pub fn get(task: Arc<Task>) -> Self {
        task.uses.fetch_add(1, Ordering::AcqRel);
        Self { task }
    }

    pub fn pid(&self) -> Pid {
        self.task.pid
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn signal_state(&self) -> Option<Arc<SignalState>> {
        self.task.signal()
    }
}

impl Drop for ProcessHandle {
    /// `put_pid`
    fn drop(&mut self) {
        self.task.uses.fetch_sub(1, Ordering::AcqRel);
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProcessHandle").field(&self.task.pid).finish()
    }
}

/*!
 * Security Operations
 * The task_kill decision point every signal delivery passes through
 */

use super::cpu::PreemptGuard;
use super::process::Task;
use super::types::{KillVerdict, SigInfoRef};
use crate::core::types::SigNum;
use arc_swap::ArcSwapOption;
use std::fmt;
use std::sync::Arc;

/// A policy consulted before a signal is delivered
///
/// Called synchronously from whatever context raised the signal; must not block.
pub trait TaskKillHandler: Send + Sync {
    fn task_kill(&self, target: &Task, info: &SigInfoRef, sig: SigNum) -> KillVerdict;
}

/// One occupant of the task_kill slot
///
/// Slot identity is the `Arc` of the entry, so two entries wrapping the same
/// handler are still different occupants.
pub struct TaskKillEntry {
    owner: String,
    handler: Arc<dyn TaskKillHandler>,
}

impl TaskKillEntry {
    pub fn new(owner: impl Into<String>, handler: Arc<dyn TaskKillHandler>) -> Arc<Self> {
        Arc::new(Self {
            owner: owner.into(),
            handler,
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[inline]
    pub fn call(&self, target: &Task, info: &SigInfoRef, sig: SigNum) -> KillVerdict {
        self.handler.task_kill(target, info, sig)
    }
}

impl fmt::Debug for TaskKillEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskKillEntry")
            .field("owner", &self.owner)
            .finish()
    }
}

/// Pointer identity on optional slot occupants
pub fn same_entry(a: &Option<Arc<TaskKillEntry>>, b: &Option<Arc<TaskKillEntry>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Globally shared, atomically replaceable handler slot
#[derive(Default)]
pub struct HookSlot {
    current: ArcSwapOption<TaskKillEntry>,
}

impl HookSlot {
    pub fn new(initial: Option<Arc<TaskKillEntry>>) -> Self {
        Self {
            current: ArcSwapOption::new(initial),
        }
    }

    /// Current occupant
    #[inline]
    pub fn load(&self) -> Option<Arc<TaskKillEntry>> {
        self.current.load_full()
    }

    /// `cmpxchg`: store `new` only if the slot still holds `expected`
    ///
    /// Returns the value found in the slot; the swap happened iff that value
    /// is `expected`. Callers must have preemption disabled.
    pub fn compare_and_swap(
        &self,
        _preempt: &PreemptGuard,
        expected: &Option<Arc<TaskKillEntry>>,
        new: Option<Arc<TaskKillEntry>>,
    ) -> Option<Arc<TaskKillEntry>> {
        let previous = self.current.compare_and_swap(expected, new);
        arc_swap::Guard::into_inner(previous)
    }

    /// Unconditional replacement, for hosts wiring up their own policy
    pub fn store(&self, entry: Option<Arc<TaskKillEntry>>) {
        self.current.store(entry);
    }

    /// Run the decision point; an empty slot lets everything through
    #[inline]
    pub fn call(&self, target: &Task, info: &SigInfoRef, sig: SigNum) -> KillVerdict {
        match &*self.current.load() {
            Some(entry) => entry.call(target, info, sig),
            None => KillVerdict::Allow,
        }
    }
}

/// Security operations table of the running kernel
pub struct SecurityOps {
    pub task_kill: HookSlot,
}

impl SecurityOps {
    pub fn new(task_kill: Option<Arc<TaskKillEntry>>) -> Self {
        Self {
            task_kill: HookSlot::new(task_kill),
        }
    }
}

/// Stock policy that lets every signal through
#[derive(Debug, Default, Clone, Copy)]
pub struct CapabilityTaskKill;

impl TaskKillHandler for CapabilityTaskKill {
    fn task_kill(&self, _target: &Task, _info: &SigInfoRef, _sig: SigNum) -> KillVerdict {
        KillVerdict::Allow
    }
}

/*!
 * Interception Hook
 * Fine-grained protection chained into the task_kill decision point
 */

use super::audit::InterceptLog;
use super::classifier::{Classification, SignalClassifier};
use super::registry::ProtectedPidRegistry;
use super::stats::AtomicHoldStats;
use super::strategy::{ProtectionStrategy, StrategyKind};
use crate::core::errors::{HoldError, HoldResult};
use crate::core::types::SigNum;
use crate::kernel::{
    preempt_disable, same_entry, Errno, HookSlot, HostRef, KernelHost, KillVerdict, ModuleRef,
    ProcessHandle, SigInfoRef, Task, TaskKillEntry, TaskKillHandler,
};
use crate::signals::SignalDeliveryEvent;
use arc_swap::ArcSwapOption;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Owner name the hook registers under in the task_kill slot
pub const HOOK_OWNER: &str = "prochold";

/// A link in the task_kill chain
pub trait SignalInterceptor: Send + Sync {
    /// Decide on one delivery attempt
    fn evaluate(&self, event: &SignalDeliveryEvent) -> Classification;

    /// Hand the call, unchanged, to the handler that was installed before
    fn forward(&self, target: &Task, info: &SigInfoRef, sig: SigNum) -> KillVerdict;
}

/// Installation state of the hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookState {
    Uninstalled,
    Installed,
}

/// State reachable from the decision point
///
/// Lives behind an `Arc` owned by the slot entry, so it outlives the
/// `InterceptionHook` for as long as any CPU can still call into it.
struct HookCore {
    original: ArcSwapOption<TaskKillEntry>,
    registry: Arc<ProtectedPidRegistry>,
    module: Arc<ModuleRef>,
    stats: Arc<AtomicHoldStats>,
    intercepts: Arc<InterceptLog>,
}

impl HookCore {
    fn on_event(&self, target: &Task, info: &SigInfoRef, sig: SigNum) -> HoldResult<KillVerdict> {
        self.stats.inc_seen();

        // Released on every return below
        let Some(_pin) = self.module.try_get() else {
            self.stats.inc_pin_failures();
            return Err(HoldError::PermissionDenied(format!(
                "module {} is unloading",
                self.module.name()
            )));
        };

        let event = SignalDeliveryEvent::from_task_kill(target, info, sig);
        match self.evaluate(&event) {
            Classification::Intercept => {
                self.stats.inc_intercepted();
                self.intercepts.record(&event);
                info!(
                    "hold task kill: pid {}, signal {}, sender {}",
                    event.target_pid, sig, event.sender_pid
                );
                Ok(KillVerdict::Deny(Errno::EPERM))
            }
            Classification::Forward(_) => {
                self.stats.inc_forwarded();
                Ok(self.forward(target, info, sig))
            }
        }
    }
}

impl SignalInterceptor for HookCore {
    #[inline]
    fn evaluate(&self, event: &SignalDeliveryEvent) -> Classification {
        SignalClassifier::classify(event, self.registry.load())
    }

    #[inline]
    fn forward(&self, target: &Task, info: &SigInfoRef, sig: SigNum) -> KillVerdict {
        match &*self.original.load() {
            Some(original) => original.call(target, info, sig),
            None => KillVerdict::Allow,
        }
    }
}

impl TaskKillHandler for HookCore {
    fn task_kill(&self, target: &Task, info: &SigInfoRef, sig: SigNum) -> KillVerdict {
        match self.on_event(target, info, sig) {
            Ok(verdict) => verdict,
            // Never intercept without a pin; fall back to the prior policy
            Err(e) => {
                debug!("Forwarding signal {} to {} uninspected: {}", sig, target.tgid(), e);
                self.forward(target, info, sig)
            }
        }
    }
}

/// Interception strategy: owns the hook's place in the task_kill chain
pub struct InterceptionHook {
    host: HostRef,
    core: Arc<HookCore>,
    entry: Arc<TaskKillEntry>,
    state: HookState,
}

impl InterceptionHook {
    pub fn new(
        host: HostRef,
        registry: Arc<ProtectedPidRegistry>,
        stats: Arc<AtomicHoldStats>,
        intercepts: Arc<InterceptLog>,
    ) -> Self {
        let core = Arc::new(HookCore {
            original: ArcSwapOption::empty(),
            registry,
            module: host.this_module(),
            stats,
            intercepts,
        });
        let entry = TaskKillEntry::new(HOOK_OWNER, core.clone());
        Self {
            host,
            core,
            entry,
            state: HookState::Uninstalled,
        }
    }

    pub fn state(&self) -> HookState {
        self.state
    }

    /// This hook's occupant value for the task_kill slot
    pub fn entry(&self) -> &Arc<TaskKillEntry> {
        &self.entry
    }

    /// Handler the hook chains to, once installed
    pub fn original(&self) -> Option<Arc<TaskKillEntry>> {
        self.core.original.load_full()
    }

    fn slot_of(host: &dyn KernelHost) -> HoldResult<&HookSlot> {
        host.security_ops()
            .map(|ops| &ops.task_kill)
            .ok_or(HoldError::HookUnavailable)
    }

    /// Chain into the task_kill slot
    ///
    /// Observe-then-swap runs with preemption off. The swap only lands if the
    /// slot still holds what was observed, so a racing installer makes this
    /// call fail instead of both claiming the same original.
    pub fn install(&mut self) -> HoldResult<()> {
        if self.state == HookState::Installed {
            return Err(HoldError::AlreadyStarted);
        }
        let host = Arc::clone(&self.host);
        let preempt = preempt_disable();
        let slot = Self::slot_of(host.as_ref())?;

        let observed = slot.load();
        let Some(original) = observed.clone() else {
            warn!("task_kill slot is empty, nothing to chain to");
            return Err(HoldError::NoOriginal);
        };
        if Arc::ptr_eq(&original, &self.entry) {
            return Err(HoldError::AlreadyTaken);
        }

        // Forwarding must work from the instant the swap lands
        self.core.original.store(Some(Arc::clone(&original)));
        let found = slot.compare_and_swap(&preempt, &observed, Some(Arc::clone(&self.entry)));
        if !same_entry(&found, &observed) {
            self.core.original.store(None);
            warn!(
                "task_kill slot changed during install (now '{}')",
                found.as_ref().map(|e| e.owner()).unwrap_or("<empty>")
            );
            return Err(HoldError::AlreadyTaken);
        }

        self.state = HookState::Installed;
        info!("task_kill hook installed, chained to '{}'", original.owner());
        Ok(())
    }

    /// Run the hook directly on one delivery attempt
    pub fn on_event(
        &self,
        target: &Task,
        info: &SigInfoRef,
        sig: SigNum,
    ) -> HoldResult<KillVerdict> {
        self.core.on_event(target, info, sig)
    }

    /// Put the saved original back into the slot
    ///
    /// Fails with `ChainCorrupted`, leaving the slot alone, if someone else
    /// now occupies it. The saved original is kept so calls already inside
    /// the hook can still forward.
    pub fn restore(&mut self) -> HoldResult<()> {
        if self.state != HookState::Installed {
            return Err(HoldError::NotStarted);
        }
        let original = self.core.original.load_full().ok_or(HoldError::NoOriginal)?;
        let host = Arc::clone(&self.host);
        let preempt = preempt_disable();
        let slot = Self::slot_of(host.as_ref())?;

        let ours = Some(Arc::clone(&self.entry));
        let found = slot.compare_and_swap(&preempt, &ours, Some(Arc::clone(&original)));
        if !same_entry(&found, &ours) {
            error!(
                "task_kill slot holds '{}' instead of the hold hook, chain left untouched",
                found.as_ref().map(|e| e.owner()).unwrap_or("<empty>")
            );
            return Err(HoldError::ChainCorrupted);
        }

        self.state = HookState::Uninstalled;
        info!("task_kill hook removed, '{}' restored", original.owner());
        Ok(())
    }
}

impl ProtectionStrategy for InterceptionHook {
    fn kind(&self) -> StrategyKind {
        StrategyKind::InterceptionHook
    }

    fn install(&mut self) -> HoldResult<()> {
        InterceptionHook::install(self)
    }

    /// The registry is read per event; nothing to apply to the task
    fn hold(&self, handle: &ProcessHandle) -> HoldResult<()> {
        debug!("Process {} will be screened at task_kill", handle.pid());
        Ok(())
    }

    fn unhold(&self, _handle: &ProcessHandle) -> HoldResult<()> {
        Ok(())
    }

    fn restore(&mut self) -> HoldResult<()> {
        InterceptionHook::restore(self)
    }
}

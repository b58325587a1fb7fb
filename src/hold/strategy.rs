/*!
 * Protection Strategies
 * Selection between the flag and hook mechanisms
 */

use super::audit::InterceptLog;
use super::hook::InterceptionHook;
use super::immunity::ImmunityFlagStrategy;
use super::registry::ProtectedPidRegistry;
use super::stats::AtomicHoldStats;
use crate::core::errors::{HoldError, HoldResult};
use crate::kernel::{HostRef, ProcessHandle};
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which mechanism keeps the held process alive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Group-wide unkillable attribute, enforced by the kernel
    ImmunityFlag,
    /// Veto at the task_kill decision point
    InterceptionHook,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::ImmunityFlag => write!(f, "immunity-flag"),
            StrategyKind::InterceptionHook => write!(f, "interception-hook"),
        }
    }
}

/// One way of protecting the registered pid
pub trait ProtectionStrategy: Send {
    fn kind(&self) -> StrategyKind;

    /// One-time setup when protection starts
    fn install(&mut self) -> HoldResult<()>;

    /// Apply protection to a resolved, registered process
    fn hold(&self, handle: &ProcessHandle) -> HoldResult<()>;

    /// Lift protection from a process
    fn unhold(&self, handle: &ProcessHandle) -> HoldResult<()>;

    /// Undo `install`
    fn restore(&mut self) -> HoldResult<()>;
}

/// The strategy chosen for this host
pub enum ActiveStrategy {
    ImmunityFlag(ImmunityFlagStrategy),
    InterceptionHook(InterceptionHook),
}

impl ActiveStrategy {
    /// Pick the mechanism the host kernel supports
    ///
    /// The hook is preferred when the kernel exposes task_kill; otherwise the
    /// flag is used. Neither available is an error.
    pub fn select(
        host: &HostRef,
        registry: Arc<ProtectedPidRegistry>,
        stats: Arc<AtomicHoldStats>,
        intercepts: Arc<InterceptLog>,
    ) -> HoldResult<Self> {
        let caps = host.capabilities();
        let strategy = if caps.task_kill_hook && host.security_ops().is_some() {
            ActiveStrategy::InterceptionHook(InterceptionHook::new(
                Arc::clone(host),
                registry,
                stats,
                intercepts,
            ))
        } else if caps.unkillable_flag {
            ActiveStrategy::ImmunityFlag(ImmunityFlagStrategy::new())
        } else {
            return Err(HoldError::HookUnavailable);
        };
        info!(
            "Kernel {} supports {:?}, using {} strategy",
            host.release(),
            caps,
            strategy.kind()
        );
        Ok(strategy)
    }

    pub fn as_hook(&self) -> Option<&InterceptionHook> {
        match self {
            ActiveStrategy::InterceptionHook(hook) => Some(hook),
            ActiveStrategy::ImmunityFlag(_) => None,
        }
    }

    fn inner(&self) -> &dyn ProtectionStrategy {
        match self {
            ActiveStrategy::ImmunityFlag(s) => s,
            ActiveStrategy::InterceptionHook(s) => s,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ProtectionStrategy {
        match self {
            ActiveStrategy::ImmunityFlag(s) => s,
            ActiveStrategy::InterceptionHook(s) => s,
        }
    }
}

impl ProtectionStrategy for ActiveStrategy {
    fn kind(&self) -> StrategyKind {
        self.inner().kind()
    }

    fn install(&mut self) -> HoldResult<()> {
        self.inner_mut().install()
    }

    fn hold(&self, handle: &ProcessHandle) -> HoldResult<()> {
        self.inner().hold(handle)
    }

    fn unhold(&self, handle: &ProcessHandle) -> HoldResult<()> {
        self.inner().unhold(handle)
    }

    fn restore(&mut self) -> HoldResult<()> {
        self.inner_mut().restore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{KernelCapabilities, KernelVersion, SimulatedKernel};

    fn select_for(kernel: SimulatedKernel) -> HoldResult<ActiveStrategy> {
        let host: HostRef = Arc::new(kernel);
        ActiveStrategy::select(
            &host,
            Arc::new(ProtectedPidRegistry::new()),
            Arc::new(AtomicHoldStats::new()),
            Arc::new(InterceptLog::new()),
        )
    }

    #[test]
    fn test_modern_kernel_uses_flag() {
        let strategy = select_for(SimulatedKernel::modern()).unwrap();
        assert_eq!(strategy.kind(), StrategyKind::ImmunityFlag);
        assert!(strategy.as_hook().is_none());
    }

    #[test]
    fn test_legacy_kernel_uses_hook() {
        let strategy = select_for(SimulatedKernel::legacy()).unwrap();
        assert_eq!(strategy.kind(), StrategyKind::InterceptionHook);
    }

    #[test]
    fn test_no_mechanism_available() {
        let kernel = SimulatedKernel::builder()
            .with_version(KernelVersion::new(2, 6, 18))
            .with_capabilities(KernelCapabilities {
                unkillable_flag: false,
                task_kill_hook: false,
            })
            .build();
        assert_eq!(select_for(kernel).err(), Some(HoldError::HookUnavailable));
    }

    #[test]
    fn test_display() {
        assert_eq!(StrategyKind::ImmunityFlag.to_string(), "immunity-flag");
        assert_eq!(
            serde_json::to_string(&StrategyKind::InterceptionHook).unwrap(),
            "\"interception_hook\""
        );
    }
}

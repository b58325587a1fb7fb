/*!
 * Protection Controller
 * Start, hold, unhold and finish over the selected strategy
 */

use super::audit::InterceptLog;
use super::lookup::ProcessLookup;
use super::registry::ProtectedPidRegistry;
use super::stats::{AtomicHoldStats, HoldStats};
use super::strategy::{ActiveStrategy, ProtectionStrategy, StrategyKind};
use crate::core::errors::{HoldError, HoldResult};
use crate::core::types::{is_valid_pid, Pid};
use crate::kernel::HostRef;
use log::{debug, error, info, warn};
use std::sync::Arc;

/// Owns the registry and the active strategy for one module instance
pub struct ProtectionController {
    host: HostRef,
    lookup: ProcessLookup,
    registry: Arc<ProtectedPidRegistry>,
    stats: Arc<AtomicHoldStats>,
    intercepts: Arc<InterceptLog>,
    strategy: Option<ActiveStrategy>,
}

impl ProtectionController {
    pub fn new(host: HostRef) -> Self {
        Self {
            lookup: ProcessLookup::new(Arc::clone(&host)),
            host,
            registry: Arc::new(ProtectedPidRegistry::new()),
            stats: Arc::new(AtomicHoldStats::new()),
            intercepts: Arc::new(InterceptLog::new()),
            strategy: None,
        }
    }

    /// Select and install the strategy for this host
    pub fn start(&mut self) -> HoldResult<StrategyKind> {
        if self.strategy.is_some() {
            return Err(HoldError::AlreadyStarted);
        }
        let mut strategy = ActiveStrategy::select(
            &self.host,
            Arc::clone(&self.registry),
            Arc::clone(&self.stats),
            Arc::clone(&self.intercepts),
        )?;
        strategy.install()?;

        let kind = strategy.kind();
        self.strategy = Some(strategy);
        info!("Protection started ({})", kind);
        Ok(kind)
    }

    /// Protect `pid`
    ///
    /// The pid must name a live process and the registry must be empty or
    /// already hold the same group. Signals are judged per thread group, so a
    /// thread id holds the whole group and the registry records the leader.
    /// A strategy failure rolls the claim back.
    pub fn hold(&self, pid: Pid) -> HoldResult<()> {
        if !is_valid_pid(pid) {
            return Err(HoldError::InvalidArgument(format!("pid {}", pid)));
        }
        let strategy = self.strategy.as_ref().ok_or(HoldError::NotStarted)?;
        let handle = self.lookup.resolve(pid)?;
        let tgid = handle.task().tgid();

        let newly_claimed = self.registry.load() != Some(tgid);
        self.registry.claim(tgid)?;
        if let Err(e) = strategy.hold(&handle) {
            if newly_claimed {
                self.registry.release(tgid);
            }
            warn!("Failed to hold process {}: {}", pid, e);
            return Err(e);
        }

        self.stats.inc_holds();
        if tgid != pid {
            debug!("Thread {} belongs to group {}", pid, tgid);
        }
        info!("Holding process {} ({})", tgid, strategy.kind());
        Ok(())
    }

    /// Lift protection from `pid`
    ///
    /// Succeeds for pids that are not held. A held pid that has already
    /// exited is dropped from the registry and there is nothing else to undo.
    pub fn unhold(&self, pid: Pid) -> HoldResult<()> {
        if !is_valid_pid(pid) {
            return Err(HoldError::InvalidArgument(format!("pid {}", pid)));
        }
        let strategy = self.strategy.as_ref().ok_or(HoldError::NotStarted)?;

        let handle = match self.lookup.resolve(pid) {
            Ok(handle) => Some(handle),
            Err(HoldError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        let tgid = handle.as_ref().map_or(pid, |h| h.task().tgid());

        if self.registry.release(tgid) {
            self.stats.inc_unholds();
            info!("Released process {}", tgid);
        } else {
            debug!("Process {} was not held", pid);
        }

        match handle {
            Some(handle) => strategy.unhold(&handle),
            None => {
                debug!("Process {} is gone, nothing left to lift", pid);
                Ok(())
            }
        }
    }

    /// Tear down: restore the strategy and clear the registry
    ///
    /// The registry and strategy are cleared even when restoring fails; the
    /// failure is still returned.
    pub fn finish(&mut self) -> HoldResult<()> {
        let result = match self.strategy.take() {
            Some(mut strategy) => strategy.restore(),
            None => Ok(()),
        };
        if let Some(pid) = self.registry.reset() {
            debug!("Dropped protection of {} on finish", pid);
        }
        match &result {
            Ok(()) => info!("Protection finished"),
            Err(e) => error!("Protection finished with errors: {}", e),
        }
        result
    }

    pub fn host(&self) -> &HostRef {
        &self.host
    }

    pub fn is_started(&self) -> bool {
        self.strategy.is_some()
    }

    pub fn strategy_kind(&self) -> Option<StrategyKind> {
        self.strategy.as_ref().map(|s| s.kind())
    }

    pub fn strategy(&self) -> Option<&ActiveStrategy> {
        self.strategy.as_ref()
    }

    pub fn registry(&self) -> &ProtectedPidRegistry {
        &self.registry
    }

    pub fn held_pid(&self) -> Option<Pid> {
        self.registry.load()
    }

    pub fn stats(&self) -> HoldStats {
        self.stats.snapshot()
    }

    pub fn intercepts(&self) -> &InterceptLog {
        &self.intercepts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{DeliveryOutcome, Errno, KernelHost, SimulatedKernel};

    fn started(kernel: &Arc<SimulatedKernel>) -> ProtectionController {
        let mut controller = ProtectionController::new(kernel.clone());
        controller.start().unwrap();
        controller
    }

    #[test]
    fn test_hold_before_start() {
        let kernel = Arc::new(SimulatedKernel::modern());
        kernel.spawn(500).unwrap();
        let controller = ProtectionController::new(kernel.clone());
        assert_eq!(controller.hold(500), Err(HoldError::NotStarted));
        assert_eq!(controller.held_pid(), None);
    }

    #[test]
    fn test_start_twice() {
        let kernel = Arc::new(SimulatedKernel::legacy());
        let mut controller = started(&kernel);
        assert_eq!(controller.start(), Err(HoldError::AlreadyStarted));
        assert_eq!(
            controller.strategy_kind(),
            Some(StrategyKind::InterceptionHook)
        );
    }

    #[test]
    fn test_invalid_pids_rejected() {
        let kernel = Arc::new(SimulatedKernel::modern());
        let controller = started(&kernel);
        for pid in [0, -1, -500] {
            assert!(matches!(
                controller.hold(pid),
                Err(HoldError::InvalidArgument(_))
            ));
            assert!(matches!(
                controller.unhold(pid),
                Err(HoldError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_hold_missing_process() {
        let kernel = Arc::new(SimulatedKernel::modern());
        let controller = started(&kernel);
        assert_eq!(controller.hold(4242), Err(HoldError::NotFound(4242)));
        assert_eq!(controller.held_pid(), None);
    }

    #[test]
    fn test_second_pid_rejected() {
        let kernel = Arc::new(SimulatedKernel::legacy());
        kernel.spawn(500).unwrap();
        kernel.spawn(600).unwrap();
        let controller = started(&kernel);

        controller.hold(500).unwrap();
        controller.hold(500).unwrap();
        assert_eq!(controller.hold(600), Err(HoldError::SlotOccupied(500)));
        assert_eq!(controller.held_pid(), Some(500));
    }

    #[test]
    fn test_zombie_hold_rolls_back() {
        let kernel = Arc::new(SimulatedKernel::modern());
        let task = kernel.spawn(500).unwrap();
        task.detach_signal();
        let controller = started(&kernel);

        assert_eq!(controller.hold(500), Err(HoldError::NoSignalState(500)));
        assert_eq!(controller.held_pid(), None);
        assert_eq!(controller.stats().holds, 0);
    }

    #[test]
    fn test_flag_hold_unhold() {
        let kernel = Arc::new(SimulatedKernel::modern());
        kernel.spawn(500).unwrap();
        let controller = started(&kernel);

        controller.hold(500).unwrap();
        assert_eq!(kernel.kill(1, 500, 15), Ok(DeliveryOutcome::Ignored));

        controller.unhold(500).unwrap();
        controller.unhold(500).unwrap();
        assert_eq!(controller.stats().unholds, 1);
        assert_eq!(kernel.kill(1, 500, 15), Ok(DeliveryOutcome::Terminated));
    }

    #[test]
    fn test_unhold_exited_process_clears_registry() {
        let kernel = Arc::new(SimulatedKernel::legacy());
        kernel.spawn(500).unwrap();
        let controller = started(&kernel);
        controller.hold(500).unwrap();

        kernel.exit_group(500);
        kernel.reap(500);
        controller.unhold(500).unwrap();
        assert_eq!(controller.held_pid(), None);
        assert_eq!(controller.stats().unholds, 1);
    }

    #[test]
    fn test_unhold_unknown_pid() {
        for kernel in [SimulatedKernel::legacy(), SimulatedKernel::modern()] {
            let controller = started(&Arc::new(kernel));
            controller.unhold(777).unwrap();
            assert_eq!(controller.stats().unholds, 0);
        }
    }

    #[test]
    fn test_thread_id_holds_its_group() {
        let kernel = Arc::new(SimulatedKernel::legacy());
        kernel.spawn(500).unwrap();
        kernel.spawn_thread(500, 501).unwrap();
        let controller = started(&kernel);

        controller.hold(501).unwrap();
        assert_eq!(controller.held_pid(), Some(500));
        assert_eq!(kernel.sigqueue(999, 501, 15), Err(Errno::EPERM));
        assert_eq!(kernel.sigqueue(999, 500, 15), Err(Errno::EPERM));
        assert!(kernel.is_alive(500));

        // Either id of the group releases it
        controller.unhold(501).unwrap();
        assert_eq!(controller.held_pid(), None);
        assert_eq!(kernel.sigqueue(999, 501, 15), Ok(DeliveryOutcome::Terminated));
        assert!(!kernel.is_alive(500));
    }

    #[test]
    fn test_finish_restores_and_clears() {
        let kernel = Arc::new(SimulatedKernel::legacy());
        kernel.spawn(500).unwrap();
        let mut controller = started(&kernel);
        controller.hold(500).unwrap();
        assert_eq!(kernel.sigqueue(7, 500, 15), Err(Errno::EPERM));

        controller.finish().unwrap();
        assert!(!controller.is_started());
        assert_eq!(controller.held_pid(), None);
        assert_eq!(
            kernel.security_ops().unwrap().task_kill.load().unwrap().owner(),
            "capability"
        );
        assert_eq!(kernel.sigqueue(7, 500, 15), Ok(DeliveryOutcome::Terminated));

        // Second finish is a no-op
        controller.finish().unwrap();
    }
}

/*!
 * Simulated Kernel
 * In-memory host for testing and for platforms the module cannot be loaded into
 */

use super::module::ModuleRef;
use super::process::{ProcessHandle, SignalFlags, Task};
use super::security::{CapabilityTaskKill, SecurityOps, TaskKillEntry};
use super::traits::{KernelHost, ProcessTable};
use super::types::{Errno, KernelCapabilities, KernelVersion, KillVerdict, SigInfo, SigInfoRef};
use crate::core::rcu::RcuCell;
use crate::core::types::{is_valid_pid, Pid, SigNum};
use crate::signals::Signal;
use ahash::RandomState;
use crossbeam_epoch::{self as epoch, Guard};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Highest signal number the simulated kernel accepts (`_NSIG`)
pub const SIG_MAX: SigNum = 64;

type TaskMap = HashMap<Pid, Arc<Task>, RandomState>;

/// What happened to a signal that passed the decision point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Signal 0: existence and permission check only
    Probed,
    /// Queued to the target
    Delivered,
    /// Dropped by the kernel (unkillable group or zombie target)
    Ignored,
    /// Default action ended the thread group
    Terminated,
}

/// Builder for [`SimulatedKernel`]
pub struct SimulatedKernelBuilder {
    version: KernelVersion,
    release: Option<String>,
    capabilities: Option<KernelCapabilities>,
    default_task_kill: bool,
}

impl SimulatedKernelBuilder {
    pub fn new() -> Self {
        Self {
            version: KernelVersion::new(5, 15, 0),
            release: None,
            capabilities: None,
            default_task_kill: true,
        }
    }

    /// Kernel version; also decides capabilities unless overridden
    pub fn with_version(mut self, version: KernelVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    /// Override the capabilities derived from the version
    pub fn with_capabilities(mut self, capabilities: KernelCapabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Start with an empty task_kill slot instead of the stock policy
    pub fn without_default_task_kill(mut self) -> Self {
        self.default_task_kill = false;
        self
    }

    pub fn build(self) -> SimulatedKernel {
        let capabilities = self
            .capabilities
            .unwrap_or_else(|| self.version.capabilities());
        let security_ops = capabilities.task_kill_hook.then(|| {
            let stock = self
                .default_task_kill
                .then(|| TaskKillEntry::new("capability", Arc::new(CapabilityTaskKill)));
            SecurityOps::new(stock)
        });
        let release = self.release.unwrap_or_else(|| self.version.to_string());

        info!(
            "Simulated kernel {} booted (unkillable_flag={}, task_kill_hook={})",
            release, capabilities.unkillable_flag, capabilities.task_kill_hook
        );

        SimulatedKernel {
            release,
            capabilities,
            processes: RcuCell::new(TaskMap::default()),
            security_ops,
            module: ModuleRef::new("prochold"),
        }
    }
}

impl Default for SimulatedKernelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory kernel with a process table, signal delivery and an LSM slot
pub struct SimulatedKernel {
    release: String,
    capabilities: KernelCapabilities,
    processes: RcuCell<TaskMap>,
    security_ops: Option<SecurityOps>,
    module: Arc<ModuleRef>,
}

impl SimulatedKernel {
    pub fn builder() -> SimulatedKernelBuilder {
        SimulatedKernelBuilder::new()
    }

    /// Kernel with the unkillable flag and no writable hook point
    pub fn modern() -> Self {
        Self::builder().build()
    }

    /// Kernel exporting a writable security operations table
    pub fn legacy() -> Self {
        Self::builder()
            .with_version(KernelVersion::new(2, 6, 18))
            .with_release("2.6.18-194.el5")
            .build()
    }

    /// Create a thread group led by `pid`
    pub fn spawn(&self, pid: Pid) -> Result<Arc<Task>, Errno> {
        if !is_valid_pid(pid) {
            return Err(Errno::EINVAL);
        }
        if self.processes.load().contains_key(&pid) {
            return Err(Errno::EBUSY);
        }
        let task = Task::leader(pid);
        let inserted = task.clone();
        self.processes.update(|map| {
            let mut next = map.clone();
            next.insert(pid, inserted.clone());
            next
        });
        debug!("Spawned process {}", pid);
        Ok(task)
    }

    /// Add thread `tid` to the group led by `tgid`
    pub fn spawn_thread(&self, tgid: Pid, tid: Pid) -> Result<Arc<Task>, Errno> {
        if !is_valid_pid(tid) {
            return Err(Errno::EINVAL);
        }
        let table = self.processes.load();
        let leader = table.get(&tgid).ok_or(Errno::ESRCH)?;
        if table.contains_key(&tid) {
            return Err(Errno::EBUSY);
        }
        let thread = Task::thread_of(leader, tid);
        let inserted = thread.clone();
        self.processes.update(|map| {
            let mut next = map.clone();
            next.insert(tid, inserted.clone());
            next
        });
        debug!("Spawned thread {} in group {}", tid, tgid);
        Ok(thread)
    }

    pub fn task(&self, pid: Pid) -> Option<Arc<Task>> {
        self.processes.load().get(&pid).cloned()
    }

    /// Present in the table and not yet a zombie
    pub fn is_alive(&self, pid: Pid) -> bool {
        self.task(pid).is_some_and(|t| !t.is_zombie())
    }

    /// Number of tasks in the table, zombies included
    pub fn task_count(&self) -> usize {
        self.processes.load().len()
    }

    /// Every task of the group drops its signal state and becomes a zombie
    pub fn exit_group(&self, tgid: Pid) {
        let table = self.processes.load();
        for task in table.values().filter(|t| t.tgid() == tgid) {
            if let Some(state) = task.detach_signal() {
                state.siglock().lock_irq().insert(SignalFlags::GROUP_EXIT);
            }
        }
        info!("Thread group {} exited", tgid);
    }

    /// Remove the group's zombies from the table
    pub fn reap(&self, tgid: Pid) {
        self.processes.update(|map| {
            let mut next = map.clone();
            next.retain(|_, task| task.tgid() != tgid);
            next
        });
        debug!("Reaped thread group {}", tgid);
    }

    /// kill(2)
    pub fn kill(&self, sender: Pid, target: Pid, sig: SigNum) -> Result<DeliveryOutcome, Errno> {
        self.send_sig_info(target, SigInfoRef::Info(SigInfo::user(sig, sender)), sig)
    }

    /// tkill(2)
    pub fn tkill(&self, sender: Pid, tid: Pid, sig: SigNum) -> Result<DeliveryOutcome, Errno> {
        self.send_sig_info(tid, SigInfoRef::Info(SigInfo::tkill(sig, sender)), sig)
    }

    /// sigqueue(3)
    pub fn sigqueue(
        &self,
        sender: Pid,
        target: Pid,
        sig: SigNum,
    ) -> Result<DeliveryOutcome, Errno> {
        self.send_sig_info(target, SigInfoRef::Info(SigInfo::queued(sig, sender)), sig)
    }

    /// Signal raised by the kernel itself (`SI_KERNEL`)
    pub fn send_kernel(&self, target: Pid, sig: SigNum) -> Result<DeliveryOutcome, Errno> {
        self.send_sig_info(target, SigInfoRef::Info(SigInfo::kernel(sig)), sig)
    }

    /// Internal delivery with `SEND_SIG_NOINFO` or `SEND_SIG_PRIV`
    pub fn send_special(
        &self,
        target: Pid,
        sig: SigNum,
        info: SigInfoRef,
    ) -> Result<DeliveryOutcome, Errno> {
        self.send_sig_info(target, info, sig)
    }

    /// Core send path: decision point first, then the kernel's own delivery rules
    pub fn send_sig_info(
        &self,
        target: Pid,
        info: SigInfoRef,
        sig: SigNum,
    ) -> Result<DeliveryOutcome, Errno> {
        if !(0..=SIG_MAX).contains(&sig) {
            return Err(Errno::EINVAL);
        }
        let task = {
            let guard = epoch::pin();
            self.find_get_pid(target, &guard).ok_or(Errno::ESRCH)?
        };

        if let KillVerdict::Deny(errno) = self.security_task_kill(task.task(), &info, sig) {
            debug!("task_kill denied signal {} to {}: {}", sig, target, errno);
            return Err(errno);
        }
        if sig == 0 {
            return Ok(DeliveryOutcome::Probed);
        }

        let Some(state) = task.signal_state() else {
            return Ok(DeliveryOutcome::Ignored);
        };
        let terminates = Signal::from_number(sig).is_some_and(|s| s.default_terminates());
        if !terminates {
            return Ok(DeliveryOutcome::Delivered);
        }

        let forced =
            info.info().is_some_and(|i| i.from_kernel()) && sig == Signal::SIGKILL.number();
        if state.is_unkillable() && !forced {
            debug!("Group {} is unkillable, dropping signal {}", task.task().tgid(), sig);
            return Ok(DeliveryOutcome::Ignored);
        }

        self.exit_group(task.task().tgid());
        Ok(DeliveryOutcome::Terminated)
    }

    fn security_task_kill(&self, target: &Task, info: &SigInfoRef, sig: SigNum) -> KillVerdict {
        match &self.security_ops {
            Some(ops) => ops.task_kill.call(target, info, sig),
            None => KillVerdict::Allow,
        }
    }
}

impl ProcessTable for SimulatedKernel {
    // Snapshots are reference counted by the RCU cell, so the guard only
    // marks the read-side section here.
    fn find_get_pid(&self, pid: Pid, _guard: &Guard) -> Option<ProcessHandle> {
        if !is_valid_pid(pid) {
            return None;
        }
        self.processes
            .load()
            .get(&pid)
            .map(|task| ProcessHandle::get(Arc::clone(task)))
    }
}

impl KernelHost for SimulatedKernel {
    fn release(&self) -> &str {
        &self.release
    }

    fn capabilities(&self) -> KernelCapabilities {
        self.capabilities
    }

    fn security_ops(&self) -> Option<&SecurityOps> {
        self.security_ops.as_ref()
    }

    fn this_module(&self) -> Arc<ModuleRef> {
        Arc::clone(&self.module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_and_lookup() {
        let kernel = SimulatedKernel::modern();
        kernel.spawn(100).unwrap();
        assert_eq!(kernel.spawn(100).unwrap_err(), Errno::EBUSY);
        assert_eq!(kernel.spawn(0).unwrap_err(), Errno::EINVAL);

        let guard = epoch::pin();
        let handle = kernel.find_get_pid(100, &guard).unwrap();
        assert_eq!(handle.pid(), 100);
        assert!(kernel.find_get_pid(101, &guard).is_none());
    }

    #[test]
    fn test_probe_and_terminate() {
        let kernel = SimulatedKernel::modern();
        let state = kernel.spawn(100).unwrap().signal().unwrap();

        assert_eq!(kernel.kill(1, 100, 0), Ok(DeliveryOutcome::Probed));
        assert_eq!(kernel.kill(1, 100, 10), Ok(DeliveryOutcome::Terminated));
        assert!(!kernel.is_alive(100));
        assert!(state.flags().contains(SignalFlags::GROUP_EXIT));

        kernel.reap(100);
        assert_eq!(kernel.kill(1, 100, 0), Err(Errno::ESRCH));
    }

    #[test]
    fn test_unkillable_group_ignores_fatal_signals() {
        let kernel = SimulatedKernel::modern();
        let task = kernel.spawn(100).unwrap();
        kernel.spawn_thread(100, 101).unwrap();
        task.signal()
            .unwrap()
            .siglock()
            .lock_irq()
            .insert(SignalFlags::UNKILLABLE);

        assert_eq!(kernel.kill(1, 100, 9), Ok(DeliveryOutcome::Ignored));
        assert_eq!(kernel.tkill(1, 101, 15), Ok(DeliveryOutcome::Ignored));
        assert_eq!(kernel.kill(1, 100, 17), Ok(DeliveryOutcome::Delivered));
        assert_eq!(kernel.send_kernel(100, 9), Ok(DeliveryOutcome::Terminated));
        assert!(!kernel.is_alive(101));
    }

    #[test]
    fn test_capabilities_follow_version() {
        let legacy = SimulatedKernel::legacy();
        assert!(legacy.security_ops().is_some());
        assert!(legacy.capabilities().task_kill_hook);
        assert_eq!(legacy.release(), "2.6.18-194.el5");

        let modern = SimulatedKernel::modern();
        assert!(modern.security_ops().is_none());
        assert!(modern.capabilities().unkillable_flag);
    }

    #[test]
    fn test_lookup_does_not_leak_references() {
        let kernel = SimulatedKernel::modern();
        let task = kernel.spawn(100).unwrap();
        for _ in 0..10 {
            kernel.kill(1, 100, 0).unwrap();
        }
        assert_eq!(task.uses(), 0);
    }
}

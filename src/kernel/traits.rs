/*!
 * Kernel Host Traits
 * What the hold engine needs from the kernel it is loaded into
 */

use super::module::ModuleRef;
use super::process::ProcessHandle;
use super::security::SecurityOps;
use super::types::KernelCapabilities;
use crate::core::types::Pid;
use crossbeam_epoch::Guard;
use std::sync::Arc;

/// Process table lookups
pub trait ProcessTable: Send + Sync {
    /// `find_get_pid` + `pid_task`
    ///
    /// Must be called inside a read-side section; the returned handle stays
    /// valid after the section ends because it holds its own reference.
    /// `guard` witnesses that section. Tables whose entries are reclaimed
    /// through the epoch collector load them through it; tables with their
    /// own reclamation may ignore it.
    fn find_get_pid(&self, pid: Pid, guard: &Guard) -> Option<ProcessHandle>;
}

/// Kernel services the engine is built against
pub trait KernelHost: ProcessTable {
    /// `UTS_RELEASE`
    fn release(&self) -> &str;

    /// Hooking facilities available on this kernel
    fn capabilities(&self) -> KernelCapabilities;

    /// Security operations table, if the kernel exports one
    fn security_ops(&self) -> Option<&SecurityOps>;

    /// `THIS_MODULE` for the loaded hold module
    fn this_module(&self) -> Arc<ModuleRef>;
}

/// Shared handle to the host kernel
pub type HostRef = Arc<dyn KernelHost>;

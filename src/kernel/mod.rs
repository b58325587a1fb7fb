/*!
 * Kernel Module
 * Host kernel abstractions the hold engine is built against
 */

pub mod cpu;
pub mod module;
pub mod process;
pub mod security;
pub mod simulation;
pub mod traits;
pub mod types;

pub use cpu::{
    irqs_disabled, local_irq_disable, preempt_count, preempt_disable, PreemptGuard, SpinLockIrq,
};
pub use module::{ModulePin, ModuleRef, ModuleState};
pub use process::{ProcessHandle, SignalFlags, SignalState, Task};
pub use security::{
    same_entry, CapabilityTaskKill, HookSlot, SecurityOps, TaskKillEntry, TaskKillHandler,
};
pub use simulation::{DeliveryOutcome, SimulatedKernel, SimulatedKernelBuilder};
pub use traits::{HostRef, KernelHost, ProcessTable};
pub use types::{
    si_code, Errno, KernelCapabilities, KernelVersion, KillVerdict, SigInfo, SigInfoRef,
};

/*!
 * prochold
 * Keep a single process alive against termination signals from inside the kernel
 */

pub mod config;
pub mod core;
pub mod hold;
pub mod kernel;
pub mod monitoring;
pub mod signals;

// Re-exports
pub use config::ModuleParams;
pub use crate::core::errors::{HoldError, HoldResult};
pub use crate::core::types::{Pid, SigNum};
pub use hold::{
    HoldStats, InterceptionHook, ProcHoldModule, ProtectionController, SignalClassifier,
    StrategyKind,
};
pub use kernel::{HostRef, KernelHost, KernelVersion, SimulatedKernel};
pub use monitoring::init_tracing;
pub use signals::{Signal, SignalDeliveryEvent};

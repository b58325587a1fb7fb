/*!
 * Hold Engine
 * Keeps one registered process alive against termination signals
 */

pub mod audit;
pub mod classifier;
pub mod controller;
pub mod hook;
pub mod immunity;
pub mod lifecycle;
pub mod lookup;
pub mod registry;
pub mod stats;
pub mod strategy;

pub use audit::{InterceptLog, InterceptRecord, INTERCEPT_LOG_CAPACITY};
pub use classifier::{Classification, ForwardReason, SignalClassifier};
pub use controller::ProtectionController;
pub use hook::{HookState, InterceptionHook, SignalInterceptor, HOOK_OWNER};
pub use immunity::{ImmunityFlag, ImmunityFlagStrategy};
pub use lifecycle::ProcHoldModule;
pub use lookup::ProcessLookup;
pub use registry::ProtectedPidRegistry;
pub use stats::{AtomicHoldStats, HoldStats};
pub use strategy::{ActiveStrategy, ProtectionStrategy, StrategyKind};

/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::core::types::Pid;
use crate::kernel::Errno;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for hold engine operations
pub type HoldResult<T> = Result<T, HoldError>;

/// Errors raised by the process hold engine
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum HoldError {
    #[error("Invalid argument: {0}")]
    #[diagnostic(
        code(prochold::invalid_argument),
        help("Pids and signal numbers must be strictly positive.")
    )]
    InvalidArgument(String),

    #[error("Process {0} not found")]
    #[diagnostic(
        code(prochold::not_found),
        help("The process may have exited before it could be held.")
    )]
    NotFound(Pid),

    #[error("Process {0} has no signal state")]
    #[diagnostic(
        code(prochold::no_signal_state),
        help("Zombie processes have already released their signal state.")
    )]
    NoSignalState(Pid),

    #[error("task_kill slot was taken by another owner during install")]
    #[diagnostic(
        code(prochold::already_taken),
        help("Another module changed the security hook concurrently. Retry the load.")
    )]
    AlreadyTaken,

    #[error("No task_kill handler installed to chain to")]
    #[diagnostic(
        code(prochold::no_original),
        help("The interception hook needs an existing handler to forward to and restore.")
    )]
    NoOriginal,

    #[error("task_kill chain corrupted: slot no longer holds the hold hook")]
    #[diagnostic(
        code(prochold::chain_corrupted),
        help("Another module replaced the hook after install. The chain was left untouched.")
    )]
    ChainCorrupted,

    #[error("Permission denied: {0}")]
    #[diagnostic(
        code(prochold::permission_denied),
        help("The module is unloading; events are forwarded without interception.")
    )]
    PermissionDenied(String),

    #[error("Security hook point is not available on this kernel")]
    #[diagnostic(
        code(prochold::hook_unavailable),
        help("Kernels from 2.6.26 on use the unkillable flag strategy instead.")
    )]
    HookUnavailable,

    #[error("Protection has not been started")]
    #[diagnostic(code(prochold::not_started))]
    NotStarted,

    #[error("Protection already started")]
    #[diagnostic(code(prochold::already_started))]
    AlreadyStarted,

    #[error("Process {0} is already held; only one process can be protected")]
    #[diagnostic(
        code(prochold::slot_occupied),
        help("Unhold the current process before holding another one.")
    )]
    SlotOccupied(Pid),

    #[error("Invalid module parameter: {0}")]
    #[diagnostic(
        code(prochold::invalid_config),
        help("Parameters are given as key=value pairs, e.g. client_pid=500.")
    )]
    InvalidConfig(String),
}

impl HoldError {
    /// Kernel return code reported to the loader for this error
    pub fn errno(&self) -> Errno {
        match self {
            HoldError::InvalidArgument(_) | HoldError::InvalidConfig(_) => Errno::EINVAL,
            HoldError::NotFound(_) | HoldError::NoSignalState(_) => Errno::ESRCH,
            HoldError::PermissionDenied(_) => Errno::EPERM,
            HoldError::AlreadyTaken | HoldError::SlotOccupied(_) | HoldError::AlreadyStarted => {
                Errno::EBUSY
            }
            HoldError::NoOriginal
            | HoldError::ChainCorrupted
            | HoldError::HookUnavailable
            | HoldError::NotStarted => Errno::EFAULT,
        }
    }

    /// Whether the error means the decision-point chain can no longer be trusted
    pub fn is_chain_fault(&self) -> bool {
        matches!(self, HoldError::AlreadyTaken | HoldError::ChainCorrupted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(HoldError::InvalidArgument("pid".into()).errno(), Errno::EINVAL);
        assert_eq!(HoldError::NotFound(7).errno(), Errno::ESRCH);
        assert_eq!(HoldError::NoSignalState(7).errno(), Errno::ESRCH);
        assert_eq!(HoldError::ChainCorrupted.errno(), Errno::EFAULT);
        assert_eq!(HoldError::SlotOccupied(3).errno().code(), -16);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_string(&HoldError::NotFound(42)).unwrap();
        assert_eq!(json, r#"{"error_type":"not_found","details":42}"#);
    }

    #[test]
    fn test_chain_faults() {
        assert!(HoldError::ChainCorrupted.is_chain_fault());
        assert!(HoldError::AlreadyTaken.is_chain_fault());
        assert!(!HoldError::NoOriginal.is_chain_fault());
    }
}

/*!
 * Core Types
 * Common types shared by the hold engine and its host kernel
 */

/// Process ID as the kernel sees it (`pid_t`)
///
/// Signed on purpose: module parameters and signal info carry raw values, and
/// zero or negative ids must be representable so they can be rejected.
pub type Pid = i32;

/// Raw signal number as carried by a delivery attempt
pub type SigNum = i32;

/// Sentinel for "no pid configured" in module parameters
pub const PID_UNCONFIGURED: Pid = -1;

/// Value the protected-pid registry holds when nothing is protected
pub const PID_UNSET: Pid = 0;

/// Whether a raw pid may refer to a process at all
#[inline(always)]
pub const fn is_valid_pid(pid: Pid) -> bool {
    pid > 0
}

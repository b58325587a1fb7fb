/*!
 * Kernel Types
 * Signal info, return codes and version gating shared with the host kernel
 */

use crate::core::types::{Pid, SigNum};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Kernel error numbers used by the hold engine and the simulated kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum Errno {
    /// Operation not permitted
    EPERM = 1,
    /// No such process
    ESRCH = 3,
    /// Bad address
    EFAULT = 14,
    /// Device or resource busy
    EBUSY = 16,
    /// Invalid argument
    EINVAL = 22,
}

impl Errno {
    /// Negative return code as handed back from kernel entry points
    #[inline]
    pub fn code(self) -> i32 {
        -(self as i32)
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

impl std::error::Error for Errno {}

/// `si_code` values distinguishing how a signal was raised
pub mod si_code {
    /// Sent by kill(2) or raise(3)
    pub const SI_USER: i32 = 0;
    /// Sent by the kernel itself
    pub const SI_KERNEL: i32 = 0x80;
    /// Sent by sigqueue(3)
    pub const SI_QUEUE: i32 = -1;
    /// Sent by tkill(2) or tgkill(2)
    pub const SI_TKILL: i32 = -6;
}

/// Signal information attached to a delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigInfo {
    pub signo: SigNum,
    pub code: i32,
    /// Pid of the sending process (0 for the kernel)
    pub pid: Pid,
}

impl SigInfo {
    pub fn new(signo: SigNum, code: i32, pid: Pid) -> Self {
        Self { signo, code, pid }
    }

    /// Info built by kill(2)
    pub fn user(signo: SigNum, sender: Pid) -> Self {
        Self::new(signo, si_code::SI_USER, sender)
    }

    /// Info built by sigqueue(3)
    pub fn queued(signo: SigNum, sender: Pid) -> Self {
        Self::new(signo, si_code::SI_QUEUE, sender)
    }

    /// Info built by tkill(2)
    pub fn tkill(signo: SigNum, sender: Pid) -> Self {
        Self::new(signo, si_code::SI_TKILL, sender)
    }

    /// Info built for kernel-originated signals
    pub fn kernel(signo: SigNum) -> Self {
        Self::new(signo, si_code::SI_KERNEL, 0)
    }

    /// `SI_FROMKERNEL`: positive codes are reserved for the kernel
    #[inline]
    pub fn from_kernel(&self) -> bool {
        self.code > 0
    }

    /// Raised through the sigqueue(3) channel
    #[inline]
    pub fn from_queue(&self) -> bool {
        self.code == si_code::SI_QUEUE
    }
}

/// What accompanies a delivery attempt into the decision point
///
/// The kernel passes two magic info pointers besides real signal info:
/// `SEND_SIG_NOINFO` and `SEND_SIG_PRIV`. Both carry no sender metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigInfoRef {
    NoInfo,
    Priv,
    Info(SigInfo),
}

impl SigInfoRef {
    /// `is_si_special`
    #[inline]
    pub fn is_special(&self) -> bool {
        !matches!(self, SigInfoRef::Info(_))
    }

    #[inline]
    pub fn info(&self) -> Option<&SigInfo> {
        match self {
            SigInfoRef::Info(info) => Some(info),
            _ => None,
        }
    }
}

/// Verdict returned from the task_kill decision point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KillVerdict {
    Allow,
    Deny(Errno),
}

impl KillVerdict {
    #[inline]
    pub fn is_allowed(&self) -> bool {
        matches!(self, KillVerdict::Allow)
    }

    /// Kernel return code, 0 on allow
    pub fn code(&self) -> i32 {
        match self {
            KillVerdict::Allow => 0,
            KillVerdict::Deny(errno) => errno.code(),
        }
    }
}

/// Kernel release version used for capability gating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KernelVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl KernelVersion {
    /// First release exposing `SIGNAL_UNKILLABLE` on the signal struct
    pub const UNKILLABLE_FLAG: KernelVersion = KernelVersion::new(2, 6, 26);

    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Capabilities a stock kernel of this version offers
    ///
    /// Before the unkillable flag existed the security operations table was
    /// still exported and writable, so exactly one strategy is available.
    pub fn capabilities(&self) -> KernelCapabilities {
        let has_flag = *self >= Self::UNKILLABLE_FLAG;
        KernelCapabilities {
            unkillable_flag: has_flag,
            task_kill_hook: !has_flag,
        }
    }
}

impl PartialOrd for KernelVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KernelVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for KernelVersion {
    type Err = String;

    /// Parses a release string such as `2.6.18-194.el5`; the numeric prefix is used
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let numeric = s
            .split(|c: char| !(c.is_ascii_digit() || c == '.'))
            .next()
            .unwrap_or("");
        let mut parts = numeric.split('.').filter(|p| !p.is_empty());
        let mut next = |name: &str| -> Result<u16, String> {
            match parts.next() {
                Some(p) => p
                    .parse::<u16>()
                    .map_err(|e| format!("bad {} in release '{}': {}", name, s, e)),
                None => Ok(0),
            }
        };

        let major = next("major")?;
        let minor = next("minor")?;
        let patch = next("patch")?;
        if major == 0 {
            return Err(format!("release '{}' has no version number", s));
        }
        Ok(Self::new(major, minor, patch))
    }
}

/// Hooking facilities the host kernel exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KernelCapabilities {
    /// Signal struct carries a group-wide unkillable attribute
    pub unkillable_flag: bool,
    /// Security operations expose a replaceable task_kill decision point
    pub task_kill_hook: bool,
}

/*!
 * Signal Types
 * UNIX signal numbers and their default dispositions
 */

use crate::core::types::SigNum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard UNIX signal numbers (Linux x86 numbering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum Signal {
    /// Hangup detected on controlling terminal or death of controlling process
    SIGHUP = 1,
    /// Interrupt from keyboard (Ctrl+C)
    SIGINT = 2,
    /// Quit from keyboard (Ctrl+\)
    SIGQUIT = 3,
    /// Illegal instruction
    SIGILL = 4,
    /// Trace/breakpoint trap
    SIGTRAP = 5,
    /// Abort signal
    SIGABRT = 6,
    /// Bus error (bad memory access)
    SIGBUS = 7,
    /// Floating-point exception
    SIGFPE = 8,
    /// Kill signal (cannot be caught or ignored)
    SIGKILL = 9,
    /// User-defined signal 1
    SIGUSR1 = 10,
    /// Invalid memory reference
    SIGSEGV = 11,
    /// User-defined signal 2
    SIGUSR2 = 12,
    /// Broken pipe
    SIGPIPE = 13,
    /// Timer signal
    SIGALRM = 14,
    /// Termination signal
    SIGTERM = 15,
    /// Stack fault on coprocessor
    SIGSTKFLT = 16,
    /// Child process stopped or terminated
    SIGCHLD = 17,
    /// Continue if stopped
    SIGCONT = 18,
    /// Stop process (cannot be caught or ignored)
    SIGSTOP = 19,
    /// Stop typed at terminal (Ctrl+Z)
    SIGTSTP = 20,
    /// Terminal input for background process
    SIGTTIN = 21,
    /// Terminal output for background process
    SIGTTOU = 22,
    /// Urgent condition on socket
    SIGURG = 23,
    /// CPU time limit exceeded
    SIGXCPU = 24,
    /// File size limit exceeded
    SIGXFSZ = 25,
    /// Virtual alarm clock
    SIGVTALRM = 26,
    /// Profiling timer expired
    SIGPROF = 27,
    /// Window resize signal
    SIGWINCH = 28,
    /// I/O now possible
    SIGIO = 29,
    /// Power failure
    SIGPWR = 30,
    /// Bad system call
    SIGSYS = 31,
}

/// Termination-class signals a held process is shielded from
pub const TRACKED_SIGNALS: [Signal; 4] = [
    Signal::SIGINT,
    Signal::SIGTERM,
    Signal::SIGQUIT,
    Signal::SIGABRT,
];

impl Signal {
    /// Convert from signal number
    pub fn from_number(n: SigNum) -> Option<Self> {
        let signal = match n {
            1 => Signal::SIGHUP,
            2 => Signal::SIGINT,
            3 => Signal::SIGQUIT,
            4 => Signal::SIGILL,
            5 => Signal::SIGTRAP,
            6 => Signal::SIGABRT,
            7 => Signal::SIGBUS,
            8 => Signal::SIGFPE,
            9 => Signal::SIGKILL,
            10 => Signal::SIGUSR1,
            11 => Signal::SIGSEGV,
            12 => Signal::SIGUSR2,
            13 => Signal::SIGPIPE,
            14 => Signal::SIGALRM,
            15 => Signal::SIGTERM,
            16 => Signal::SIGSTKFLT,
            17 => Signal::SIGCHLD,
            18 => Signal::SIGCONT,
            19 => Signal::SIGSTOP,
            20 => Signal::SIGTSTP,
            21 => Signal::SIGTTIN,
            22 => Signal::SIGTTOU,
            23 => Signal::SIGURG,
            24 => Signal::SIGXCPU,
            25 => Signal::SIGXFSZ,
            26 => Signal::SIGVTALRM,
            27 => Signal::SIGPROF,
            28 => Signal::SIGWINCH,
            29 => Signal::SIGIO,
            30 => Signal::SIGPWR,
            31 => Signal::SIGSYS,
            _ => return None,
        };
        Some(signal)
    }

    /// Get signal number
    #[inline]
    pub fn number(&self) -> SigNum {
        *self as SigNum
    }

    /// One of the termination-class signals shielded by a hold
    #[inline]
    pub fn is_tracked(&self) -> bool {
        matches!(
            self,
            Signal::SIGINT | Signal::SIGTERM | Signal::SIGQUIT | Signal::SIGABRT
        )
    }

    /// Whether the default disposition ends the thread group
    pub fn default_terminates(&self) -> bool {
        !matches!(
            self,
            Signal::SIGCHLD
                | Signal::SIGCONT
                | Signal::SIGSTOP
                | Signal::SIGTSTP
                | Signal::SIGTTIN
                | Signal::SIGTTOU
                | Signal::SIGURG
                | Signal::SIGWINCH
        )
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.number())
    }
}

/// Whether a raw signal number is in the shielded set
#[inline]
pub fn is_tracked_signal(sig: SigNum) -> bool {
    Signal::from_number(sig).is_some_and(|s| s.is_tracked())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_from_number() {
        assert_eq!(Signal::from_number(9), Some(Signal::SIGKILL));
        assert_eq!(Signal::from_number(15), Some(Signal::SIGTERM));
        assert_eq!(Signal::from_number(0), None);
        assert_eq!(Signal::from_number(64), None);
    }

    #[test]
    fn test_tracked_set() {
        let tracked: Vec<SigNum> = (1..=31).filter(|&n| is_tracked_signal(n)).collect();
        assert_eq!(tracked, vec![2, 3, 6, 15]);
        assert!(TRACKED_SIGNALS.iter().all(Signal::is_tracked));
    }

    #[test]
    fn test_default_dispositions() {
        assert!(Signal::SIGKILL.default_terminates());
        assert!(Signal::SIGINT.default_terminates());
        assert!(!Signal::SIGCHLD.default_terminates());
        assert!(!Signal::SIGSTOP.default_terminates());
    }
}

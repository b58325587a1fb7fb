/*!
 * Process Lookup
 * Resolve a pid to a counted handle on a live task
 */

use crate::core::errors::{HoldError, HoldResult};
use crate::core::types::{is_valid_pid, Pid};
use crate::kernel::{HostRef, ProcessHandle};
use crossbeam_epoch as epoch;

/// Thin wrapper over the host's process table
#[derive(Clone)]
pub struct ProcessLookup {
    host: HostRef,
}

impl ProcessLookup {
    pub fn new(host: HostRef) -> Self {
        Self { host }
    }

    /// Counted handle for `pid`
    ///
    /// Invalid pids fail before the table is touched. The lookup runs in an
    /// epoch read-side section since tasks come and go concurrently; the
    /// handle keeps its own reference once the section ends.
    pub fn resolve(&self, pid: Pid) -> HoldResult<ProcessHandle> {
        if !is_valid_pid(pid) {
            return Err(HoldError::InvalidArgument(format!("pid {}", pid)));
        }
        let guard = epoch::pin();
        self.host
            .find_get_pid(pid, &guard)
            .ok_or(HoldError::NotFound(pid))
    }
}

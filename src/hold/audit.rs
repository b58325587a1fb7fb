/*!
 * Intercept Log
 * Bounded record of recently suppressed signals
 */

use crate::core::types::{Pid, SigNum};
use crate::signals::SignalDeliveryEvent;
use crossbeam_queue::ArrayQueue;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Default number of records kept
pub const INTERCEPT_LOG_CAPACITY: usize = 64;

/// One suppressed delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptRecord {
    pub target_pid: Pid,
    pub sender_pid: Pid,
    pub signal: SigNum,
    pub timestamp_us: u64,
}

impl InterceptRecord {
    pub fn from_event(event: &SignalDeliveryEvent) -> Self {
        Self {
            target_pid: event.target_pid,
            sender_pid: event.sender_pid,
            signal: event.signal_number,
            timestamp_us: Self::timestamp(),
        }
    }

    fn timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as u64
    }
}

/// Lock-free ring of the most recent intercepts
///
/// Recording never blocks: when full, the oldest record is overwritten.
pub struct InterceptLog {
    records: ArrayQueue<InterceptRecord>,
}

impl InterceptLog {
    pub fn new() -> Self {
        Self::with_capacity(INTERCEPT_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: ArrayQueue::new(capacity.max(1)),
        }
    }

    #[inline]
    pub fn record(&self, event: &SignalDeliveryEvent) {
        let _ = self.records.force_push(InterceptRecord::from_event(event));
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Take all records, oldest first
    pub fn drain(&self) -> Vec<InterceptRecord> {
        std::iter::from_fn(|| self.records.pop()).collect()
    }
}

impl Default for InterceptLog {
    fn default() -> Self {
        Self::new()
    }
}

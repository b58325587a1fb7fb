/*!
 * Lock-Free Hold Statistics
 * Atomic counters for the signal hot path
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of hold activity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldStats {
    pub events_seen: u64,
    pub events_intercepted: u64,
    pub events_forwarded: u64,
    pub pin_failures: u64,
    pub holds: u64,
    pub unholds: u64,
}

/// Atomic hold statistics for lock-free updates
///
/// # Performance
/// - Cache-line aligned to prevent false sharing
/// - All operations use relaxed ordering; counters are monitoring data only
#[repr(C, align(64))]
#[derive(Debug)]
pub struct AtomicHoldStats {
    events_seen: AtomicU64,
    events_intercepted: AtomicU64,
    events_forwarded: AtomicU64,
    pin_failures: AtomicU64,
    holds: AtomicU64,
    unholds: AtomicU64,
}

impl AtomicHoldStats {
    #[inline]
    pub const fn new() -> Self {
        Self {
            events_seen: AtomicU64::new(0),
            events_intercepted: AtomicU64::new(0),
            events_forwarded: AtomicU64::new(0),
            pin_failures: AtomicU64::new(0),
            holds: AtomicU64::new(0),
            unholds: AtomicU64::new(0),
        }
    }

    /// Hot path - every task_kill call
    #[inline(always)]
    pub fn inc_seen(&self) {
        self.events_seen.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_intercepted(&self) {
        self.events_intercepted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_forwarded(&self) {
        self.events_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_pin_failures(&self) {
        self.pin_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_holds(&self) {
        self.holds.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_unholds(&self) {
        self.unholds.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current stats (no locks required)
    ///
    /// # Note
    /// Values may not be consistent with each other under concurrent updates,
    /// but each individual value is accurate.
    #[inline]
    pub fn snapshot(&self) -> HoldStats {
        HoldStats {
            events_seen: self.events_seen.load(Ordering::Relaxed),
            events_intercepted: self.events_intercepted.load(Ordering::Relaxed),
            events_forwarded: self.events_forwarded.load(Ordering::Relaxed),
            pin_failures: self.pin_failures.load(Ordering::Relaxed),
            holds: self.holds.load(Ordering::Relaxed),
            unholds: self.unholds.load(Ordering::Relaxed),
        }
    }
}

impl Default for AtomicHoldStats {
    fn default() -> Self {
        Self::new()
    }
}

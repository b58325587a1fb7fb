/*!
 * Read-Copy-Update (RCU) Cell
 * Zero-contention reads for the simulated process table
 */

use arc_swap::ArcSwap;
use std::sync::Arc;

/// RCU-protected value with lock-free reads
///
/// Readers take a snapshot `Arc` and keep using it even if a writer publishes
/// a new version meanwhile; the old version is reclaimed once the last reader
/// drops its snapshot. Writers clone, modify and swap.
///
/// # Performance
///
/// - **Reads**: atomic pointer load (~1-2ns)
/// - **Writes**: clone-modify-swap, retried under contention
pub struct RcuCell<T> {
    inner: ArcSwap<T>,
}

impl<T> RcuCell<T> {
    #[inline]
    pub fn new(value: T) -> Self {
        Self {
            inner: ArcSwap::from_pointee(value),
        }
    }

    /// Load current snapshot (zero-contention)
    #[inline(always)]
    pub fn load(&self) -> Arc<T> {
        self.inner.load_full()
    }

    /// Publish a new version derived from the current one
    ///
    /// The closure may run more than once if writers race.
    #[inline]
    pub fn update<F>(&self, mut f: F)
    where
        F: FnMut(&T) -> T,
    {
        self.inner.rcu(|old| f(&**old));
    }

    /// Replace value entirely
    #[inline]
    pub fn store(&self, new_value: T) {
        self.inner.store(Arc::new(new_value));
    }
}

impl<T: Default> Default for RcuCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

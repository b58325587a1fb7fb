/*!
 * CPU Context Primitives
 * Preemption and interrupt masking as scoped guards
 *
 * Each OS thread stands in for a CPU. Nesting depth is tracked per thread so
 * critical sections can assert the context they run in.
 */

use parking_lot::{Mutex, MutexGuard};
use std::cell::Cell;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{compiler_fence, Ordering};

thread_local! {
    static PREEMPT_COUNT: Cell<usize> = const { Cell::new(0) };
    static IRQ_DISABLE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Preemption stays disabled on this CPU until the guard drops
///
/// `!Send`: the guard must be released on the CPU that took it.
#[must_use = "preemption is re-enabled as soon as the guard is dropped"]
pub struct PreemptGuard {
    _not_send: PhantomData<*const ()>,
}

/// `preempt_disable()` followed by a compiler barrier
#[inline]
pub fn preempt_disable() -> PreemptGuard {
    PREEMPT_COUNT.with(|c| c.set(c.get() + 1));
    compiler_fence(Ordering::SeqCst);
    PreemptGuard {
        _not_send: PhantomData,
    }
}

impl Drop for PreemptGuard {
    #[inline]
    fn drop(&mut self) {
        compiler_fence(Ordering::SeqCst);
        PREEMPT_COUNT.with(|c| c.set(c.get().saturating_sub(1)));
    }
}

/// Current preemption-disable nesting on this CPU
#[inline]
pub fn preempt_count() -> usize {
    PREEMPT_COUNT.with(|c| c.get())
}

/// Local interrupts stay masked until the guard drops
#[must_use = "interrupts are re-enabled as soon as the guard is dropped"]
pub struct IrqGuard {
    _not_send: PhantomData<*const ()>,
}

#[inline]
pub fn local_irq_disable() -> IrqGuard {
    IRQ_DISABLE_DEPTH.with(|c| c.set(c.get() + 1));
    compiler_fence(Ordering::SeqCst);
    IrqGuard {
        _not_send: PhantomData,
    }
}

impl Drop for IrqGuard {
    #[inline]
    fn drop(&mut self) {
        compiler_fence(Ordering::SeqCst);
        IRQ_DISABLE_DEPTH.with(|c| c.set(c.get().saturating_sub(1)));
    }
}

#[inline]
pub fn irqs_disabled() -> bool {
    IRQ_DISABLE_DEPTH.with(|c| c.get() > 0)
}

/// Spinlock taken with local interrupts disabled (`spin_lock_irq`)
pub struct SpinLockIrq<T> {
    inner: Mutex<T>,
}

impl<T> SpinLockIrq<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Mask interrupts, then take the lock
    pub fn lock_irq(&self) -> SpinIrqGuard<'_, T> {
        let irq = local_irq_disable();
        let guard = self.inner.lock();
        SpinIrqGuard {
            guard,
            _irq: irq,
        }
    }
}

impl<T: Default> Default for SpinLockIrq<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Held lock plus masked interrupts
///
/// Field order matters: the lock is released before interrupts come back.
pub struct SpinIrqGuard<'a, T> {
    guard: MutexGuard<'a, T>,
    _irq: IrqGuard,
}

impl<T> Deref for SpinIrqGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for SpinIrqGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preempt_nesting() {
        assert_eq!(preempt_count(), 0);
        {
            let _outer = preempt_disable();
            assert_eq!(preempt_count(), 1);
            {
                let _inner = preempt_disable();
                assert_eq!(preempt_count(), 2);
            }
            assert_eq!(preempt_count(), 1);
        }
        assert_eq!(preempt_count(), 0);
    }

    #[test]
    fn test_lock_irq_masks_interrupts() {
        let lock = SpinLockIrq::new(0u32);
        assert!(!irqs_disabled());
        {
            let mut value = lock.lock_irq();
            assert!(irqs_disabled());
            *value |= 0x40;
        }
        assert!(!irqs_disabled());
        assert_eq!(*lock.lock_irq(), 0x40);
    }
}

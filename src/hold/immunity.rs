/*!
 * Immunity Flag
 * Coarse protection through the group-wide unkillable attribute
 */

use super::strategy::{ProtectionStrategy, StrategyKind};
use crate::core::errors::{HoldError, HoldResult};
use crate::kernel::{ProcessHandle, SignalFlags};
use log::debug;

/// Set and clear `SIGNAL_UNKILLABLE` on a task's signal state
///
/// The flag word carries unrelated bits, so changes are read-modify-write
/// under the siglock with interrupts masked.
pub struct ImmunityFlag;

impl ImmunityFlag {
    pub fn set(handle: &ProcessHandle) -> HoldResult<()> {
        Self::update(handle, |flags| flags.insert(SignalFlags::UNKILLABLE))
    }

    pub fn clear(handle: &ProcessHandle) -> HoldResult<()> {
        Self::update(handle, |flags| flags.remove(SignalFlags::UNKILLABLE))
    }

    pub fn is_set(handle: &ProcessHandle) -> HoldResult<bool> {
        let state = handle
            .signal_state()
            .ok_or(HoldError::NoSignalState(handle.pid()))?;
        Ok(state.is_unkillable())
    }

    fn update(handle: &ProcessHandle, op: impl FnOnce(&mut SignalFlags)) -> HoldResult<()> {
        let state = handle
            .signal_state()
            .ok_or(HoldError::NoSignalState(handle.pid()))?;
        let mut flags = state.siglock().lock_irq();
        op(&mut *flags);
        debug!("Signal flags of {} now {:?}", handle.pid(), *flags);
        Ok(())
    }
}

/// Strategy for kernels that enforce immunity themselves
///
/// Nothing is installed: the kernel's delivery code reads the flag. Signal
/// kind and sender are not considered once the flag is set.
#[derive(Debug, Default)]
pub struct ImmunityFlagStrategy {
    _private: (),
}

impl ImmunityFlagStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProtectionStrategy for ImmunityFlagStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ImmunityFlag
    }

    fn install(&mut self) -> HoldResult<()> {
        Ok(())
    }

    fn hold(&self, handle: &ProcessHandle) -> HoldResult<()> {
        ImmunityFlag::set(handle)
    }

    fn unhold(&self, handle: &ProcessHandle) -> HoldResult<()> {
        ImmunityFlag::clear(handle)
    }

    fn restore(&mut self) -> HoldResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{SignalState, Task};

    #[test]
    fn test_set_preserves_other_bits() {
        let task = Task::leader(10);
        task.signal()
            .unwrap()
            .siglock()
            .lock_irq()
            .insert(SignalFlags::GROUP_EXIT);
        let handle = ProcessHandle::get(task.clone());

        ImmunityFlag::set(&handle).unwrap();
        let state: std::sync::Arc<SignalState> = task.signal().unwrap();
        assert_eq!(state.flags().bits(), 0x44);

        ImmunityFlag::clear(&handle).unwrap();
        assert_eq!(state.flags(), SignalFlags::GROUP_EXIT);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let handle = ProcessHandle::get(Task::leader(10));
        ImmunityFlag::clear(&handle).unwrap();
        ImmunityFlag::clear(&handle).unwrap();
        assert!(!ImmunityFlag::is_set(&handle).unwrap());
    }

    #[test]
    fn test_zombie_has_no_signal_state() {
        let task = Task::leader(10);
        task.detach_signal();
        let handle = ProcessHandle::get(task);
        assert_eq!(ImmunityFlag::set(&handle), Err(HoldError::NoSignalState(10)));
    }
}

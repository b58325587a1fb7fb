/*!
 * Signal Delivery Events
 * The facts about one send attempt that interception decisions are made on
 */

use crate::core::types::{Pid, SigNum};
use crate::kernel::{SigInfoRef, Task};
use serde::{Deserialize, Serialize};

/// Who raised the signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalOrigin {
    /// A user process through a syscall
    User,
    /// The kernel on its own behalf
    Kernel,
    /// Internal delivery without signal info (`SEND_SIG_NOINFO`/`SEND_SIG_PRIV`)
    Special,
}

/// Syscall channel the signal came through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMechanism {
    /// kill(2), tkill(2) and everything not queued
    Direct,
    /// sigqueue(3)
    Queued,
}

/// One signal send attempt as seen by the task_kill decision point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalDeliveryEvent {
    pub target_pid: Pid,
    pub signal_number: SigNum,
    pub sender_pid: Pid,
    pub origin: SignalOrigin,
    pub delivery_mechanism: DeliveryMechanism,
}

impl SignalDeliveryEvent {
    pub fn new(
        target_pid: Pid,
        signal_number: SigNum,
        sender_pid: Pid,
        origin: SignalOrigin,
        delivery_mechanism: DeliveryMechanism,
    ) -> Self {
        Self {
            target_pid,
            signal_number,
            sender_pid,
            origin,
            delivery_mechanism,
        }
    }

    /// User signal sent through sigqueue(3)
    pub fn queued(target_pid: Pid, signal_number: SigNum, sender_pid: Pid) -> Self {
        Self::new(
            target_pid,
            signal_number,
            sender_pid,
            SignalOrigin::User,
            DeliveryMechanism::Queued,
        )
    }

    /// User signal sent through kill(2)
    pub fn direct(target_pid: Pid, signal_number: SigNum, sender_pid: Pid) -> Self {
        Self::new(
            target_pid,
            signal_number,
            sender_pid,
            SignalOrigin::User,
            DeliveryMechanism::Direct,
        )
    }

    /// Describe a task_kill call
    ///
    /// The target is identified by its thread group id, matching how
    /// processes are held.
    pub fn from_task_kill(target: &Task, info: &SigInfoRef, sig: SigNum) -> Self {
        let (origin, mechanism, sender) = match info {
            SigInfoRef::NoInfo | SigInfoRef::Priv => {
                (SignalOrigin::Special, DeliveryMechanism::Direct, 0)
            }
            SigInfoRef::Info(info) => {
                let origin = if info.from_kernel() {
                    SignalOrigin::Kernel
                } else {
                    SignalOrigin::User
                };
                let mechanism = if info.from_queue() {
                    DeliveryMechanism::Queued
                } else {
                    DeliveryMechanism::Direct
                };
                (origin, mechanism, info.pid)
            }
        };
        Self::new(target.tgid(), sig, sender, origin, mechanism)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::SigInfo;

    #[test]
    fn test_from_queued_info() {
        let task = Task::leader(500);
        let event = SignalDeliveryEvent::from_task_kill(
            &task,
            &SigInfoRef::Info(SigInfo::queued(15, 999)),
            15,
        );
        assert_eq!(event, SignalDeliveryEvent::queued(500, 15, 999));
    }

    #[test]
    fn test_thread_target_maps_to_group() {
        let leader = Task::leader(500);
        let thread = Task::thread_of(&leader, 503);
        let event = SignalDeliveryEvent::from_task_kill(
            &thread,
            &SigInfoRef::Info(SigInfo::tkill(2, 42)),
            2,
        );
        assert_eq!(event.target_pid, 500);
        assert_eq!(event.delivery_mechanism, DeliveryMechanism::Direct);
    }

    #[test]
    fn test_origin_classification() {
        let task = Task::leader(1);
        let kernel =
            SignalDeliveryEvent::from_task_kill(&task, &SigInfoRef::Info(SigInfo::kernel(9)), 9);
        assert_eq!(kernel.origin, SignalOrigin::Kernel);

        let special = SignalDeliveryEvent::from_task_kill(&task, &SigInfoRef::Priv, 9);
        assert_eq!(special.origin, SignalOrigin::Special);
        assert_eq!(special.sender_pid, 0);
    }
}

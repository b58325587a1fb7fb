/*!
 * Signal Classifier
 * Decides whether one delivery attempt against the held process is suppressed
 */

use super::registry::ProtectedPidRegistry;
use crate::core::types::Pid;
use crate::signals::{is_tracked_signal, DeliveryMechanism, SignalDeliveryEvent, SignalOrigin};
use serde::{Deserialize, Serialize};

/// Why an event is let through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwardReason {
    /// Target pid is zero or negative
    InvalidTarget,
    /// Signal 0 probes for existence; nothing is delivered
    NotASignal,
    /// No sender metadata to judge by
    SpecialInfo,
    /// Kernel-internal delivery is never blocked
    KernelOrigin,
    /// Target is not the held process
    NotProtected,
    /// The held process signalling itself
    SelfSignal,
    /// Only the sigqueue channel is filtered
    DirectChannel,
    /// Outside the termination-class set
    UntrackedSignal,
}

/// Outcome of classifying one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Intercept,
    Forward(ForwardReason),
}

impl Classification {
    #[inline]
    pub fn is_intercept(&self) -> bool {
        matches!(self, Classification::Intercept)
    }
}

/// Pure interception policy
///
/// Checks run in a fixed order and the first one that fails forwards the
/// event. Safe to call from any context: no locks, no allocation.
pub struct SignalClassifier;

impl SignalClassifier {
    /// Classify `event` against the currently protected pid
    pub fn classify(event: &SignalDeliveryEvent, protected: Option<Pid>) -> Classification {
        use ForwardReason::*;

        if event.target_pid <= 0 {
            return Classification::Forward(InvalidTarget);
        }
        if event.signal_number <= 0 {
            return Classification::Forward(NotASignal);
        }
        match event.origin {
            SignalOrigin::Special => return Classification::Forward(SpecialInfo),
            SignalOrigin::Kernel => return Classification::Forward(KernelOrigin),
            SignalOrigin::User => {}
        }
        let Some(protected) = protected.filter(|&pid| pid == event.target_pid) else {
            return Classification::Forward(NotProtected);
        };
        if event.sender_pid == protected {
            return Classification::Forward(SelfSignal);
        }
        // Deliberately narrow: plain kill(2) is left alone
        if event.delivery_mechanism != DeliveryMechanism::Queued {
            return Classification::Forward(DirectChannel);
        }
        if !is_tracked_signal(event.signal_number) {
            return Classification::Forward(UntrackedSignal);
        }
        Classification::Intercept
    }

    /// Whether this exact delivery attempt must be suppressed
    #[inline]
    pub fn should_intercept(event: &SignalDeliveryEvent, registry: &ProtectedPidRegistry) -> bool {
        Self::classify(event, registry.load()).is_intercept()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::Signal;
    use proptest::prelude::*;

    const TERM: i32 = Signal::SIGTERM as i32;

    fn held(pid: Pid) -> ProtectedPidRegistry {
        let registry = ProtectedPidRegistry::new();
        registry.claim(pid).unwrap();
        registry
    }

    #[test]
    fn test_queued_term_from_other_is_intercepted() {
        let registry = held(500);
        let event = SignalDeliveryEvent::queued(500, TERM, 999);
        assert!(SignalClassifier::should_intercept(&event, &registry));
    }

    #[test]
    fn test_direct_channel_passes() {
        let registry = held(500);
        let event = SignalDeliveryEvent::direct(500, TERM, 999);
        assert_eq!(
            SignalClassifier::classify(&event, registry.load()),
            Classification::Forward(ForwardReason::DirectChannel)
        );
    }

    #[test]
    fn test_kill_signal_passes() {
        let registry = held(500);
        let event = SignalDeliveryEvent::queued(500, Signal::SIGKILL.number(), 999);
        assert_eq!(
            SignalClassifier::classify(&event, registry.load()),
            Classification::Forward(ForwardReason::UntrackedSignal)
        );
    }

    #[test]
    fn test_self_signal_passes() {
        let registry = held(500);
        let event = SignalDeliveryEvent::queued(500, TERM, 500);
        assert_eq!(
            SignalClassifier::classify(&event, registry.load()),
            Classification::Forward(ForwardReason::SelfSignal)
        );
    }

    #[test]
    fn test_check_order() {
        // Probe wins over every later check
        let probe =
            SignalDeliveryEvent::new(500, 0, 999, SignalOrigin::Kernel, DeliveryMechanism::Direct);
        assert_eq!(
            SignalClassifier::classify(&probe, Some(500)),
            Classification::Forward(ForwardReason::NotASignal)
        );

        // Origin is judged before the registry
        let kernel =
            SignalDeliveryEvent::new(1, TERM, 0, SignalOrigin::Kernel, DeliveryMechanism::Queued);
        assert_eq!(
            SignalClassifier::classify(&kernel, Some(500)),
            Classification::Forward(ForwardReason::KernelOrigin)
        );

        let special = SignalDeliveryEvent::new(
            500,
            TERM,
            0,
            SignalOrigin::Special,
            DeliveryMechanism::Queued,
        );
        assert_eq!(
            SignalClassifier::classify(&special, Some(500)),
            Classification::Forward(ForwardReason::SpecialInfo)
        );

        let other = SignalDeliveryEvent::queued(501, TERM, 999);
        assert_eq!(
            SignalClassifier::classify(&other, Some(500)),
            Classification::Forward(ForwardReason::NotProtected)
        );
        assert_eq!(
            SignalClassifier::classify(&SignalDeliveryEvent::queued(500, TERM, 999), None),
            Classification::Forward(ForwardReason::NotProtected)
        );
    }

    fn any_origin() -> impl Strategy<Value = SignalOrigin> {
        prop_oneof![
            Just(SignalOrigin::User),
            Just(SignalOrigin::Kernel),
            Just(SignalOrigin::Special),
        ]
    }

    fn any_mechanism() -> impl Strategy<Value = DeliveryMechanism> {
        prop_oneof![Just(DeliveryMechanism::Direct), Just(DeliveryMechanism::Queued)]
    }

    proptest! {
        #[test]
        fn prop_untracked_signals_never_intercepted(
            target in -5i32..1000,
            sig in -5i32..70,
            sender in -5i32..1000,
            protected in proptest::option::of(1i32..1000),
            origin in any_origin(),
            mechanism in any_mechanism(),
        ) {
            prop_assume!(!is_tracked_signal(sig));
            let event = SignalDeliveryEvent::new(target, sig, sender, origin, mechanism);
            prop_assert!(!SignalClassifier::classify(&event, protected).is_intercept());
        }

        #[test]
        fn prop_self_signals_pass(
            pid in 1i32..100_000,
            sig in 1i32..32,
            mechanism in any_mechanism(),
        ) {
            let event = SignalDeliveryEvent::new(pid, sig, pid, SignalOrigin::User, mechanism);
            prop_assert!(!SignalClassifier::classify(&event, Some(pid)).is_intercept());
        }

        #[test]
        fn prop_direct_channel_passes(
            target in 1i32..100_000,
            sig in 1i32..32,
            sender in 1i32..100_000,
            origin in any_origin(),
        ) {
            let event =
                SignalDeliveryEvent::new(target, sig, sender, origin, DeliveryMechanism::Direct);
            prop_assert!(!SignalClassifier::classify(&event, Some(target)).is_intercept());
        }

        #[test]
        fn prop_intercepts_exactly_the_qualifying_events(
            target in 1i32..100_000,
            sender in 1i32..100_000,
            sig in prop::sample::select(vec![2, 3, 6, 15]),
        ) {
            prop_assume!(sender != target);
            let event = SignalDeliveryEvent::queued(target, sig, sender);
            prop_assert!(SignalClassifier::classify(&event, Some(target)).is_intercept());
        }
    }
}

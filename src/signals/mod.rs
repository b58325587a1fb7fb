/*!
 * Signals Module
 * Signal vocabulary and delivery events seen by the hold engine
 */

pub mod event;
pub mod types;

pub use event::{DeliveryMechanism, SignalDeliveryEvent, SignalOrigin};
pub use types::{is_tracked_signal, Signal, TRACKED_SIGNALS};

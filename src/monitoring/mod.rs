/*!
 * Monitoring
 * Tracing setup for the hold engine and its binary
 */

mod tracer;

pub use tracer::{init_tracing, span_lifecycle};

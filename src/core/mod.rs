/*!
 * Core Module
 * Fundamental types, error handling and shared primitives
 */

pub mod errors;
pub mod rcu;
pub mod types;

// Re-export for convenience
pub use errors::*;
pub use rcu::RcuCell;
pub use types::*;

//! User-level posting actions.
//!
//! One action is an ordered sequence of resolve-then-interact steps over a
//! [`dom_bridge::DomBridge`]. Every resolution failure is accumulated by
//! name so the orchestrator can hand the list to the healing pipeline; the
//! executor itself never improvises fallback behavior beyond what the
//! selector definitions describe.

pub mod executor;
pub mod types;

pub use executor::*;
pub use types::*;

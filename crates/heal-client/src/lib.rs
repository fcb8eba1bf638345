//! Client half of the healing protocol.
//!
//! Speaks the service's JSON surface over HTTP and captures the bounded
//! structural snapshot that heal and validate requests carry.

pub mod api;
pub mod snapshot;

pub use api::*;
pub use snapshot::*;

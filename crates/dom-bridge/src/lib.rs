//! Document interaction seam for PostPilot.
//!
//! The resolver and executor never touch a browser directly; they speak to
//! a [`DomBridge`]. Production deployments supply an adapter over a real
//! page, tests and offline runs use the scriptable [`StubPage`].

pub mod bridge;
pub mod errors;
pub mod stub;

pub use bridge::*;
pub use errors::*;
pub use stub::*;

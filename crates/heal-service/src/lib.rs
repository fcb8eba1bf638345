//! Selector management and self-healing API surface.
//!
//! Serves the versioned selector store over the JSON surface the client
//! half speaks: fetch, drift validation, healing, administrative update.
//! Healing proposes replacement definitions through a generative step when
//! one is configured, falling back to a deterministic table of well-known
//! names otherwise.

pub mod proposer;
pub mod router;
pub mod state;

pub use proposer::*;
pub use router::*;
pub use state::*;

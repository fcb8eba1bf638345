//! Multi-strategy element resolution.
//!
//! A selector definition names a primary strategy and an ordered fallback
//! chain. The resolver polls the live document through a [`dom_bridge::DomBridge`],
//! trying the primary first and each fallback in order every cycle, until
//! an attached element appears or the timeout elapses. "Not found" is a
//! modeled outcome, never an error path.

pub mod resolver;
pub mod types;

pub use resolver::*;
pub use types::*;

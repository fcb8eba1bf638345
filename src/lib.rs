//! PostPilot library surface.
//!
//! The orchestrator here is the entry point the initiating layer (popup,
//! CLI, embedding process) calls with a structured action payload; the
//! crates under `crates/` supply the resolver, executor, store and the
//! healing protocol halves it drives.

pub mod config;
pub mod orchestrator;
pub mod seed;

pub use config::{load_config, Config};
pub use orchestrator::{Orchestrator, OrchestratorConfig, RunReport};
pub use seed::default_selector_set;

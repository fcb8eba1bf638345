use std::sync::Arc;

use selector_store::SelectorStore;

use crate::proposer::{SelectorProposer, StaticTableProposer};

/// Shared state behind the service router.
#[derive(Clone)]
pub struct ServiceState {
    pub store: Arc<dyn SelectorStore>,
    /// Generative step; `None` means fallback-table only.
    pub generative: Option<Arc<dyn SelectorProposer>>,
    pub fallback: StaticTableProposer,
    pub api_version: String,
    pub environment: String,
}

impl ServiceState {
    pub fn new(store: Arc<dyn SelectorStore>) -> Self {
        Self {
            store,
            generative: None,
            fallback: StaticTableProposer,
            api_version: "1.0.0".to_string(),
            environment: "development".to_string(),
        }
    }

    pub fn with_generative(mut self, proposer: Arc<dyn SelectorProposer>) -> Self {
        self.generative = Some(proposer);
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }
}

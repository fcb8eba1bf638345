//! In-process owner of the active selector set.
//!
//! One registry exists per automation run, owned by the orchestrator; it is
//! the only writable copy of the set while the run is in flight. The store
//! remains the durable owner across runs. Single-writer by contract:
//! concurrent automation attempts sharing one registry are undefined and
//! must be serialized by the integrating system.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use postpilot_core_types::{SelectorDef, SelectorSet, Version};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, Clone)]
pub enum RegistryError {
    /// No selector set has been installed yet
    #[error("selector registry not initialized")]
    NotInitialized,
}

#[derive(Clone, Debug, Default)]
pub struct RegistryStats {
    pub categories: usize,
    pub selectors: usize,
    pub heals_applied: usize,
}

/// Registry guarding the active [`SelectorSet`].
#[derive(Default)]
pub struct SelectorRegistry {
    inner: RwLock<Option<SelectorSet>>,
    heals_applied: RwLock<usize>,
}

impl SelectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_set(set: SelectorSet) -> Self {
        Self {
            inner: RwLock::new(Some(set)),
            heals_applied: RwLock::new(0),
        }
    }

    /// Install (or replace) the active set, e.g. after the initial fetch.
    pub fn install(&self, set: SelectorSet) {
        info!(version = %set.version, "selector set installed");
        *self.inner.write() = Some(set);
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.read().is_some()
    }

    pub fn version(&self) -> Option<Version> {
        self.inner.read().as_ref().map(|s| s.version)
    }

    /// Clone of the whole active set (heal context, drift checks).
    pub fn current(&self) -> Option<SelectorSet> {
        self.inner.read().clone()
    }

    pub fn get(&self, category: &str, name: &str) -> Option<SelectorDef> {
        self.inner
            .read()
            .as_ref()
            .and_then(|s| s.get(category, name).cloned())
    }

    /// Flat lookup by bare element name across categories.
    pub fn find(&self, name: &str) -> Option<SelectorDef> {
        self.inner.read().as_ref().and_then(|s| s.find(name).cloned())
    }

    /// Apply a heal result to the in-memory set: per-name merge of the
    /// replacement definitions, version moved to the service's new version.
    ///
    /// This mirrors what the service persisted; if the durable write failed
    /// service-side the merge still applies for the current attempt and the
    /// next run simply starts from the old version again.
    pub fn apply_heal(
        &self,
        healed: &BTreeMap<String, SelectorDef>,
        new_version: Version,
        at: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        let mut guard = self.inner.write();
        let set = guard.as_ref().ok_or(RegistryError::NotInitialized)?;
        let mut next = set.healed(healed, at);
        // The service owns version assignment; trust its number over the
        // locally computed bump.
        next.version = new_version;
        info!(
            version = %next.version,
            healed = healed.len(),
            "heal applied to registry"
        );
        *guard = Some(next);
        *self.heals_applied.write() += 1;
        Ok(())
    }

    pub fn stats(&self) -> RegistryStats {
        let guard = self.inner.read();
        let (categories, selectors) = guard
            .as_ref()
            .map(|s| {
                (
                    s.selectors.len(),
                    s.selectors.values().map(|c| c.len()).sum(),
                )
            })
            .unwrap_or((0, 0));
        RegistryStats {
            categories,
            selectors,
            heals_applied: *self.heals_applied.read(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postpilot_core_types::SelectorMap;

    fn seed_set() -> SelectorSet {
        let mut selectors = SelectorMap::new();
        selectors.entry("composer".to_string()).or_default().insert(
            "textArea".to_string(),
            SelectorDef::new("[data-testid=\"tweetTextarea_0\"]"),
        );
        selectors.entry("composer".to_string()).or_default().insert(
            "postButton".to_string(),
            SelectorDef::new("#btn-old").with_fallback("#btn-fallback"),
        );
        SelectorSet::new(Version::new(1, 0, 0)).with_selectors(selectors)
    }

    #[test]
    fn lookup_by_category_and_flat_name() {
        let registry = SelectorRegistry::with_set(seed_set());
        assert!(registry.get("composer", "textArea").is_some());
        assert!(registry.get("media", "textArea").is_none());
        assert!(registry.find("postButton").is_some());
        assert!(registry.find("ghost").is_none());
    }

    #[test]
    fn apply_heal_requires_initialization() {
        let registry = SelectorRegistry::new();
        let healed = BTreeMap::new();
        let err = registry
            .apply_heal(&healed, Version::new(1, 0, 1), Utc::now())
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotInitialized));
    }

    #[test]
    fn apply_heal_replaces_named_entries_and_moves_version() {
        let registry = SelectorRegistry::with_set(seed_set());

        let mut healed = BTreeMap::new();
        healed.insert(
            "postButton".to_string(),
            SelectorDef::new("[data-testid=\"tweetButton\"]"),
        );
        registry
            .apply_heal(&healed, Version::new(1, 0, 1), Utc::now())
            .unwrap();

        assert_eq!(registry.version(), Some(Version::new(1, 0, 1)));
        assert_eq!(
            registry.get("composer", "postButton").unwrap().primary,
            "[data-testid=\"tweetButton\"]"
        );
        // Untouched entries preserved.
        assert!(registry.get("composer", "textArea").is_some());
        assert_eq!(registry.stats().heals_applied, 1);
    }
}

//! In-memory store backend

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use postpilot_core_types::{SelectorSet, Version};

use crate::api::{SelectorStore, StoreStatus};
use crate::errors::{StoreError, StoreResult};

/// Process-local store; the default backend for the service and for tests.
#[derive(Default)]
pub struct MemoryStore {
    current: RwLock<Option<SelectorSet>>,
    versions: DashMap<Version, SelectorSet>,
    fingerprint: RwLock<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed current + versioned entry in one step (test fixtures, CLI init).
    pub fn seeded(set: SelectorSet) -> Self {
        let store = Self::new();
        store.versions.insert(set.version, set.clone());
        *store.current.write() = Some(set);
        store
    }
}

#[async_trait]
impl SelectorStore for MemoryStore {
    async fn get_current(&self) -> StoreResult<Option<SelectorSet>> {
        Ok(self.current.read().clone())
    }

    async fn put_current(&self, set: &SelectorSet) -> StoreResult<()> {
        *self.current.write() = Some(set.clone());
        Ok(())
    }

    async fn put_version(&self, set: &SelectorSet) -> StoreResult<()> {
        if self.versions.contains_key(&set.version) {
            return Err(StoreError::VersionExists(set.version.to_string()));
        }
        self.versions.insert(set.version, set.clone());
        Ok(())
    }

    async fn get_version(&self, version: &Version) -> StoreResult<SelectorSet> {
        self.versions
            .get(version)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::VersionMissing(version.to_string()))
    }

    async fn list_versions(&self) -> StoreResult<Vec<Version>> {
        let mut versions: Vec<Version> = self.versions.iter().map(|e| *e.key()).collect();
        versions.sort();
        Ok(versions)
    }

    async fn get_fingerprint(&self) -> StoreResult<Option<String>> {
        Ok(self.fingerprint.read().clone())
    }

    async fn put_fingerprint(&self, hash: &str) -> StoreResult<()> {
        *self.fingerprint.write() = Some(hash.to_string());
        Ok(())
    }

    async fn status(&self) -> StoreStatus {
        StoreStatus {
            connected: true,
            current_version: self.current.read().as_ref().map(|s| s.version),
            versions_retained: self.versions.len(),
        }
    }
}

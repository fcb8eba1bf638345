use async_trait::async_trait;
use postpilot_core_types::{SelectorSet, Version};
use serde::Serialize;

use crate::errors::StoreResult;

/// Store health, reported through the service's health endpoint.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
    pub connected: bool,
    pub current_version: Option<Version>,
    pub versions_retained: usize,
}

/// Versioned key-value store for selector sets.
///
/// Two invariants:
/// - a versioned entry, once written, is immutable; only the current
///   pointer moves;
/// - "write versioned copy" + "write current" are NOT atomic across keys.
///   [`SelectorStore::publish`] writes the versioned copy first, so a crash
///   between the two leaves history consistent and the current pointer
///   stale — recoverable by re-issuing the update. Callers must not assume
///   atomicity across the two keys.
#[async_trait]
pub trait SelectorStore: Send + Sync {
    async fn get_current(&self) -> StoreResult<Option<SelectorSet>>;
    async fn put_current(&self, set: &SelectorSet) -> StoreResult<()>;

    /// Write the set under its own version key. Errors with
    /// [`crate::StoreError::VersionExists`] if that version was already
    /// published.
    async fn put_version(&self, set: &SelectorSet) -> StoreResult<()>;
    async fn get_version(&self, version: &Version) -> StoreResult<SelectorSet>;
    async fn list_versions(&self) -> StoreResult<Vec<Version>>;

    async fn get_fingerprint(&self) -> StoreResult<Option<String>>;
    async fn put_fingerprint(&self, hash: &str) -> StoreResult<()>;

    async fn status(&self) -> StoreStatus;

    /// Versioned copy first, then the current pointer (see trait docs).
    async fn publish(&self, set: &SelectorSet) -> StoreResult<()> {
        self.put_version(set).await?;
        self.put_current(set).await
    }
}

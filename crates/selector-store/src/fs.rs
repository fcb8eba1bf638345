//! Filesystem store backend
//!
//! Layout under the root directory:
//!   current.json            - the movable current pointer
//!   versions/v{X.Y.Z}.json  - one immutable file per published version
//!   fingerprint             - the structural drift baseline hash

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use postpilot_core_types::{SelectorSet, Version};
use tokio::fs;
use tracing::debug;

use crate::api::{SelectorStore, StoreStatus};
use crate::errors::{StoreError, StoreResult};

pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn current_path(&self) -> PathBuf {
        self.root.join("current.json")
    }

    fn fingerprint_path(&self) -> PathBuf {
        self.root.join("fingerprint")
    }

    fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    fn version_path(&self, version: &Version) -> PathBuf {
        self.versions_dir().join(format!("v{}.json", version))
    }

    async fn read_set(path: &Path) -> StoreResult<Option<SelectorSet>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_json(&self, path: &Path, set: &SelectorSet) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(set)?;
        fs::write(path, bytes).await?;
        debug!(path = %path.display(), "selector set written");
        Ok(())
    }
}

#[async_trait]
impl SelectorStore for FsStore {
    async fn get_current(&self) -> StoreResult<Option<SelectorSet>> {
        Self::read_set(&self.current_path()).await
    }

    async fn put_current(&self, set: &SelectorSet) -> StoreResult<()> {
        self.write_json(&self.current_path(), set).await
    }

    async fn put_version(&self, set: &SelectorSet) -> StoreResult<()> {
        let path = self.version_path(&set.version);
        if fs::try_exists(&path).await? {
            return Err(StoreError::VersionExists(set.version.to_string()));
        }
        self.write_json(&path, set).await
    }

    async fn get_version(&self, version: &Version) -> StoreResult<SelectorSet> {
        Self::read_set(&self.version_path(version))
            .await?
            .ok_or_else(|| StoreError::VersionMissing(version.to_string()))
    }

    async fn list_versions(&self) -> StoreResult<Vec<Version>> {
        let dir = self.versions_dir();
        let mut versions = Vec::new();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(versions),
            Err(err) => return Err(err.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(stem) = name.strip_prefix('v').and_then(|n| n.strip_suffix(".json")) {
                if let Ok(version) = stem.parse::<Version>() {
                    versions.push(version);
                }
            }
        }
        versions.sort();
        Ok(versions)
    }

    async fn get_fingerprint(&self) -> StoreResult<Option<String>> {
        match fs::read_to_string(self.fingerprint_path()).await {
            Ok(hash) => Ok(Some(hash.trim().to_string())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn put_fingerprint(&self, hash: &str) -> StoreResult<()> {
        fs::create_dir_all(&self.root).await?;
        fs::write(self.fingerprint_path(), hash).await?;
        Ok(())
    }

    async fn status(&self) -> StoreStatus {
        let current_version = Self::read_set(&self.current_path())
            .await
            .ok()
            .flatten()
            .map(|s| s.version);
        let versions_retained = self.list_versions().await.map(|v| v.len()).unwrap_or(0);
        StoreStatus {
            connected: true,
            current_version,
            versions_retained,
        }
    }
}

#[cfg(test)]
mod tests {
    use postpilot_core_types::{SelectorDef, SelectorMap};

    use super::*;

    fn set_at(version: Version) -> SelectorSet {
        let mut selectors = SelectorMap::new();
        selectors
            .entry("composer".to_string())
            .or_default()
            .insert("postButton".to_string(), SelectorDef::new("#btn"));
        SelectorSet::new(version).with_selectors(selectors)
    }

    #[tokio::test]
    async fn publish_writes_both_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let set = set_at(Version::new(1, 0, 0));

        store.publish(&set).await.unwrap();

        assert_eq!(store.get_current().await.unwrap().unwrap(), set);
        assert_eq!(store.get_version(&set.version).await.unwrap(), set);
        assert_eq!(store.list_versions().await.unwrap(), vec![set.version]);
    }

    #[tokio::test]
    async fn version_files_are_immutable() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let set = set_at(Version::new(2, 1, 0));

        store.put_version(&set).await.unwrap();
        let err = store.put_version(&set).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionExists(_)));
    }

    #[tokio::test]
    async fn fingerprint_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FsStore::new(dir.path());
            store.put_fingerprint("dom_feed").await.unwrap();
        }
        let store = FsStore::new(dir.path());
        assert_eq!(store.get_fingerprint().await.unwrap().unwrap(), "dom_feed");
    }

    #[tokio::test]
    async fn uninitialized_store_reports_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        assert!(store.get_current().await.unwrap().is_none());
        assert!(store.list_versions().await.unwrap().is_empty());
        let status = store.status().await;
        assert!(status.connected);
        assert!(status.current_version.is_none());
    }
}

//! Typed HTTP client for the healing service

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use postpilot_core_types::{SelectorDef, SelectorMap, SelectorSet, Version};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure; no repair occurred
    #[error("healing service unreachable: {0}")]
    Unavailable(String),

    /// Response did not match the protocol shape
    #[error("malformed service response: {0}")]
    Malformed(String),

    /// The service answered with success=false
    #[error("service error: {0}")]
    Service(String),

    /// The remote store has never been seeded
    #[error("selector store not initialized on the service")]
    NeedsInit,
}

/// Full selector set as served by `selectors/get`.
#[derive(Clone, Debug)]
pub struct SelectorsPayload {
    pub version: Version,
    pub updated_at: Option<DateTime<Utc>>,
    pub selectors: SelectorMap,
}

impl SelectorsPayload {
    /// Materialize a registry-installable set.
    pub fn into_set(self) -> SelectorSet {
        let mut set = SelectorSet::new(self.version).with_selectors(self.selectors);
        if let Some(updated_at) = self.updated_at {
            set.updated_at = updated_at;
        }
        set
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KvStatus {
    pub connected: bool,
    pub current_version: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct HealthInfo {
    pub success: bool,
    pub status: String,
    pub version: String,
    pub kv: KvStatus,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateReport {
    pub success: bool,
    pub is_valid: bool,
    #[serde(rename = "hasDOMChange")]
    pub has_dom_change: bool,
    pub has_failed_selectors: bool,
    pub needs_healing: bool,
    #[serde(default)]
    pub current_version: Option<Version>,
}

/// Successful heal: the service's new version plus the replacement
/// definitions, possibly covering only part of the failed names.
#[derive(Clone, Debug)]
pub struct HealResult {
    pub version: Version,
    pub new_selectors: BTreeMap<String, SelectorDef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetEnvelope {
    success: bool,
    #[serde(default)]
    needs_init: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    version: Option<Version>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    selectors: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HealEnvelope {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    version: Option<Version>,
    #[serde(default)]
    new_selectors: Option<BTreeMap<String, SelectorDef>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateEnvelope {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    version: Option<Version>,
}

/// Client over the service's `/api` surface.
#[derive(Clone)]
pub struct HealClient {
    base_url: String,
    http: reqwest::Client,
}

impl HealClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthInfo, ClientError> {
        let url = format!("{}/api/health", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| ClientError::Unavailable(err.to_string()))?;
        response
            .json::<HealthInfo>()
            .await
            .map_err(|err| ClientError::Malformed(err.to_string()))
    }

    /// Fetch the full current selector set.
    pub async fn fetch_set(&self) -> Result<SelectorsPayload, ClientError> {
        let envelope: GetEnvelope = self.post("selectors/get", json!({})).await?;
        if !envelope.success {
            if envelope.needs_init {
                return Err(ClientError::NeedsInit);
            }
            return Err(ClientError::Service(
                envelope.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        let version = envelope
            .version
            .ok_or_else(|| ClientError::Malformed("missing version".to_string()))?;
        let selectors = envelope
            .selectors
            .ok_or_else(|| ClientError::Malformed("missing selectors".to_string()))?;
        let selectors: SelectorMap = serde_json::from_value(selectors)
            .map_err(|err| ClientError::Malformed(err.to_string()))?;
        debug!(version = %version, "selector set fetched");
        Ok(SelectorsPayload {
            version,
            updated_at: envelope.updated_at,
            selectors,
        })
    }

    /// Fetch only one category of the set.
    pub async fn fetch_category(
        &self,
        action: &str,
    ) -> Result<BTreeMap<String, SelectorDef>, ClientError> {
        let envelope: GetEnvelope = self.post("selectors/get", json!({ "action": action })).await?;
        if !envelope.success {
            if envelope.needs_init {
                return Err(ClientError::NeedsInit);
            }
            return Err(ClientError::Service(
                envelope.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        let selectors = envelope
            .selectors
            .ok_or_else(|| ClientError::Malformed("missing selectors".to_string()))?;
        serde_json::from_value(selectors).map_err(|err| ClientError::Malformed(err.to_string()))
    }

    pub async fn validate(
        &self,
        snapshot: &str,
        version: Option<Version>,
        failed_selectors: &[String],
    ) -> Result<ValidateReport, ClientError> {
        self.post(
            "selectors/validate",
            json!({
                "currentDOM": snapshot,
                "version": version,
                "failedSelectors": failed_selectors,
            }),
        )
        .await
    }

    /// Request replacement definitions for the failed names.
    pub async fn heal(
        &self,
        snapshot: &str,
        failed_selectors: &[String],
    ) -> Result<HealResult, ClientError> {
        info!(failed = failed_selectors.len(), "requesting heal");
        let envelope: HealEnvelope = self
            .post(
                "selectors/heal",
                json!({
                    "currentDOM": snapshot,
                    "failedSelectors": failed_selectors,
                }),
            )
            .await?;
        if !envelope.success {
            return Err(ClientError::Service(
                envelope.error.unwrap_or_else(|| "healing failed".to_string()),
            ));
        }
        let version = envelope
            .version
            .ok_or_else(|| ClientError::Malformed("missing version".to_string()))?;
        let new_selectors = envelope
            .new_selectors
            .ok_or_else(|| ClientError::Malformed("missing newSelectors".to_string()))?;
        info!(version = %version, healed = new_selectors.len(), "heal received");
        Ok(HealResult {
            version,
            new_selectors,
        })
    }

    /// Administrative override, bypassing healing. Also the seeding path.
    pub async fn update(
        &self,
        selectors: &SelectorMap,
        version: Version,
        dom_snapshot: Option<&str>,
    ) -> Result<Version, ClientError> {
        let envelope: UpdateEnvelope = self
            .post(
                "selectors/update",
                json!({
                    "selectors": selectors,
                    "version": version,
                    "domSnapshot": dom_snapshot,
                }),
            )
            .await?;
        if !envelope.success {
            return Err(ClientError::Service(
                envelope.error.unwrap_or_else(|| "update failed".to_string()),
            ));
        }
        envelope
            .version
            .ok_or_else(|| ClientError::Malformed("missing version".to_string()))
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ClientError> {
        let url = format!("{}/api/{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| ClientError::Unavailable(err.to_string()))?;
        response
            .json::<T>()
            .await
            .map_err(|err| ClientError::Malformed(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = HealClient::new("http://localhost:8787/");
        assert_eq!(client.base_url(), "http://localhost:8787");
    }

    #[test]
    fn payload_materializes_a_set() {
        let mut selectors = SelectorMap::new();
        selectors
            .entry("composer".to_string())
            .or_default()
            .insert("textArea".to_string(), SelectorDef::new("#ta"));
        let payload = SelectorsPayload {
            version: Version::new(1, 0, 0),
            updated_at: None,
            selectors,
        };
        let set = payload.into_set();
        assert_eq!(set.version, Version::new(1, 0, 0));
        assert!(set.get("composer", "textArea").is_some());
        assert!(set.healing_history.is_empty());
    }
}

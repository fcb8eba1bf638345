//! End-to-end run control: run action, heal once, retry once.
//!
//! The orchestrator owns the registry for the lifetime of a run and is the
//! single point deciding retry versus terminal failure. The heal protocol
//! is a straight line: RUN_ACTION, CAPTURE_SNAPSHOT, REQUEST_HEAL, merge,
//! RETRY_ACTION, done. A second round of failed selectors after the retry
//! is terminal — one retry bounds the cost of a healing service that may
//! itself be wrong.

use std::sync::Arc;

use action_executor::{ActionExecutor, ActionOutcome, ActionRequest, ExecutorConfig, Submission};
use chrono::Utc;
use dom_bridge::DomBridge;
use heal_client::{capture_snapshot, ClientError, HealClient, SnapshotError, ValidateReport};
use postpilot_core_types::{RunId, Version};
use selector_registry::SelectorRegistry;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DriftError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Snapshot knobs for the healing path.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    pub snapshot_region: String,
    pub snapshot_budget: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            snapshot_region: heal_client::DEFAULT_SNAPSHOT_REGION.to_string(),
            snapshot_budget: heal_client::DEFAULT_SNAPSHOT_BUDGET,
        }
    }
}

/// Final outcome handed back to the initiating layer.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: RunId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission: Option<Submission>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Names still unresolved when the run ended; what the operator needs
    /// to know could not be found even after healing.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_selectors: Vec<String>,
    /// Names the heal actually replaced, when a heal happened.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub healed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
}

impl RunReport {
    fn from_outcome(
        run_id: RunId,
        outcome: ActionOutcome,
        healed: Vec<String>,
        version: Option<Version>,
    ) -> Self {
        Self {
            run_id,
            success: outcome.success,
            submission: outcome.submission,
            error: outcome.error,
            failed_selectors: outcome.failed_selectors,
            healed,
            version,
        }
    }

    fn failure(
        run_id: RunId,
        error: impl Into<String>,
        failed_selectors: Vec<String>,
        version: Option<Version>,
    ) -> Self {
        Self {
            run_id,
            success: false,
            submission: None,
            error: Some(error.into()),
            failed_selectors,
            healed: Vec::new(),
            version,
        }
    }
}

pub struct Orchestrator {
    bridge: Arc<dyn DomBridge>,
    registry: SelectorRegistry,
    executor: ActionExecutor,
    client: HealClient,
    cfg: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        bridge: Arc<dyn DomBridge>,
        client: HealClient,
        executor_cfg: ExecutorConfig,
        cfg: OrchestratorConfig,
    ) -> Self {
        let executor = ActionExecutor::new(bridge.clone(), executor_cfg);
        Self {
            bridge,
            registry: SelectorRegistry::new(),
            executor,
            client,
            cfg,
        }
    }

    pub fn registry(&self) -> &SelectorRegistry {
        &self.registry
    }

    /// Run one action: at most two executor attempts, with exactly one heal
    /// between them when the first attempt failed on resolution.
    pub async fn run(&self, request: &ActionRequest) -> RunReport {
        let run_id = RunId::new();
        info!(run_id = %run_id, kind = request.kind(), "run started");

        if let Err(message) = self.ensure_registry().await {
            return RunReport::failure(run_id, message, Vec::new(), self.registry.version());
        }

        let first = self.executor.execute(&self.registry, request).await;
        if first.success {
            return RunReport::from_outcome(run_id, first, Vec::new(), self.registry.version());
        }
        if !first.is_resolution_failure() {
            // Not a locator problem; healing cannot help.
            return RunReport::from_outcome(run_id, first, Vec::new(), self.registry.version());
        }

        let failed = first.failed_selectors.clone();
        let first_error = first
            .error
            .clone()
            .unwrap_or_else(|| "resolution failed".to_string());
        warn!(failed = ?failed, "resolution failures, entering healing");

        let snapshot = match capture_snapshot(
            &self.bridge,
            &self.cfg.snapshot_region,
            self.cfg.snapshot_budget,
        )
        .await
        {
            Ok(snapshot) => snapshot,
            Err(err) => {
                return RunReport::failure(
                    run_id,
                    format!("{} (snapshot capture failed: {})", first_error, err),
                    failed,
                    self.registry.version(),
                )
            }
        };

        let heal = match self.client.heal(&snapshot, &failed).await {
            Ok(heal) => heal,
            Err(err) => {
                // No repair occurred; surface the original failed names.
                return RunReport::failure(
                    run_id,
                    format!("{} (healing failed: {})", first_error, err),
                    failed,
                    self.registry.version(),
                );
            }
        };

        let healed: Vec<String> = heal.new_selectors.keys().cloned().collect();
        if let Err(err) = self
            .registry
            .apply_heal(&heal.new_selectors, heal.version, Utc::now())
        {
            return RunReport::failure(run_id, err.to_string(), failed, self.registry.version());
        }

        info!(version = %heal.version, healed = healed.len(), "retrying action after heal");
        let second = self.executor.execute(&self.registry, request).await;
        // Terminal either way: the orchestrator never runs a third attempt.
        RunReport::from_outcome(run_id, second, healed, Some(heal.version))
    }

    /// Proactive drift check: fingerprint the live page against the stored
    /// baseline, independent of any locator failure. Reported, not acted on.
    pub async fn check_drift(&self) -> Result<ValidateReport, DriftError> {
        let snapshot = capture_snapshot(
            &self.bridge,
            &self.cfg.snapshot_region,
            self.cfg.snapshot_budget,
        )
        .await?;
        let report = self
            .client
            .validate(&snapshot, self.registry.version(), &[])
            .await?;
        if report.has_dom_change {
            warn!("structure changed since last known-good baseline");
        }
        Ok(report)
    }

    async fn ensure_registry(&self) -> Result<(), String> {
        if self.registry.is_initialized() {
            return Ok(());
        }
        match self.client.fetch_set().await {
            Ok(payload) => {
                self.registry.install(payload.into_set());
                Ok(())
            }
            Err(err) => Err(format!("selector set unavailable: {}", err)),
        }
    }
}

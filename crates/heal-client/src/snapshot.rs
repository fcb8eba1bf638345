//! Bounded structural snapshot capture.
//!
//! The snapshot feeds the remote analysis step, so it is taken from the
//! most content-relevant region first and truncated to a character budget.
//! The budget is a tunable precision/completeness trade-off: too small and
//! the subtree holding the failed element may be cut off.

use std::sync::Arc;

use dom_bridge::DomBridge;
use postpilot_core_types::truncate_chars;
use thiserror::Error;
use tracing::debug;

/// Region captured before falling back to the whole body.
pub const DEFAULT_SNAPSHOT_REGION: &str = "[data-testid=\"primaryColumn\"]";

/// Default snapshot character budget.
pub const DEFAULT_SNAPSHOT_BUDGET: usize = 10_000;

#[derive(Debug, Error, Clone)]
pub enum SnapshotError {
    /// Neither the region nor the body produced any markup
    #[error("nothing to capture: page produced no markup")]
    Empty,
}

/// Capture the region's markup (falling back to the body), truncated to
/// `budget` characters.
pub async fn capture_snapshot(
    bridge: &Arc<dyn DomBridge>,
    region: &str,
    budget: usize,
) -> Result<String, SnapshotError> {
    let markup = match bridge.capture_region(region).await {
        Some(markup) if !markup.is_empty() => markup,
        _ => bridge.capture_body().await,
    };
    if markup.is_empty() {
        return Err(SnapshotError::Empty);
    }
    let truncated = truncate_chars(&markup, budget);
    debug!(
        captured = markup.chars().count(),
        kept = truncated.chars().count(),
        "snapshot captured"
    );
    Ok(truncated.to_string())
}

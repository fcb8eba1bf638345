//! Action payloads and outcomes

use std::time::Duration;

use dom_bridge::MediaFile;
use serde::{Deserialize, Serialize};

/// Reply-audience choice for a post.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Everyone,
    Following,
    Verified,
    Mentioned,
}

impl Audience {
    /// Visible label of the audience menu item.
    pub fn label(&self) -> &'static str {
        match self {
            Audience::Everyone => "Everyone",
            Audience::Following => "Accounts you follow",
            Audience::Verified => "Verified accounts",
            Audience::Mentioned => "Only accounts you mention",
        }
    }
}

/// Poll duration, mapped onto the three duration selects.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PollLength {
    #[serde(default = "default_poll_days")]
    pub days: u32,
    #[serde(default)]
    pub hours: u32,
    #[serde(default)]
    pub minutes: u32,
}

fn default_poll_days() -> u32 {
    1
}

impl Default for PollLength {
    fn default() -> Self {
        Self {
            days: 1,
            hours: 0,
            minutes: 0,
        }
    }
}

/// Structured action payload handed in by the initiating layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ActionRequest {
    /// Single post, optionally with audience restriction and media.
    Post {
        text: String,
        #[serde(default)]
        audience: Option<Audience>,
        #[serde(default)]
        media: Vec<MediaFile>,
    },

    /// Multi-part post; entry N lands in the N-th enumerated text area.
    ThreadPost {
        entries: Vec<String>,
        #[serde(default)]
        audience: Option<Audience>,
        #[serde(default)]
        media: Vec<MediaFile>,
    },

    /// Post carrying a poll with 2-4 options.
    PollPost {
        text: String,
        options: Vec<String>,
        #[serde(default)]
        length: Option<PollLength>,
        #[serde(default)]
        audience: Option<Audience>,
    },
}

impl ActionRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            ActionRequest::Post { .. } => "post",
            ActionRequest::ThreadPost { .. } => "threadPost",
            ActionRequest::PollPost { .. } => "pollPost",
        }
    }
}

/// Whether the submission was positively observed.
///
/// `Unconfirmed` means the completion window elapsed without a signal; in
/// this environment that does not reliably imply the post failed, so it is
/// reported as success-with-warning, kept distinct from `Confirmed`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Submission {
    Confirmed,
    Unconfirmed,
}

/// Result of one action attempt.
///
/// `failed_selectors` is non-empty exactly when the failure originated from
/// element resolution; that list is what the healing pipeline consumes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission: Option<Submission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_selectors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted: Option<usize>,
}

impl ActionOutcome {
    pub fn submitted(submission: Submission, posted: Option<usize>) -> Self {
        Self {
            success: true,
            submission: Some(submission),
            error: None,
            failed_selectors: Vec::new(),
            posted,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            submission: None,
            error: Some(error.into()),
            failed_selectors: Vec::new(),
            posted: None,
        }
    }

    pub fn failed_resolution(error: impl Into<String>, failed_selectors: Vec<String>) -> Self {
        Self {
            success: false,
            submission: None,
            error: Some(error.into()),
            failed_selectors,
            posted: None,
        }
    }

    /// Whether the failure is heal-eligible.
    pub fn is_resolution_failure(&self) -> bool {
        !self.success && !self.failed_selectors.is_empty()
    }
}

/// Executor timing knobs.
#[derive(Clone, Copy, Debug)]
pub struct ExecutorConfig {
    /// Window for each required resolution.
    pub resolve_timeout: Duration,
    /// Window for optional lookups (audience menu, thread add button).
    pub soft_resolve_timeout: Duration,
    /// Pause between resolver poll cycles.
    pub poll_interval: Duration,
    /// Window for the submit control to become enabled.
    pub enable_timeout: Duration,
    /// Window for the post-submission completion signals.
    pub completion_timeout: Duration,
    /// Pause between completion poll cycles.
    pub completion_poll: Duration,
    /// Window for the media preview to appear after attaching files.
    pub preview_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            resolve_timeout: Duration::from_millis(5_000),
            soft_resolve_timeout: Duration::from_millis(1_000),
            poll_interval: Duration::from_millis(100),
            enable_timeout: Duration::from_millis(5_000),
            completion_timeout: Duration::from_millis(10_000),
            completion_poll: Duration::from_millis(200),
            preview_timeout: Duration::from_millis(10_000),
        }
    }
}

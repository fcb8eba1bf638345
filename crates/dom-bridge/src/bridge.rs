use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::BridgeError;

/// Where a selector is evaluated.
///
/// `Dialog` restricts the search to the open modal region so that stale
/// duplicates elsewhere in the document cannot shadow the live element.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SearchScope {
    Document,
    Dialog,
}

/// Opaque reference to a live element on the page.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ElementHandle(pub u64);

/// File attachment delivered to a file input.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MediaFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// The "perform one DOM interaction" collaborator interface.
///
/// Selector strings are opaque to the pipeline; evaluating them against the
/// live document tree is entirely the bridge's business.
#[async_trait]
pub trait DomBridge: Send + Sync {
    /// First element matching `selector` within `scope`, if any.
    async fn query(&self, selector: &str, scope: SearchScope) -> Option<ElementHandle>;

    /// Whether a modal dialog region is currently open.
    async fn dialog_open(&self) -> bool;

    async fn is_attached(&self, handle: &ElementHandle) -> bool;
    async fn is_enabled(&self, handle: &ElementHandle) -> bool;
    async fn text_content(&self, handle: &ElementHandle) -> Option<String>;

    async fn click(&self, handle: &ElementHandle) -> Result<(), BridgeError>;
    async fn focus(&self, handle: &ElementHandle) -> Result<(), BridgeError>;
    async fn set_text(&self, handle: &ElementHandle, text: &str) -> Result<(), BridgeError>;
    async fn set_files(
        &self,
        handle: &ElementHandle,
        files: &[MediaFile],
    ) -> Result<(), BridgeError>;
    async fn select_value(&self, handle: &ElementHandle, value: &str) -> Result<(), BridgeError>;

    /// Markup of the first element matching `selector`, for snapshot capture.
    async fn capture_region(&self, selector: &str) -> Option<String>;

    /// Markup of the whole document body.
    async fn capture_body(&self) -> String;
}

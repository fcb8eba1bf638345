use thiserror::Error;

/// Bridge error enumeration
#[derive(Debug, Error, Clone)]
pub enum BridgeError {
    /// Handle no longer points at an attached element
    #[error("Element detached: {0}")]
    Detached(String),

    /// Interaction not supported by this element
    #[error("Unsupported interaction: {0}")]
    Unsupported(String),

    /// Transport failure talking to the page
    #[error("Bridge I/O error: {0}")]
    Io(String),
}

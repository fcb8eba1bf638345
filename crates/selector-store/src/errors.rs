use thiserror::Error;

/// Store error enumeration
#[derive(Debug, Error)]
pub enum StoreError {
    /// No current selector set has ever been written
    #[error("selector store not initialized")]
    NotInitialized,

    /// Versioned entries are immutable once written
    #[error("version {0} already exists")]
    VersionExists(String),

    /// Requested version key is absent
    #[error("version {0} not found")]
    VersionMissing(String),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

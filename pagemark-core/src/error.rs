//! Error types for Pagemark Core

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using PagemarkError
pub type Result<T> = std::result::Result<T, PagemarkError>;

/// Top-level error type for all Pagemark operations
#[derive(Debug, Error)]
pub enum PagemarkError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the library and blob/metadata stores.
///
/// Pipeline-internal conditions (rejected observations, unresolvable
/// navigation targets) are not errors: the codec and resolver return `None`
/// and the next observation supersedes them.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A book or cover file referenced by a record is absent from storage.
    /// Surfaced to the shell as a load failure; not retryable without
    /// re-import.
    #[error("Blob missing from storage: {0}")]
    BlobMissing(String),

    /// An update targeted a record that does not exist (or was deleted).
    #[error("Record not found: {0}")]
    RecordNotFound(Uuid),

    /// The underlying store rejected a read or write.
    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by the rendering engine behind the `RenderingEngine` seam.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine has not finished parsing the document yet. Retryable.
    #[error("Engine is not ready")]
    NotReady,

    #[error("Engine failure: {0}")]
    Failed(String),
}

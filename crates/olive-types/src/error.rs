//! Filesystem error taxonomy shared by every adapter.

use thiserror::Error;

/// Result type for filesystem operations.
pub type FsResult<T> = Result<T, FsError>;

/// Filesystem operation errors.
///
/// Every adapter fails with one of these, and the facade passes them through
/// unchanged, so callers never branch on which backend served a path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    /// The path or its parent chain does not resolve, or the leaf is missing
    /// or has the wrong type for the operation.
    #[error("not found: {0}")]
    NotFound(String),
    /// The operation is not allowed on this node (root writes, type conflicts).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    /// No caller identity, or the identity was rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The remote document store could not be reached.
    #[error("transport error: {0}")]
    Transport(String),
    /// The local storage medium failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl FsError {
    /// Returns true for `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }
}

impl From<std::io::Error> for FsError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(err.to_string()),
            _ => FsError::Storage(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for FsError {
    fn from(err: serde_json::Error) -> Self {
        FsError::Storage(format!("malformed document: {err}"))
    }
}

//! Core VFS trait.

use async_trait::async_trait;
use olive_types::{DirEntry, FsResult};

/// Abstract filesystem interface.
///
/// Paths are POSIX-style virtual paths (`/docs/a.txt`); implementations
/// normalize them. Every method is async, even for backends whose medium is
/// synchronous, so the facade can treat all backends alike.
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// List the entries of a directory.
    async fn list_dir(&self, path: &str) -> FsResult<Vec<DirEntry>>;

    /// Read the entire contents of a file.
    async fn read_file(&self, path: &str) -> FsResult<String>;

    /// Write a file, creating it if it doesn't exist.
    async fn write_file(&self, path: &str, data: &str) -> FsResult<()>;

    /// Remove a file or a directory subtree.
    async fn delete_file(&self, path: &str) -> FsResult<()>;

    /// Create a directory.
    async fn mkdir(&self, path: &str) -> FsResult<()>;

    /// Describe a file or directory.
    async fn stat(&self, path: &str) -> FsResult<DirEntry>;

    /// Clear every node, leaving an empty root.
    async fn reset(&self) -> FsResult<()>;

    /// Check if a path exists.
    ///
    /// Only `NotFound` maps to `false`; transport and auth failures still
    /// surface as errors.
    async fn exists(&self, path: &str) -> FsResult<bool> {
        match self.stat(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Check if a path is a directory.
    async fn is_dir(&self, path: &str) -> FsResult<bool> {
        match self.stat(path).await {
            Ok(entry) => Ok(entry.is_dir()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

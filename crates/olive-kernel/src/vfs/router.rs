//! Filesystem facade that routes by path prefix.
//!
//! Paths under the remote prefix (default `/cloud`) go to the remote adapter;
//! everything else goes to the local adapter. Both see the full path, so the
//! account document keeps the prefix as its own top-level directory:
//!
//! ```text
//! /                     # local tree
//! ├── /documents/...    # local
//! └── /cloud/...        # remote document, under its `/cloud` directory
//! ```
//!
//! A fresh account has no prefix directory yet; the facade treats the mount
//! point as an empty directory until something is written under it.

use std::sync::Arc;

use async_trait::async_trait;
use olive_types::{DirEntry, FsError, FsResult};
use serde::Serialize;

use super::path::{file_name, normalize, segments, strip_mount};
use super::traits::Filesystem;

/// Default mount prefix for the remote adapter.
pub const CLOUD_PREFIX: &str = "/cloud";

/// Routes each call to the local or the remote adapter.
pub struct OliveFs {
    local: Arc<dyn Filesystem>,
    remote: Arc<dyn Filesystem>,
    prefix: String,
}

impl std::fmt::Debug for OliveFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OliveFs")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl OliveFs {
    /// Create a facade with the remote adapter mounted at [`CLOUD_PREFIX`].
    pub fn new(local: Arc<dyn Filesystem>, remote: Arc<dyn Filesystem>) -> Self {
        Self {
            local,
            remote,
            prefix: CLOUD_PREFIX.to_string(),
        }
    }

    /// Mount the remote adapter somewhere else.
    ///
    /// Mounting at `/` would hide the local tree entirely, so a root prefix
    /// falls back to the default.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        let prefix = normalize(prefix);
        if prefix == "/" {
            tracing::warn!("remote prefix cannot be the root, keeping {CLOUD_PREFIX}");
        } else {
            self.prefix = prefix;
        }
        self
    }

    /// The remote mount prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if `path` is served by the remote adapter.
    pub fn is_remote(&self, path: &str) -> bool {
        strip_mount(&normalize(path), &self.prefix).is_some()
    }

    /// Serialize `value` as JSON text and write it to `path`.
    pub async fn write_json<T: Serialize + ?Sized + Sync>(
        &self,
        path: &str,
        value: &T,
    ) -> FsResult<()> {
        let text = serde_json::to_string(value)?;
        self.write_file(path, &text).await
    }

    fn route(&self, path: &str) -> (&dyn Filesystem, String) {
        let normalized = normalize(path);
        if strip_mount(&normalized, &self.prefix).is_some() {
            (self.remote.as_ref(), normalized)
        } else {
            (self.local.as_ref(), normalized)
        }
    }

    fn is_mount_point(&self, path: &str) -> bool {
        normalize(path) == self.prefix
    }

    fn mount_point_error(&self, op: &str) -> FsError {
        FsError::InvalidOperation(format!("cannot {op} the mount point {}", self.prefix))
    }

    /// List the local root plus the mount point for the remote prefix.
    async fn list_root(&self) -> FsResult<Vec<DirEntry>> {
        let mut entries = self.local.list_dir("/").await?;
        if let Some(mount) = segments(&self.prefix).first()
            && !entries.iter().any(|e| e.name == *mount)
        {
            entries.push(DirEntry::directory(*mount));
            entries.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(entries)
    }
}

#[async_trait]
impl Filesystem for OliveFs {
    async fn list_dir(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        if normalize(path) == "/" {
            return self.list_root().await;
        }
        let (fs, routed) = self.route(path);
        match fs.list_dir(&routed).await {
            Err(e) if e.is_not_found() && self.is_mount_point(&routed) => Ok(Vec::new()),
            result => result,
        }
    }

    async fn read_file(&self, path: &str) -> FsResult<String> {
        let (fs, routed) = self.route(path);
        fs.read_file(&routed).await
    }

    async fn write_file(&self, path: &str, data: &str) -> FsResult<()> {
        if self.is_mount_point(path) {
            return Err(self.mount_point_error("write to"));
        }
        let (fs, routed) = self.route(path);
        fs.write_file(&routed, data).await
    }

    async fn delete_file(&self, path: &str) -> FsResult<()> {
        if self.is_mount_point(path) {
            return Err(self.mount_point_error("delete"));
        }
        let (fs, routed) = self.route(path);
        fs.delete_file(&routed).await
    }

    async fn mkdir(&self, path: &str) -> FsResult<()> {
        let (fs, routed) = self.route(path);
        fs.mkdir(&routed).await
    }

    async fn stat(&self, path: &str) -> FsResult<DirEntry> {
        let (fs, routed) = self.route(path);
        match fs.stat(&routed).await {
            Err(e) if e.is_not_found() && self.is_mount_point(&routed) => {
                Ok(DirEntry::directory(file_name(&routed)))
            }
            result => result,
        }
    }

    /// Clear the remote document, then local storage. A signed-out session
    /// has no remote document to clear; any other remote failure leaves
    /// local storage untouched.
    async fn reset(&self) -> FsResult<()> {
        tracing::info!("resetting remote and local filesystems");
        match self.remote.reset().await {
            Err(FsError::Unauthorized(reason)) => {
                tracing::warn!(%reason, "not signed in, skipping remote reset");
            }
            result => result?,
        }
        self.local.reset().await
    }

    async fn exists(&self, path: &str) -> FsResult<bool> {
        let (fs, routed) = self.route(path);
        match fs.exists(&routed).await? {
            false if self.is_mount_point(&routed) => Ok(true),
            found => Ok(found),
        }
    }

    async fn is_dir(&self, path: &str) -> FsResult<bool> {
        let (fs, routed) = self.route(path);
        match fs.is_dir(&routed).await? {
            false if self.is_mount_point(&routed) => Ok(true),
            dir => Ok(dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::testing::CountingFs;
    use crate::vfs::LocalFs;
    use olive_types::EntryKind;

    fn facade() -> (OliveFs, Arc<CountingFs>, Arc<CountingFs>) {
        let local = Arc::new(CountingFs::new());
        let remote = Arc::new(CountingFs::new());
        let fs = OliveFs::new(local.clone(), remote.clone());
        (fs, local, remote)
    }

    #[tokio::test]
    async fn test_prefixed_paths_go_remote() {
        let (fs, local, remote) = facade();
        fs.read_file("/cloud/notes.txt").await.unwrap();
        fs.write_file("/cloud/a/b.txt", "x").await.unwrap();

        assert_eq!(remote.calls(), 2);
        assert_eq!(local.calls(), 0);
        assert_eq!(remote.paths(), vec!["/cloud/notes.txt", "/cloud/a/b.txt"]);
    }

    #[tokio::test]
    async fn test_other_paths_stay_local() {
        let (fs, local, remote) = facade();
        fs.mkdir("/documents").await.unwrap();
        fs.read_file("/cloudy/day.txt").await.unwrap();
        fs.delete_file("documents/old.txt").await.unwrap();

        assert_eq!(local.calls(), 3);
        assert_eq!(remote.calls(), 0);
        assert_eq!(
            local.paths(),
            vec!["/documents", "/cloudy/day.txt", "/documents/old.txt"]
        );
    }

    #[tokio::test]
    async fn test_prefix_itself_goes_remote() {
        let (fs, _local, remote) = facade();
        fs.list_dir("/cloud").await.unwrap();
        fs.list_dir("/cloud/").await.unwrap();
        assert_eq!(remote.paths(), vec!["/cloud", "/cloud"]);
    }

    #[tokio::test]
    async fn test_missing_mount_point_reads_as_empty_dir() {
        let local = Arc::new(LocalFs::in_memory());
        let remote = Arc::new(LocalFs::in_memory());
        let fs = OliveFs::new(local, remote.clone());

        assert!(fs.list_dir("/cloud").await.unwrap().is_empty());
        assert!(fs.exists("/cloud").await.unwrap());
        assert!(fs.is_dir("/cloud").await.unwrap());
        assert_eq!(fs.stat("/cloud").await.unwrap().kind, EntryKind::Directory);
        assert!(fs.read_file("/cloud/x").await.unwrap_err().is_not_found());
        assert!(!remote.exists("/cloud").await.unwrap());
    }

    #[tokio::test]
    async fn test_mount_point_cannot_be_replaced() {
        let local = Arc::new(LocalFs::in_memory());
        let fs = OliveFs::new(local, Arc::new(LocalFs::in_memory()));
        assert!(matches!(
            fs.write_file("/cloud", "x").await,
            Err(FsError::InvalidOperation(_))
        ));
        assert!(matches!(
            fs.delete_file("/cloud/").await,
            Err(FsError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_root_listing_shows_mount_point() {
        let local = Arc::new(LocalFs::in_memory());
        local.mkdir("/documents").await.unwrap();
        let remote = Arc::new(CountingFs::new());
        let fs = OliveFs::new(local, remote.clone());

        let entries = fs.list_dir("/").await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["cloud", "documents"]);
        assert_eq!(entries[0].kind, EntryKind::Directory);
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn test_stat_prefix_reports_its_name() {
        let (fs, _local, _remote) = facade();
        let entry = fs.stat("/cloud").await.unwrap();
        assert_eq!(entry.name, "cloud");
    }

    #[tokio::test]
    async fn test_custom_prefix() {
        let (fs, local, remote) = facade();
        let fs = fs.with_prefix("/net/");
        assert_eq!(fs.prefix(), "/net");
        assert!(fs.is_remote("/net/x"));
        assert!(!fs.is_remote("/cloud/x"));

        fs.read_file("/cloud/x").await.unwrap();
        fs.read_file("/net/x").await.unwrap();
        assert_eq!((local.calls(), remote.calls()), (1, 1));
        assert_eq!(remote.paths(), vec!["/net/x"]);
    }

    #[tokio::test]
    async fn test_root_prefix_is_rejected() {
        let (fs, _, _) = facade();
        assert_eq!(fs.with_prefix("/").prefix(), CLOUD_PREFIX);
    }

    #[tokio::test]
    async fn test_reset_clears_both() {
        let (fs, local, remote) = facade();
        fs.reset().await.unwrap();
        assert_eq!((local.calls(), remote.calls()), (1, 1));
    }

    #[tokio::test]
    async fn test_reset_signed_out_still_clears_local() {
        let local = Arc::new(LocalFs::in_memory());
        local.write_file("/a.txt", "a").await.unwrap();
        let remote = Arc::new(CountingFs::failing());
        let fs = OliveFs::new(local.clone(), remote.clone());

        fs.reset().await.unwrap();
        assert_eq!(remote.calls(), 1);
        assert!(!local.exists("/a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let local = Arc::new(LocalFs::in_memory());
        let fs = OliveFs::new(local, Arc::new(CountingFs::failing()));
        assert!(fs.read_file("/missing").await.unwrap_err().is_not_found());
        assert!(matches!(
            fs.read_file("/cloud/x").await,
            Err(FsError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_write_json() {
        let local = Arc::new(LocalFs::in_memory());
        let fs = OliveFs::new(local, Arc::new(CountingFs::new()));
        fs.write_json("/prefs.json", &serde_json::json!({"theme": "dark"}))
            .await
            .unwrap();
        assert_eq!(
            fs.read_file("/prefs.json").await.unwrap(),
            r#"{"theme":"dark"}"#
        );
    }
}

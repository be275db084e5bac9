//! Local filesystem adapter.
//!
//! The whole tree lives under a single key of a [`BlobStore`]. Every call
//! loads the document, runs one tree operation, and (for mutations) saves the
//! whole document back. A mutex serializes those cycles so calls observe a
//! total order.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use olive_types::{DirEntry, FsError, FsResult, Tree};

use super::clock::{Clock, SystemClock};
use super::store::{BlobStore, MemoryBlobStore};
use super::traits::Filesystem;
use super::tree::{self, ParentPolicy};

/// Storage key holding the serialized tree.
pub const LOCAL_FS_KEY: &str = "oliveos_fs_v2";

/// Filesystem adapter over a synchronous blob store.
#[derive(Debug)]
pub struct LocalFs {
    store: Arc<dyn BlobStore>,
    key: String,
    clock: Arc<dyn Clock>,
    policy: ParentPolicy,
    lock: Mutex<()>,
}

impl LocalFs {
    /// Create a local filesystem persisted in `store`.
    ///
    /// Missing parents are not created: `mkdir` and `write_file` need the
    /// parent chain to exist.
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            key: LOCAL_FS_KEY.to_string(),
            clock: Arc::new(SystemClock),
            policy: ParentPolicy::Strict,
            lock: Mutex::new(()),
        }
    }

    /// Create an ephemeral local filesystem.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBlobStore::new()))
    }

    /// Use a different storage key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Use a different time source for node timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Change how missing parent directories are handled.
    pub fn with_parent_policy(mut self, policy: ParentPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The storage key holding the tree.
    pub fn key(&self) -> &str {
        &self.key
    }

    fn load(&self) -> FsResult<Tree> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(Tree::new());
        };
        match serde_json::from_str(&raw) {
            Ok(tree) => Ok(tree),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "discarding unreadable local filesystem document");
                Ok(Tree::new())
            }
        }
    }

    fn save(&self, tree: &Tree) -> FsResult<()> {
        let raw = serde_json::to_string(tree)?;
        self.store.set(&self.key, &raw)
    }

    fn read<R>(&self, op: impl FnOnce(&Tree) -> FsResult<R>) -> FsResult<R> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| FsError::Storage("lock poisoned".to_string()))?;
        let tree = self.load()?;
        op(&tree)
    }

    fn modify<R>(&self, op: impl FnOnce(&mut Tree) -> FsResult<R>) -> FsResult<R> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| FsError::Storage("lock poisoned".to_string()))?;
        let mut tree = self.load()?;
        let result = op(&mut tree)?;
        self.save(&tree)?;
        Ok(result)
    }
}

#[async_trait]
impl Filesystem for LocalFs {
    async fn list_dir(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        tracing::debug!(path, "local list_dir");
        self.read(|tree| tree::list_dir(tree, path))
    }

    async fn read_file(&self, path: &str) -> FsResult<String> {
        tracing::debug!(path, "local read_file");
        self.read(|tree| tree::read_file(tree, path))
    }

    async fn write_file(&self, path: &str, data: &str) -> FsResult<()> {
        tracing::debug!(path, bytes = data.len(), "local write_file");
        let now = self.clock.now_millis();
        self.modify(|tree| tree::write_file(tree, path, data, now, self.policy))
    }

    async fn delete_file(&self, path: &str) -> FsResult<()> {
        tracing::debug!(path, "local delete_file");
        self.modify(|tree| tree::delete(tree, path))
    }

    async fn mkdir(&self, path: &str) -> FsResult<()> {
        tracing::debug!(path, "local mkdir");
        self.modify(|tree| tree::mkdir(tree, path, self.policy))
    }

    async fn stat(&self, path: &str) -> FsResult<DirEntry> {
        self.read(|tree| tree::stat(tree, path))
    }

    async fn reset(&self) -> FsResult<()> {
        tracing::debug!(key = %self.key, "local reset");
        self.modify(|tree| {
            *tree = Tree::new();
            Ok(())
        })
    }

    async fn exists(&self, path: &str) -> FsResult<bool> {
        self.read(|tree| Ok(tree::exists(tree, path)))
    }

    async fn is_dir(&self, path: &str) -> FsResult<bool> {
        self.read(|tree| Ok(tree::is_dir(tree, path)))
    }
}

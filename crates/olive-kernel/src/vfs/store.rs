//! Synchronous key/value storage for the local adapter.
//!
//! This is the per-origin storage analogue: a flat set of string values
//! under string keys, read and written whole.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use olive_types::{FsError, FsResult};

use crate::paths::olive_storage_dir;

/// A synchronous key/value store holding whole serialized documents.
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// Read the value under `key`, or `None` if unset.
    fn get(&self, key: &str) -> FsResult<Option<String>>;

    /// Replace the value under `key`.
    fn set(&self, key: &str, value: &str) -> FsResult<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> FsResult<()>;
}

/// In-memory blob store. All data is lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> FsError {
    FsError::Storage("lock poisoned".to_string())
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> FsResult<Option<String>> {
        let values = self.values.read().map_err(|_| poisoned())?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> FsResult<()> {
        let mut values = self.values.write().map_err(|_| poisoned())?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> FsResult<()> {
        let mut values = self.values.write().map_err(|_| poisoned())?;
        values.remove(key);
        Ok(())
    }
}

/// Blob store keeping one `<key>.json` file per key under a directory.
///
/// Writes go to a temporary file first and are renamed into place, so a
/// crash mid-write leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a store under the XDG data directory.
    pub fn in_data_dir() -> Self {
        Self::new(olive_storage_dir())
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> FsResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(FsError::Storage(format!("invalid storage key: {key:?}")));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> FsResult<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FsError::Storage(format!("{}: {e}", path.display()))),
        }
    }

    fn set(&self, key: &str, value: &str) -> FsResult<()> {
        let path = self.key_path(key)?;
        let storage_err = |e: io::Error| FsError::Storage(format!("{}: {e}", path.display()));

        fs::create_dir_all(&self.root).map_err(storage_err)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(storage_err)?;
        fs::rename(&tmp, &path).map_err(storage_err)
    }

    fn remove(&self, key: &str) -> FsResult<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FsError::Storage(format!("{}: {e}", path.display()))),
        }
    }
}

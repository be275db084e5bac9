//! Test doubles for the vfs module.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use olive_types::{DirEntry, FsError, FsResult};

use super::path::file_name;
use super::traits::Filesystem;

/// Filesystem that records every path it is called with.
/// Used to verify the facade routes to the right adapter.
#[derive(Debug, Default)]
pub struct CountingFs {
    calls: AtomicUsize,
    paths: Mutex<Vec<String>>,
    fail: bool,
}

impl CountingFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// A double whose every call fails with `Unauthorized`.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Number of calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Paths received, in call order. `reset` records nothing.
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }

    fn record(&self, path: &str) -> FsResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.paths.lock().unwrap().push(path.to_string());
        if self.fail {
            return Err(FsError::Unauthorized("counting double".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Filesystem for CountingFs {
    async fn list_dir(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        self.record(path)?;
        Ok(Vec::new())
    }

    async fn read_file(&self, path: &str) -> FsResult<String> {
        self.record(path)?;
        Ok(String::new())
    }

    async fn write_file(&self, path: &str, _data: &str) -> FsResult<()> {
        self.record(path)
    }

    async fn delete_file(&self, path: &str) -> FsResult<()> {
        self.record(path)
    }

    async fn mkdir(&self, path: &str) -> FsResult<()> {
        self.record(path)
    }

    async fn stat(&self, path: &str) -> FsResult<DirEntry> {
        self.record(path)?;
        Ok(DirEntry::directory(file_name(path)))
    }

    async fn reset(&self) -> FsResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(FsError::Unauthorized("counting double".to_string()));
        }
        Ok(())
    }
}

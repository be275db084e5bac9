//! Directory entry types returned by `list_dir` and `stat`.

use serde::{Deserialize, Serialize};

use crate::node::Millis;

/// Kind of directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    #[serde(rename = "file")]
    File,
    #[serde(rename = "dir")]
    Directory,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::File => write!(f, "file"),
            EntryKind::Directory => write!(f, "dir"),
        }
    }
}

/// A directory entry, the unified metadata type.
///
/// Used for both `list_dir()` (one per child) and `stat()` (the node itself).
/// Directories carry no timestamps; files always do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Name of the entry (not full path). `/` for the root.
    pub name: String,
    /// Kind of entry.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Creation time, if known.
    pub created: Option<Millis>,
    /// Last modification time, if known.
    pub modified: Option<Millis>,
}

impl DirEntry {
    /// Create a new directory entry.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            size: 0,
            created: None,
            modified: None,
        }
    }

    /// Create a new file entry.
    pub fn file(name: impl Into<String>, size: u64, created: Millis, modified: Millis) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size,
            created: Some(created),
            modified: Some(modified),
        }
    }

    /// Returns true if this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Returns true if this entry is a file.
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

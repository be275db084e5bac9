//! Filesystem tree nodes.
//!
//! A whole filesystem scope is one [`Tree`]: a root [`Directory`] holding
//! nested [`Node`]s. The tree is the unit of persistence for both the local
//! and the remote adapter, so its JSON shape is the storage format:
//!
//! ```text
//! {"/": {"type": "dir", "children": {
//!     "notes.txt": {"type": "file", "data": "hi", "created": 1, "modified": 1, "size": 2}
//! }}}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub type Millis = i64;

/// A node in the filesystem tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    #[serde(rename = "dir")]
    Dir(Directory),
    #[serde(rename = "file")]
    File(FileNode),
}

impl Node {
    /// Returns true if this node is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Dir(_))
    }
}

/// A directory: a name-unique mapping of children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    #[serde(default)]
    pub children: BTreeMap<String, Node>,
}

/// A file holding text data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub data: String,
    #[serde(default)]
    pub created: Millis,
    #[serde(default)]
    pub modified: Millis,
    #[serde(default)]
    pub size: u64,
}

impl FileNode {
    /// Create a file stamped with `now` for both timestamps.
    pub fn new(data: impl Into<String>, now: Millis) -> Self {
        let data = data.into();
        Self {
            size: data.len() as u64,
            data,
            created: now,
            modified: now,
        }
    }

    /// Replace the contents, keeping `created`.
    pub fn overwrite(&mut self, data: impl Into<String>, now: Millis) {
        self.data = data.into();
        self.size = self.data.len() as u64;
        self.modified = now;
    }
}

/// A complete filesystem tree rooted at `/`.
///
/// The root is always a directory; deserializing a document whose root is a
/// file fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TreeDocument", into = "TreeDocument")]
pub struct Tree {
    root: Directory,
}

impl Tree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// The root directory.
    pub fn root(&self) -> &Directory {
        &self.root
    }

    /// The root directory, mutably.
    pub fn root_mut(&mut self) -> &mut Directory {
        &mut self.root
    }

    /// Returns true if the root has no children.
    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }
}

#[derive(Serialize, Deserialize)]
struct TreeDocument {
    #[serde(rename = "/")]
    root: Node,
}

impl TryFrom<TreeDocument> for Tree {
    type Error = String;

    fn try_from(doc: TreeDocument) -> Result<Self, Self::Error> {
        match doc.root {
            Node::Dir(root) => Ok(Tree { root }),
            Node::File(_) => Err("root of a filesystem tree must be a directory".to_string()),
        }
    }
}

impl From<Tree> for TreeDocument {
    fn from(tree: Tree) -> Self {
        TreeDocument {
            root: Node::Dir(tree.root),
        }
    }
}

/// Wire envelope for a per-account document: `{"fs": Tree}`.
///
/// A missing `fs` field reads as an empty tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsDocument {
    #[serde(default)]
    pub fs: Tree,
}

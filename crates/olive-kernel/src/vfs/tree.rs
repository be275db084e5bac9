//! Path-tree operations shared by every adapter.
//!
//! These are pure functions over an in-memory [`Tree`]. Adapters load a tree
//! from their medium, call one of these, and (for mutations) persist the
//! whole tree back. Timestamps come in as arguments so the functions stay
//! deterministic.

use olive_types::{DirEntry, Directory, FileNode, FsError, FsResult, Millis, Node, Tree};

use super::path::{normalize, segments};

/// What to do when an intermediate directory is missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParentPolicy {
    /// Missing intermediates fail with `NotFound`.
    #[default]
    Strict,
    /// Missing intermediates are created as directories.
    CreateParents,
}

/// A borrowed view of a resolved node, including the root.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'t> {
    Dir(&'t Directory),
    File(&'t FileNode),
}

impl<'t> NodeRef<'t> {
    fn from_node(node: &'t Node) -> Self {
        match node {
            Node::Dir(dir) => NodeRef::Dir(dir),
            Node::File(file) => NodeRef::File(file),
        }
    }

    /// Describe this node as a directory entry called `name`.
    pub fn to_entry(self, name: &str) -> DirEntry {
        match self {
            NodeRef::Dir(_) => DirEntry::directory(name),
            NodeRef::File(f) => DirEntry::file(name, f.size, f.created, f.modified),
        }
    }
}

/// Find the node at `path`.
///
/// Fails with `NotFound` if an intermediate segment is missing or is a file,
/// or if the leaf itself is missing.
pub fn find<'t>(tree: &'t Tree, path: &str) -> FsResult<NodeRef<'t>> {
    let normalized = normalize(path);
    let mut current = NodeRef::Dir(tree.root());

    for segment in segments(&normalized) {
        let NodeRef::Dir(dir) = current else {
            return Err(FsError::NotFound(format!("not a directory: {normalized}")));
        };
        match dir.children.get(segment) {
            Some(node) => current = NodeRef::from_node(node),
            None => {
                return Err(FsError::NotFound(format!(
                    "no such file or directory: {normalized}"
                )));
            }
        }
    }

    Ok(current)
}

/// Resolve the parent directory of `path` and the leaf name.
///
/// The root has no parent and fails with `InvalidOperation`. With
/// [`ParentPolicy::CreateParents`], missing intermediates are created, and an
/// intermediate file is an `InvalidOperation` rather than `NotFound`.
pub fn resolve_parent<'t>(
    tree: &'t mut Tree,
    path: &str,
    policy: ParentPolicy,
) -> FsResult<(&'t mut Directory, String)> {
    let normalized = normalize(path);
    let mut parts = segments(&normalized);
    let Some(leaf) = parts.pop() else {
        return Err(FsError::InvalidOperation(
            "the root directory has no parent".to_string(),
        ));
    };
    let leaf = leaf.to_string();

    let mut dir = tree.root_mut();
    for segment in parts {
        dir = descend(dir, segment, &normalized, policy)?;
    }
    Ok((dir, leaf))
}

fn descend<'d>(
    dir: &'d mut Directory,
    name: &str,
    path: &str,
    policy: ParentPolicy,
) -> FsResult<&'d mut Directory> {
    if policy == ParentPolicy::CreateParents && !dir.children.contains_key(name) {
        dir.children
            .insert(name.to_string(), Node::Dir(Directory::default()));
    }

    match dir.children.get_mut(name) {
        Some(Node::Dir(child)) => Ok(child),
        Some(Node::File(_)) => match policy {
            ParentPolicy::Strict => Err(FsError::NotFound(format!(
                "not a directory: {name} in {path}"
            ))),
            ParentPolicy::CreateParents => Err(FsError::InvalidOperation(format!(
                "not a directory: {name} in {path}"
            ))),
        },
        None => Err(FsError::NotFound(format!("no such directory: {name} in {path}"))),
    }
}

/// List the children of the directory at `path`.
pub fn list_dir(tree: &Tree, path: &str) -> FsResult<Vec<DirEntry>> {
    match find(tree, path)? {
        NodeRef::Dir(dir) => Ok(dir
            .children
            .iter()
            .map(|(name, node)| NodeRef::from_node(node).to_entry(name))
            .collect()),
        NodeRef::File(_) => Err(FsError::NotFound(format!(
            "not a directory: {}",
            normalize(path)
        ))),
    }
}

/// Read the contents of the file at `path`.
pub fn read_file(tree: &Tree, path: &str) -> FsResult<String> {
    let normalized = normalize(path);
    if normalized == "/" {
        return Err(FsError::InvalidOperation(
            "cannot read the root directory as a file".to_string(),
        ));
    }
    match find(tree, &normalized)? {
        NodeRef::File(file) => Ok(file.data.clone()),
        NodeRef::Dir(_) => Err(FsError::NotFound(format!("not a file: {normalized}"))),
    }
}

/// Create or overwrite the file at `path`.
///
/// Overwriting keeps `created` and refreshes `size` and `modified`.
pub fn write_file(
    tree: &mut Tree,
    path: &str,
    data: &str,
    now: Millis,
    policy: ParentPolicy,
) -> FsResult<()> {
    let normalized = normalize(path);
    if normalized == "/" {
        return Err(FsError::InvalidOperation(
            "cannot write to the root directory".to_string(),
        ));
    }

    let (parent, leaf) = resolve_parent(tree, &normalized, policy)?;
    match parent.children.get_mut(&leaf) {
        Some(Node::File(file)) => {
            file.overwrite(data, now);
            Ok(())
        }
        Some(Node::Dir(_)) => Err(FsError::InvalidOperation(format!(
            "is a directory: {normalized}"
        ))),
        None => {
            parent.children.insert(leaf, Node::File(FileNode::new(data, now)));
            Ok(())
        }
    }
}

/// Create a directory at `path`.
///
/// An existing directory (including the root) is left alone; an existing
/// file is an `InvalidOperation`.
pub fn mkdir(tree: &mut Tree, path: &str, policy: ParentPolicy) -> FsResult<()> {
    let normalized = normalize(path);
    if normalized == "/" {
        return Ok(());
    }

    let (parent, leaf) = resolve_parent(tree, &normalized, policy)?;
    match parent.children.get(&leaf) {
        Some(Node::Dir(_)) => Ok(()),
        Some(Node::File(_)) => Err(FsError::InvalidOperation(format!(
            "file exists: {normalized}"
        ))),
        None => {
            parent.children.insert(leaf, Node::Dir(Directory::default()));
            Ok(())
        }
    }
}

/// Remove the file or directory subtree at `path`.
pub fn delete(tree: &mut Tree, path: &str) -> FsResult<()> {
    let normalized = normalize(path);
    if normalized == "/" {
        return Err(FsError::InvalidOperation(
            "cannot delete the root directory".to_string(),
        ));
    }

    let (parent, leaf) = resolve_parent(tree, &normalized, ParentPolicy::Strict)?;
    parent
        .children
        .remove(&leaf)
        .map(|_| ())
        .ok_or(FsError::NotFound(normalized))
}

/// Describe the node at `path`.
pub fn stat(tree: &Tree, path: &str) -> FsResult<DirEntry> {
    let normalized = normalize(path);
    let node = find(tree, &normalized)?;
    Ok(node.to_entry(super::path::file_name(&normalized)))
}

/// Returns true if `path` resolves to any node.
pub fn exists(tree: &Tree, path: &str) -> bool {
    find(tree, path).is_ok()
}

/// Returns true if `path` resolves to a directory.
pub fn is_dir(tree: &Tree, path: &str) -> bool {
    matches!(find(tree, path), Ok(NodeRef::Dir(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use olive_types::EntryKind;

    fn tree_with_a() -> Tree {
        let mut tree = Tree::new();
        mkdir(&mut tree, "/a", ParentPolicy::Strict).unwrap();
        tree
    }

    #[test]
    fn test_write_then_read() {
        let mut tree = tree_with_a();
        write_file(&mut tree, "/a/b.txt", "hello", 1, ParentPolicy::Strict).unwrap();
        assert_eq!(read_file(&tree, "/a/b.txt").unwrap(), "hello");
        assert_eq!(read_file(&tree, "a/b.txt/").unwrap(), "hello");
    }

    #[test]
    fn test_overwrite_preserves_created() {
        let mut tree = Tree::new();
        write_file(&mut tree, "/f", "one", 10, ParentPolicy::Strict).unwrap();
        write_file(&mut tree, "/f", "two!", 20, ParentPolicy::Strict).unwrap();

        let entry = stat(&tree, "/f").unwrap();
        assert_eq!(entry.created, Some(10));
        assert_eq!(entry.modified, Some(20));
        assert_eq!(entry.size, 4);
    }

    #[test]
    fn test_size_is_byte_length() {
        let mut tree = Tree::new();
        write_file(&mut tree, "/u", "héllo", 1, ParentPolicy::Strict).unwrap();
        assert_eq!(stat(&tree, "/u").unwrap().size, "héllo".len() as u64);
    }

    #[test]
    fn test_strict_write_needs_parent() {
        let mut tree = Tree::new();
        let err = write_file(&mut tree, "/missing/f", "x", 1, ParentPolicy::Strict).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_create_parents_write() {
        let mut tree = Tree::new();
        write_file(&mut tree, "/x/y/f", "x", 1, ParentPolicy::CreateParents).unwrap();
        assert!(is_dir(&tree, "/x"));
        assert!(is_dir(&tree, "/x/y"));
        assert_eq!(read_file(&tree, "/x/y/f").unwrap(), "x");
    }

    #[test]
    fn test_create_parents_through_file_fails() {
        let mut tree = Tree::new();
        write_file(&mut tree, "/f", "x", 1, ParentPolicy::Strict).unwrap();
        let err = mkdir(&mut tree, "/f/sub", ParentPolicy::CreateParents).unwrap_err();
        assert!(matches!(err, FsError::InvalidOperation(_)));
    }

    #[test]
    fn test_strict_through_file_is_not_found() {
        let mut tree = Tree::new();
        write_file(&mut tree, "/f", "x", 1, ParentPolicy::Strict).unwrap();
        let err = mkdir(&mut tree, "/f/sub", ParentPolicy::Strict).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_root_special_cases() {
        let mut tree = Tree::new();
        assert!(matches!(
            write_file(&mut tree, "/", "x", 1, ParentPolicy::Strict),
            Err(FsError::InvalidOperation(_))
        ));
        assert!(matches!(read_file(&tree, "/"), Err(FsError::InvalidOperation(_))));
        assert!(matches!(delete(&mut tree, "/"), Err(FsError::InvalidOperation(_))));
        mkdir(&mut tree, "/", ParentPolicy::Strict).unwrap();

        let root = stat(&tree, "/").unwrap();
        assert_eq!(root.name, "/");
        assert_eq!(root.kind, EntryKind::Directory);
        assert!(list_dir(&tree, "/").unwrap().is_empty());
    }

    #[test]
    fn test_mkdir_over_file_fails() {
        let mut tree = Tree::new();
        write_file(&mut tree, "/f", "x", 1, ParentPolicy::Strict).unwrap();
        assert!(matches!(
            mkdir(&mut tree, "/f", ParentPolicy::Strict),
            Err(FsError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_write_over_directory_fails() {
        let mut tree = tree_with_a();
        assert!(matches!(
            write_file(&mut tree, "/a", "x", 1, ParentPolicy::Strict),
            Err(FsError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_read_directory_is_not_found() {
        let tree = tree_with_a();
        assert!(read_file(&tree, "/a").unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_file_is_not_found() {
        let mut tree = Tree::new();
        write_file(&mut tree, "/f", "x", 1, ParentPolicy::Strict).unwrap();
        assert!(list_dir(&tree, "/f").unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_subtree() {
        let mut tree = tree_with_a();
        write_file(&mut tree, "/a/b.txt", "x", 1, ParentPolicy::Strict).unwrap();
        delete(&mut tree, "/a").unwrap();
        assert!(!exists(&tree, "/a"));
        assert!(!exists(&tree, "/a/b.txt"));
        assert!(delete(&mut tree, "/a").unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_after_write_and_mkdir() {
        let mut tree = tree_with_a();
        write_file(&mut tree, "/a/b.txt", "x", 1, ParentPolicy::Strict).unwrap();
        mkdir(&mut tree, "/a/c", ParentPolicy::Strict).unwrap();

        let entries = list_dir(&tree, "/a").unwrap();
        assert_eq!(entries.len(), 2);
        let b = entries.iter().find(|e| e.name == "b.txt").unwrap();
        assert_eq!(b.kind, EntryKind::File);
        assert_eq!(b.size, 1);
        let c = entries.iter().find(|e| e.name == "c").unwrap();
        assert_eq!(c.kind, EntryKind::Directory);
    }
}

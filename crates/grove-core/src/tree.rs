//! Arena-backed repository file tree with lazily loaded directories

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::error::TreeError;
use crate::model::{extension_of, DirEntry, FileKind, FileNode, NodeId};

/// An in-memory snapshot of a repository's files and directories.
///
/// Nodes live in an arena indexed by [`NodeId`]. Ids are never reused, so a
/// directory keeps its id across reloads while its old children are retired.
/// The root is a directory with depth 0 and the empty path.
#[derive(Debug, Clone)]
pub struct FileTree {
    nodes: Vec<Option<FileNode>>,
    by_path: HashMap<String, NodeId>,
    failed: HashSet<NodeId>,
    root: NodeId,
}

impl FileTree {
    /// Create a tree holding only an unloaded root directory.
    pub fn new(root_name: impl Into<String>) -> Self {
        let root = NodeId(0);
        let root_node = FileNode {
            id: root,
            name: root_name.into(),
            path: String::new(),
            kind: FileKind::Directory,
            depth: 0,
            extension: None,
            size: None,
            parent: None,
            children: None,
        };
        let mut by_path = HashMap::new();
        by_path.insert(String::new(), root);
        FileTree {
            nodes: vec![Some(root_node)],
            by_path,
            failed: HashSet::new(),
            root,
        }
    }

    /// Create a tree whose root listing is already known.
    pub fn from_entries(root_name: impl Into<String>, entries: Vec<DirEntry>) -> Self {
        let mut tree = FileTree::new(root_name);
        let root = tree.root;
        // The root always exists and is a directory.
        let _ = tree.set_children(root, entries);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&FileNode> {
        self.nodes.get(id.index()).and_then(|slot| slot.as_ref())
    }

    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        self.by_path.get(path.trim_matches('/')).copied()
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Children of a loaded directory. `None` for files, unknown ids and
    /// directories whose listing has not been delivered yet.
    pub fn children(&self, id: NodeId) -> Option<&[NodeId]> {
        self.get(id).and_then(|n| n.children.as_deref())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Replace the children of directory `id` with a freshly delivered
    /// listing. Previously attached descendants are retired. Returns the ids
    /// of the new children in listing order.
    pub fn set_children(&mut self, id: NodeId, entries: Vec<DirEntry>) -> Result<Vec<NodeId>, TreeError> {
        let (parent_path, parent_depth) = {
            let node = self.get(id).ok_or(TreeError::UnknownNode(id))?;
            if !node.is_dir() {
                return Err(TreeError::NotADirectory(id));
            }
            (node.path.clone(), node.depth)
        };

        self.detach_children(id);

        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            let path = if entry.path.is_empty() {
                join_path(&parent_path, &entry.name)
            } else {
                entry.path.trim_matches('/').to_string()
            };
            if self.by_path.contains_key(&path) {
                debug!("Skipping duplicate entry {} under node {}", path, id);
                continue;
            }
            let extension = match entry.kind {
                FileKind::File => entry.extension.or_else(|| extension_of(&entry.name)),
                FileKind::Directory => None,
            };
            let child_id = self.push_node(FileNode {
                id: NodeId(0),
                name: entry.name,
                path,
                kind: entry.kind,
                depth: parent_depth + 1,
                extension,
                size: entry.size,
                parent: Some(id),
                children: None,
            });
            ids.push(child_id);
        }

        if let Some(Some(node)) = self.nodes.get_mut(id.index()) {
            node.children = Some(ids.clone());
        }
        self.failed.remove(&id);
        Ok(ids)
    }

    /// Record that fetching the listing of `id` failed: the directory becomes
    /// loaded-and-empty and carries a failure flag until the next successful
    /// [`set_children`](Self::set_children).
    pub fn mark_load_failed(&mut self, id: NodeId) -> Result<(), TreeError> {
        let node = self.get(id).ok_or(TreeError::UnknownNode(id))?;
        if !node.is_dir() {
            return Err(TreeError::NotADirectory(id));
        }
        self.detach_children(id);
        if let Some(Some(node)) = self.nodes.get_mut(id.index()) {
            node.children = Some(Vec::new());
        }
        self.failed.insert(id);
        Ok(())
    }

    pub fn load_failed(&self, id: NodeId) -> bool {
        self.failed.contains(&id)
    }

    /// Directories whose last fetch failed, in id order.
    pub fn failed_directories(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.failed.iter().copied().collect();
        ids.sort();
        ids
    }

    /// Insert a node by path, creating intermediate directories as needed.
    ///
    /// Directories touched on the way are treated as loaded, so this is meant
    /// for building fully known trees (local snapshots, fixtures).
    pub fn insert_path(&mut self, path: &str, kind: FileKind, size: Option<u64>) -> Result<NodeId, TreeError> {
        let path = path.trim_matches('/');
        if let Some(existing) = self.find_by_path(path) {
            return Err(TreeError::DuplicatePath(self.get(existing).map(|n| n.path.clone()).unwrap_or_default()));
        }

        let mut parent = self.root;
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((leaf, dirs)) = segments.split_last() else {
            return Err(TreeError::DuplicatePath(String::new()));
        };

        let mut current = String::new();
        for dir in dirs {
            current = join_path(&current, dir);
            parent = match self.find_by_path(&current) {
                Some(existing) => {
                    if !self.get(existing).is_some_and(|n| n.is_dir()) {
                        return Err(TreeError::NotADirectory(existing));
                    }
                    existing
                }
                None => self.attach(parent, DirEntry::directory(current.clone()))?,
            };
        }

        let entry = match kind {
            FileKind::File => DirEntry::file(join_path(&current, leaf), size.unwrap_or(0)),
            FileKind::Directory => DirEntry::directory(join_path(&current, leaf)),
        };
        let id = self.attach(parent, entry)?;
        if kind == FileKind::Directory {
            if let Some(Some(node)) = self.nodes.get_mut(id.index()) {
                node.children = Some(Vec::new());
            }
        }
        Ok(id)
    }

    /// Depth-first pre-order walk from the root, children in listing order.
    pub fn iter(&self) -> DepthFirst<'_> {
        DepthFirst {
            tree: self,
            stack: vec![self.root],
        }
    }

    /// Files only, in depth-first order.
    pub fn files(&self) -> impl Iterator<Item = &FileNode> + '_ {
        self.iter().filter(|n| n.is_file())
    }

    /// Directories whose listing has not been fetched yet.
    pub fn unloaded_directories(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|n| n.is_dir() && !n.is_loaded())
            .map(|n| n.id)
            .collect()
    }

    /// Nested JSON-friendly view of the whole tree.
    pub fn to_nested(&self) -> Option<NestedNode> {
        self.nested_from(self.root)
    }

    fn nested_from(&self, id: NodeId) -> Option<NestedNode> {
        let node = self.get(id)?;
        let children = node
            .children
            .as_ref()
            .map(|ids| ids.iter().filter_map(|&c| self.nested_from(c)).collect());
        Some(NestedNode {
            id: node.id,
            name: node.name.clone(),
            path: node.path.clone(),
            kind: node.kind,
            depth: node.depth,
            extension: node.extension.clone(),
            size: node.size,
            load_failed: self.failed.contains(&id),
            children,
        })
    }

    fn attach(&mut self, parent: NodeId, entry: DirEntry) -> Result<NodeId, TreeError> {
        let parent_depth = self.get(parent).ok_or(TreeError::UnknownNode(parent))?.depth;
        let path = entry.path.trim_matches('/').to_string();
        if self.by_path.contains_key(&path) {
            return Err(TreeError::DuplicatePath(path));
        }
        let id = self.push_node(FileNode {
            id: NodeId(0),
            name: entry.name,
            path,
            kind: entry.kind,
            depth: parent_depth + 1,
            extension: entry.extension,
            size: entry.size,
            parent: Some(parent),
            children: None,
        });
        if let Some(Some(node)) = self.nodes.get_mut(parent.index()) {
            node.children.get_or_insert_with(Vec::new).push(id);
        }
        Ok(id)
    }

    fn push_node(&mut self, mut node: FileNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        node.id = id;
        self.by_path.insert(node.path.clone(), id);
        self.nodes.push(Some(node));
        id
    }

    /// Retire every descendant of `id`, leaving its own children list as-is.
    fn detach_children(&mut self, id: NodeId) {
        let mut stack: Vec<NodeId> = self.children(id).map(|c| c.to_vec()).unwrap_or_default();
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.index()).and_then(Option::take) {
                self.by_path.remove(&node.path);
                self.failed.remove(&current);
                if let Some(children) = node.children {
                    stack.extend(children);
                }
            }
        }
    }
}

/// Pre-order iterator returned by [`FileTree::iter`].
pub struct DepthFirst<'a> {
    tree: &'a FileTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = &'a FileNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            if let Some(node) = self.tree.get(id) {
                if let Some(children) = &node.children {
                    self.stack.extend(children.iter().rev());
                }
                return Some(node);
            }
        }
        None
    }
}

/// Recursive representation used when a caller wants the tree as one JSON
/// document. `children: null` and `children: []` stay distinct.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NestedNode {
    pub id: NodeId,
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub load_failed: bool,
    pub children: Option<Vec<NestedNode>>,
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FileTree {
        FileTree::from_entries(
            "demo",
            vec![
                DirEntry::directory("src"),
                DirEntry::file("README.md", 300),
                DirEntry::file("package.json", 120),
            ],
        )
    }

    #[test]
    fn test_new_tree_root_is_unloaded() {
        let tree = FileTree::new("demo");
        let root = tree.get(tree.root()).unwrap();
        assert_eq!(root.depth, 0);
        assert_eq!(root.path, "");
        assert!(root.children.is_none());
        assert_eq!(tree.unloaded_directories(), vec![tree.root()]);
    }

    #[test]
    fn test_set_children_assigns_depth_and_parent() {
        let mut tree = sample();
        let src = tree.find_by_path("src").unwrap();
        assert!(tree.children(src).is_none());

        let ids = tree
            .set_children(src, vec![DirEntry::file("src/index.ts", 40), DirEntry::directory("src/lib")])
            .unwrap();
        assert_eq!(ids.len(), 2);

        let index = tree.get(ids[0]).unwrap();
        assert_eq!(index.depth, 2);
        assert_eq!(index.parent, Some(src));
        assert_eq!(index.extension.as_deref(), Some("ts"));
        assert_eq!(tree.children(src).unwrap(), ids.as_slice());
    }

    #[test]
    fn test_set_children_retires_previous_subtree() {
        let mut tree = sample();
        let src = tree.find_by_path("src").unwrap();
        let first = tree.set_children(src, vec![DirEntry::directory("src/old")]).unwrap();
        tree.set_children(first[0], vec![DirEntry::file("src/old/a.rs", 1)]).unwrap();
        assert!(tree.find_by_path("src/old/a.rs").is_some());

        tree.set_children(src, vec![DirEntry::file("src/new.rs", 2)]).unwrap();
        assert!(tree.find_by_path("src/old").is_none());
        assert!(tree.find_by_path("src/old/a.rs").is_none());
        assert!(tree.get(first[0]).is_none());
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_set_children_rejects_files() {
        let mut tree = sample();
        let readme = tree.find_by_path("README.md").unwrap();
        assert_eq!(
            tree.set_children(readme, vec![]),
            Err(TreeError::NotADirectory(readme))
        );
        assert_eq!(tree.set_children(NodeId(999), vec![]), Err(TreeError::UnknownNode(NodeId(999))));
    }

    #[test]
    fn test_load_failure_is_empty_but_flagged() {
        let mut tree = sample();
        let src = tree.find_by_path("src").unwrap();
        tree.mark_load_failed(src).unwrap();

        assert_eq!(tree.children(src), Some(&[][..]));
        assert!(tree.load_failed(src));
        assert_eq!(tree.failed_directories(), vec![src]);

        tree.set_children(src, vec![DirEntry::file("src/main.rs", 10)]).unwrap();
        assert!(!tree.load_failed(src));
    }

    #[test]
    fn test_depth_first_order() {
        let mut tree = sample();
        let src = tree.find_by_path("src").unwrap();
        tree.set_children(src, vec![DirEntry::file("src/a.ts", 1), DirEntry::file("src/b.ts", 1)])
            .unwrap();
        let paths: Vec<&str> = tree.iter().map(|n| n.path.as_str()).collect();
        assert_eq!(paths, vec!["", "src", "src/a.ts", "src/b.ts", "README.md", "package.json"]);

        let files: Vec<&str> = tree.files().map(|n| n.name.as_str()).collect();
        assert_eq!(files, vec!["a.ts", "b.ts", "README.md", "package.json"]);
    }

    #[test]
    fn test_insert_path_creates_directories() {
        let mut tree = FileTree::new("demo");
        tree.insert_path("src/utils/helper.ts", FileKind::File, Some(10)).unwrap();
        tree.insert_path("src/index.ts", FileKind::File, Some(20)).unwrap();

        let utils = tree.find_by_path("src/utils").unwrap();
        assert_eq!(tree.get(utils).unwrap().depth, 2);
        assert!(tree.get(utils).unwrap().is_loaded());
        assert_eq!(tree.children(tree.find_by_path("src").unwrap()).unwrap().len(), 2);
        assert!(matches!(
            tree.insert_path("src/index.ts", FileKind::File, None),
            Err(TreeError::DuplicatePath(_))
        ));
    }

    #[test]
    fn test_nested_view_keeps_unloaded_distinct() {
        let mut tree = sample();
        let src = tree.find_by_path("src").unwrap();
        let nested = tree.to_nested().unwrap();
        let src_view = &nested.children.as_ref().unwrap()[0];
        assert!(src_view.children.is_none());

        tree.set_children(src, vec![]).unwrap();
        let nested = tree.to_nested().unwrap();
        let json = serde_json::to_value(&nested).unwrap();
        assert_eq!(json["children"][0]["children"], serde_json::json!([]));
        assert_eq!(json["children"][1]["children"], serde_json::Value::Null);
    }
}

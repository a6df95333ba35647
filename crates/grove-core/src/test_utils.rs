//! Test utilities for Grove

use crate::model::{DirEntry, FileKind};
use crate::tree::FileTree;

/// Build a fully loaded tree from `(path, size)` pairs.
pub fn tree_from_paths(name: &str, files: &[(&str, u64)]) -> FileTree {
    let mut tree = FileTree::new(name);
    for (path, size) in files {
        tree.insert_path(path, FileKind::File, Some(*size)).unwrap();
    }
    tree
}

/// A small web-app shaped repository with one directory left unloaded.
pub fn create_sample_tree() -> FileTree {
    let mut tree = FileTree::from_entries(
        "sample-app",
        vec![
            DirEntry::directory("src"),
            DirEntry::directory("docs"),
            DirEntry::directory(".github"),
            DirEntry::file("package.json", 640),
            DirEntry::file("README.md", 2_300),
            DirEntry::file("tsconfig.json", 410),
        ],
    );

    let src = tree.find_by_path("src").unwrap();
    tree.set_children(
        src,
        vec![
            DirEntry::file("src/index.ts", 1_200),
            DirEntry::file("src/App.tsx", 3_400),
            DirEntry::directory("src/components"),
            DirEntry::directory("src/utils"),
        ],
    )
    .unwrap();

    let components = tree.find_by_path("src/components").unwrap();
    tree.set_children(
        components,
        vec![
            DirEntry::file("src/components/Header.tsx", 900),
            DirEntry::file("src/components/SearchBar.tsx", 1_800),
            DirEntry::file("src/components/FileTree.tsx", 2_700),
        ],
    )
    .unwrap();

    let utils = tree.find_by_path("src/utils").unwrap();
    tree.set_children(
        utils,
        vec![
            DirEntry::file("src/utils/github.ts", 4_100),
            DirEntry::file("src/utils/search.ts", 150_000),
            DirEntry::file("src/utils/layout.js", 2_000),
        ],
    )
    .unwrap();

    let docs = tree.find_by_path("docs").unwrap();
    tree.set_children(docs, vec![DirEntry::file("docs/guide.md", 800)]).unwrap();

    tree
}

/// Source text used for content-search tests.
pub const SEARCH_TS: &str = r#"import { FileNode } from '../types';

export function flatten(nodes: FileNode[]): FileNode[] {
  const out: FileNode[] = [];
  for (const node of nodes) {
    if (node.type === 'file') out.push(node);
    if (node.children) out.push(...flatten(node.children));
  }
  return out;
}
"#;

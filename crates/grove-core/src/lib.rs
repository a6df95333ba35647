//! Grove Core — file tree model, search engine, network layout and bookmarks

pub mod analysis;
pub mod bookmarks;
pub mod error;
pub mod layout;
pub mod model;
pub mod network;
pub mod search;
pub mod sequence;
pub mod storage;
pub mod tree;


#[cfg(test)]
pub mod test_utils;

pub use analysis::{analyze, detect_project_kind, ProjectKind, RepoAnalysis};
pub use bookmarks::{BookmarkBackend, BookmarkSnapshot, BookmarkStore, BookmarkedRepo, JsonFileBackend, MemoryBackend, RepoMetadata};
pub use error::{BookmarkError, LayoutError, SearchError, TreeError};
pub use layout::{GraphLayout, LayoutSnapshot, Viewport, VisibilityMode};
pub use model::{DirEntry, FileKind, FileNode, Language, NodeId};
pub use network::{Connection, ConnectionKind, NetworkNode};
pub use search::{MatchKind, SearchEngine, SearchFilters, SearchMatch, SearchOptions, SearchResult, SizeRange};
pub use sequence::Sequencer;
pub use storage::{STORAGE_DIR, storage_dir, ensure_storage_dir, clear_storage};
pub use tree::{FileTree, NestedNode};

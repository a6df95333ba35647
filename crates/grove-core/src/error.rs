//! Error types for the core crate

use thiserror::Error;

use crate::model::NodeId;

/// Errors raised while mutating a [`FileTree`](crate::tree::FileTree).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("node {0} is not a directory")]
    NotADirectory(NodeId),
    #[error("path `{0}` already exists in the tree")]
    DuplicatePath(String),
}

/// The only failure the search engine can produce.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid search pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("node {0} is not part of the layout")]
    UnknownNode(NodeId),
    #[error("node {0} is not a directory and cannot be expanded")]
    NotADirectory(NodeId),
}

#[derive(Debug, Error)]
pub enum BookmarkError {
    #[error("bookmark storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("bookmark data is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("no bookmark for {0}")]
    NotFound(String),
    #[error("folder `{0}` does not exist")]
    UnknownFolder(String),
    #[error("folder `{0}` already exists")]
    FolderExists(String),
}

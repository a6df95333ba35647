//! The content provider seam between the explorer and a repository host

use chrono::{DateTime, Utc};
use grove_core::{DirEntry, FileKind, RepoMetadata};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rate_limit::RateLimitStatus;
use crate::reference::RepoRef;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("rate limit exceeded{}", reset_suffix(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn reset_suffix(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => format!(", resets at {}", at.to_rfc3339()),
        None => String::new(),
    }
}

impl FetchError {
    /// Whether retrying later might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. } | FetchError::Network(_))
            || matches!(self, FetchError::Http { status, .. } if *status >= 500)
    }
}

/// Repository metadata shown in the header and copied into bookmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoInfo {
    pub full_name: String,
    pub description: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub language: Option<String>,
    pub default_branch: String,
    pub html_url: String,
}

impl RepoInfo {
    pub fn metadata(&self) -> RepoMetadata {
        RepoMetadata {
            description: self.description.clone(),
            stars: Some(self.stars),
            forks: Some(self.forks),
            language: self.language.clone(),
        }
    }
}

/// Source of repository listings and file contents.
///
/// Listings are one level deep: `list_dir` returns the immediate children of
/// `path` (`""` for the root), directories first, each group by name.
#[async_trait::async_trait]
pub trait ContentProvider: Send + Sync {
    async fn list_dir(&self, repo: &RepoRef, path: &str) -> Result<Vec<DirEntry>, FetchError>;

    async fn file_content(&self, repo: &RepoRef, path: &str) -> Result<String, FetchError>;

    async fn repo_info(&self, repo: &RepoRef) -> Result<RepoInfo, FetchError>;

    /// Get provider name
    fn name(&self) -> &str;

    /// Last known API quota, for providers that have one.
    fn rate_limit(&self) -> Option<RateLimitStatus> {
        None
    }
}

/// Directories first, then files, each group ordered case-insensitively.
pub fn sort_entries(entries: &mut [DirEntry]) {
    entries.sort_by(|a, b| {
        let rank = |e: &DirEntry| match e.kind {
            FileKind::Directory => 0,
            FileKind::File => 1,
        };
        rank(a)
            .cmp(&rank(b))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// Normalize a repository-relative path: no leading/trailing slashes, no
/// empty, `.` or `..` segments.
pub fn clean_path(path: &str) -> Result<String, FetchError> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(FetchError::InvalidPath(path.to_string())),
            s => segments.push(s),
        }
    }
    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_entries_directories_first() {
        let mut entries = vec![
            DirEntry::file("b.rs", 1),
            DirEntry::directory("src"),
            DirEntry::file("A.md", 1),
            DirEntry::directory("Docs"),
        ];
        sort_entries(&mut entries);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Docs", "src", "A.md", "b.rs"]);
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("/src//lib/./").unwrap(), "src/lib");
        assert_eq!(clean_path("").unwrap(), "");
        assert!(matches!(clean_path("src/../../etc"), Err(FetchError::InvalidPath(_))));
    }

    #[test]
    fn test_transient_errors() {
        assert!(FetchError::RateLimited { reset_at: None }.is_transient());
        assert!(FetchError::Http { status: 502, message: String::new() }.is_transient());
        assert!(!FetchError::NotFound("x".into()).is_transient());
        assert_eq!(
            FetchError::RateLimited { reset_at: None }.to_string(),
            "rate limit exceeded"
        );
    }
}

//! Local directory provider for offline exploration

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use grove_core::DirEntry;
use ignore::WalkBuilder;
use tracing::debug;

use crate::provider::{clean_path, sort_entries, ContentProvider, FetchError, RepoInfo};
use crate::reference::RepoRef;

/// Serves a checkout on disk as if it were a hosted repository. The
/// repository reference passed to each call only names the result; every
/// listing comes from `root`.
pub struct LocalProvider {
    root: PathBuf,
    excludes: GlobSet,
    respect_gitignore: bool,
}

impl LocalProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excludes: GlobSet::empty(),
            respect_gitignore: true,
        }
    }

    /// Skip entries whose repository-relative path matches any pattern.
    pub fn with_excludes<I, S>(mut self, patterns: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern.as_ref())?);
        }
        self.excludes = builder.build()?;
        Ok(self)
    }

    pub fn respect_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<(String, PathBuf), FetchError> {
        let relative = clean_path(path)?;
        let full = if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(&relative)
        };
        Ok((relative, full))
    }
}

fn list_blocking(
    root: &Path,
    dir: &Path,
    excludes: &GlobSet,
    respect_gitignore: bool,
) -> Result<Vec<DirEntry>, FetchError> {
    let mut entries = Vec::new();
    let walker = WalkBuilder::new(dir)
        .max_depth(Some(1))
        .hidden(true)
        .git_ignore(respect_gitignore)
        .git_exclude(respect_gitignore)
        .ignore(respect_gitignore)
        .require_git(false)
        .parents(true)
        .build();

    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry under {}: {}", dir.display(), e);
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if excludes.is_match(&relative) {
            continue;
        }

        let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
        if is_dir {
            entries.push(DirEntry::directory(relative));
        } else {
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            entries.push(DirEntry::file(relative, size));
        }
    }

    sort_entries(&mut entries);
    Ok(entries)
}

#[async_trait::async_trait]
impl ContentProvider for LocalProvider {
    async fn list_dir(&self, _repo: &RepoRef, path: &str) -> Result<Vec<DirEntry>, FetchError> {
        let (relative, dir) = self.resolve(path)?;
        if !dir.exists() {
            return Err(FetchError::NotFound(relative));
        }
        if !dir.is_dir() {
            return Err(FetchError::InvalidPath(format!("{} is not a directory", relative)));
        }

        let root = self.root.clone();
        let excludes = self.excludes.clone();
        let respect = self.respect_gitignore;
        let entries = tokio::task::spawn_blocking(move || list_blocking(&root, &dir, &excludes, respect))
            .await
            .map_err(|e| FetchError::Io(std::io::Error::other(e)))??;

        debug!("Listed {} local entries in {:?}", entries.len(), relative);
        Ok(entries)
    }

    async fn file_content(&self, _repo: &RepoRef, path: &str) -> Result<String, FetchError> {
        let (relative, file) = self.resolve(path)?;
        match tokio::fs::read_to_string(&file).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::NotFound(relative)),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                Err(FetchError::Decode(format!("{} is not valid UTF-8", relative)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn repo_info(&self, repo: &RepoRef) -> Result<RepoInfo, FetchError> {
        if !self.root.is_dir() {
            return Err(FetchError::NotFound(self.root.display().to_string()));
        }
        Ok(RepoInfo {
            full_name: repo.full_name(),
            description: Some(format!("Local checkout at {}", self.root.display())),
            stars: 0,
            forks: 0,
            language: None,
            default_branch: "local".to_string(),
            html_url: format!("file://{}", self.root.display()),
        })
    }

    fn name(&self) -> &str {
        "Local"
    }
}

/// Repository reference naming a local directory after its last component.
pub fn local_repo_ref(root: &Path) -> RepoRef {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "repository".to_string());
    RepoRef::new("local", name)
}

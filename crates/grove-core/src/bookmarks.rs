//! Bookmarked repositories with tags and folders

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::BookmarkError;
use crate::storage;

pub type Result<T> = std::result::Result<T, BookmarkError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkedRepo {
    pub url: String,
    pub owner: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stars: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forks: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub bookmarked_at: DateTime<Utc>,
    #[serde(default)]
    pub visit_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

impl BookmarkedRepo {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        let owner = owner.into();
        let name = name.into();
        BookmarkedRepo {
            url: format!("https://github.com/{}/{}", owner, name),
            owner,
            name,
            description: None,
            tags: Vec::new(),
            stars: None,
            forks: None,
            language: None,
            bookmarked_at: Utc::now(),
            visit_count: 0,
            folder: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    /// Case-insensitive `owner/name` identity.
    pub fn key(&self) -> String {
        format!("{}/{}", self.owner, self.name).to_lowercase()
    }

    fn matches_text(&self, needle: &str) -> bool {
        self.owner.to_lowercase().contains(needle)
            || self.name.to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle))
            || self.tags.iter().any(|t| t.contains(needle))
    }
}

/// Descriptive fields refreshed from the hosting API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoMetadata {
    pub description: Option<String>,
    pub stars: Option<u64>,
    pub forks: Option<u64>,
    pub language: Option<String>,
}

/// Everything the store persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookmarkSnapshot {
    #[serde(default)]
    pub bookmarks: Vec<BookmarkedRepo>,
    #[serde(default)]
    pub folders: Vec<String>,
}

/// Where a [`BookmarkStore`] reads and writes its snapshot.
pub trait BookmarkBackend: Send + Sync {
    fn load(&self) -> Result<BookmarkSnapshot>;
    fn save(&self, snapshot: &BookmarkSnapshot) -> Result<()>;
}

impl<B: BookmarkBackend + ?Sized> BookmarkBackend for Box<B> {
    fn load(&self) -> Result<BookmarkSnapshot> {
        (**self).load()
    }

    fn save(&self, snapshot: &BookmarkSnapshot) -> Result<()> {
        (**self).save(snapshot)
    }
}

/// Pretty-printed JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileBackend { path: path.into() }
    }

    /// Backend at `<root>/.grove/bookmarks.json`.
    pub fn in_storage(root: &Path) -> Self {
        JsonFileBackend::new(storage::bookmarks_path(root))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BookmarkBackend for JsonFileBackend {
    fn load(&self) -> Result<BookmarkSnapshot> {
        if !self.path.exists() {
            return Ok(BookmarkSnapshot::default());
        }
        let json = std::fs::read_to_string(&self.path)?;
        let snapshot = serde_json::from_str(&json)?;
        debug!("Bookmarks loaded from {}", self.path.display());
        Ok(snapshot)
    }

    fn save(&self, snapshot: &BookmarkSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!("Bookmarks saved to {}", self.path.display());
        Ok(())
    }
}

/// Volatile backend, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    snapshot: Mutex<BookmarkSnapshot>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BookmarkBackend for MemoryBackend {
    fn load(&self) -> Result<BookmarkSnapshot> {
        Ok(self.snapshot.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, snapshot: &BookmarkSnapshot) -> Result<()> {
        *self.snapshot.lock().unwrap_or_else(|e| e.into_inner()) = snapshot.clone();
        Ok(())
    }
}

/// Bookmark collection. Every mutation is written through to the backend.
pub struct BookmarkStore<B: BookmarkBackend> {
    backend: B,
    snapshot: BookmarkSnapshot,
}

impl<B: BookmarkBackend> BookmarkStore<B> {
    pub fn open(backend: B) -> Result<Self> {
        let snapshot = backend.load()?;
        info!("Bookmark store opened with {} bookmarks", snapshot.bookmarks.len());
        Ok(BookmarkStore { backend, snapshot })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Add a bookmark. Returns `false` if the repository is already saved.
    pub fn add(&mut self, mut repo: BookmarkedRepo) -> Result<bool> {
        if self.is_bookmarked(&repo.key()) {
            return Ok(false);
        }
        if let Some(folder) = &repo.folder {
            if !self.snapshot.folders.contains(folder) {
                return Err(BookmarkError::UnknownFolder(folder.clone()));
            }
        }
        repo.tags = normalize_tags(std::mem::take(&mut repo.tags));
        self.snapshot.bookmarks.push(repo);
        self.persist()?;
        Ok(true)
    }

    pub fn remove(&mut self, key: &str) -> Result<bool> {
        let key = key.to_lowercase();
        let before = self.snapshot.bookmarks.len();
        self.snapshot.bookmarks.retain(|b| b.key() != key);
        if self.snapshot.bookmarks.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    pub fn get(&self, key: &str) -> Option<&BookmarkedRepo> {
        let key = key.to_lowercase();
        self.snapshot.bookmarks.iter().find(|b| b.key() == key)
    }

    pub fn is_bookmarked(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Bump the visit counter, returning the new count.
    pub fn record_visit(&mut self, key: &str) -> Result<u32> {
        let repo = self.get_mut(key)?;
        repo.visit_count += 1;
        let count = repo.visit_count;
        self.persist()?;
        Ok(count)
    }

    pub fn set_tags<I, S>(&mut self, key: &str, tags: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.get_mut(key)?.tags = normalize_tags(tags);
        self.persist()
    }

    pub fn update_metadata(&mut self, key: &str, metadata: RepoMetadata) -> Result<()> {
        let repo = self.get_mut(key)?;
        if metadata.description.is_some() {
            repo.description = metadata.description;
        }
        if metadata.stars.is_some() {
            repo.stars = metadata.stars;
        }
        if metadata.forks.is_some() {
            repo.forks = metadata.forks;
        }
        if metadata.language.is_some() {
            repo.language = metadata.language;
        }
        self.persist()
    }

    pub fn create_folder(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if self.snapshot.folders.iter().any(|f| f == name) {
            return Err(BookmarkError::FolderExists(name.to_string()));
        }
        self.snapshot.folders.push(name.to_string());
        self.persist()
    }

    /// Delete a folder; its bookmarks become unfiled.
    pub fn delete_folder(&mut self, name: &str) -> Result<()> {
        let before = self.snapshot.folders.len();
        self.snapshot.folders.retain(|f| f != name);
        if self.snapshot.folders.len() == before {
            return Err(BookmarkError::UnknownFolder(name.to_string()));
        }
        for repo in &mut self.snapshot.bookmarks {
            if repo.folder.as_deref() == Some(name) {
                repo.folder = None;
            }
        }
        self.persist()
    }

    /// File a bookmark under `folder`, or unfile it with `None`.
    pub fn move_to_folder(&mut self, key: &str, folder: Option<&str>) -> Result<()> {
        if let Some(folder) = folder {
            if !self.snapshot.folders.iter().any(|f| f == folder) {
                return Err(BookmarkError::UnknownFolder(folder.to_string()));
            }
        }
        self.get_mut(key)?.folder = folder.map(str::to_string);
        self.persist()
    }

    pub fn list(&self) -> &[BookmarkedRepo] {
        &self.snapshot.bookmarks
    }

    pub fn folders(&self) -> &[String] {
        &self.snapshot.folders
    }

    pub fn by_tag(&self, tag: &str) -> Vec<&BookmarkedRepo> {
        let tag = tag.trim().to_lowercase();
        self.snapshot
            .bookmarks
            .iter()
            .filter(|b| b.tags.contains(&tag))
            .collect()
    }

    pub fn in_folder(&self, folder: Option<&str>) -> Vec<&BookmarkedRepo> {
        self.snapshot
            .bookmarks
            .iter()
            .filter(|b| b.folder.as_deref() == folder)
            .collect()
    }

    /// Case-insensitive match on owner, name, description and tags.
    pub fn search(&self, text: &str) -> Vec<&BookmarkedRepo> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return self.snapshot.bookmarks.iter().collect();
        }
        self.snapshot
            .bookmarks
            .iter()
            .filter(|b| b.matches_text(&needle))
            .collect()
    }

    pub fn all_tags(&self) -> BTreeSet<String> {
        self.snapshot
            .bookmarks
            .iter()
            .flat_map(|b| b.tags.iter().cloned())
            .collect()
    }

    pub fn most_visited(&self, limit: usize) -> Vec<&BookmarkedRepo> {
        let mut repos: Vec<&BookmarkedRepo> = self.snapshot.bookmarks.iter().collect();
        repos.sort_by(|a, b| b.visit_count.cmp(&a.visit_count));
        repos.truncate(limit);
        repos
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot)?)
    }

    /// Merge an exported document. Existing bookmarks win over imported
    /// ones with the same key. Returns how many bookmarks were added.
    pub fn import_json(&mut self, json: &str) -> Result<usize> {
        let incoming: BookmarkSnapshot = serde_json::from_str(json)?;
        for folder in incoming.folders {
            if !self.snapshot.folders.contains(&folder) {
                self.snapshot.folders.push(folder);
            }
        }
        let mut added = 0;
        for mut repo in incoming.bookmarks {
            if self.is_bookmarked(&repo.key()) {
                continue;
            }
            if let Some(folder) = &repo.folder {
                if !self.snapshot.folders.contains(folder) {
                    self.snapshot.folders.push(folder.clone());
                }
            }
            repo.tags = normalize_tags(std::mem::take(&mut repo.tags));
            self.snapshot.bookmarks.push(repo);
            added += 1;
        }
        self.persist()?;
        info!("Imported {} bookmarks", added);
        Ok(added)
    }

    fn get_mut(&mut self, key: &str) -> Result<&mut BookmarkedRepo> {
        let wanted = key.to_lowercase();
        self.snapshot
            .bookmarks
            .iter_mut()
            .find(|b| b.key() == wanted)
            .ok_or_else(|| BookmarkError::NotFound(key.to_string()))
    }

    fn persist(&self) -> Result<()> {
        self.backend.save(&self.snapshot)
    }
}

/// Trimmed, lower-cased, de-duplicated, first occurrence kept.
fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.into().trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

//! Directory listing cache for avoiding redundant API calls

use std::time::{Duration, Instant};

use dashmap::DashMap;
use grove_core::DirEntry;

use crate::reference::RepoRef;

/// Default lifetime of a cached listing.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Cache entry with expiration
#[derive(Debug, Clone)]
struct CacheEntry {
    entries: Vec<DirEntry>,
    timestamp: Instant,
}

/// Key for cache lookups
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct CacheKey {
    repo: String,
    path: String,
}

impl CacheKey {
    fn new(repo: &RepoRef, path: &str) -> Self {
        CacheKey {
            repo: repo.full_name().to_lowercase(),
            path: path.trim_matches('/').to_string(),
        }
    }
}

/// Listings keyed by repository and directory path. Safe to share between
/// overlapping fetches.
#[derive(Debug)]
pub struct ListingCache {
    entries: DashMap<CacheKey, CacheEntry>,
    ttl: Duration,
}

impl Default for ListingCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ListingCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Get a cached listing if present and not expired
    pub fn get(&self, repo: &RepoRef, path: &str) -> Option<Vec<DirEntry>> {
        let key = CacheKey::new(repo, path);
        let entry = self.entries.get(&key)?;
        if entry.timestamp.elapsed() > self.ttl {
            drop(entry);
            self.entries.remove(&key);
            return None;
        }
        Some(entry.entries.clone())
    }

    pub fn insert(&self, repo: &RepoRef, path: &str, entries: Vec<DirEntry>) {
        self.entries.insert(
            CacheKey::new(repo, path),
            CacheEntry {
                entries,
                timestamp: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, repo: &RepoRef, path: &str) {
        self.entries.remove(&CacheKey::new(repo, path));
    }

    /// Clear expired entries
    pub fn cleanup_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.timestamp.elapsed() <= ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Lazy loading of a FileTree from a content provider

use std::sync::Arc;

use grove_core::{DirEntry, FileTree, NodeId, TreeError};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::ListingCache;
use crate::provider::{ContentProvider, FetchError};
use crate::reference::RepoRef;

/// What happened to one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum LoadOutcome {
    Loaded { children: usize },
    AlreadyLoaded,
    /// The directory now has no children and carries a failure flag.
    Failed { error: String },
}

impl LoadOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, LoadOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrefetchReport {
    pub loaded: usize,
    pub failed: usize,
}

/// Applies provider listings to a tree. Fetch failures never surface as
/// errors here: they mark the directory and are reported as
/// [`LoadOutcome::Failed`].
///
/// Clones share the provider and the listing cache, so a clone can fetch
/// while the tree itself is owned elsewhere.
#[derive(Clone)]
pub struct TreeLoader {
    provider: Arc<dyn ContentProvider>,
    cache: Arc<ListingCache>,
    repo: RepoRef,
}

impl TreeLoader {
    pub fn new(provider: Arc<dyn ContentProvider>, repo: RepoRef) -> Self {
        Self {
            provider,
            cache: Arc::new(ListingCache::default()),
            repo,
        }
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    pub fn provider(&self) -> &Arc<dyn ContentProvider> {
        &self.provider
    }

    /// Fetch a listing, served from the cache when fresh.
    pub async fn fetch_listing(&self, path: &str) -> Result<Vec<DirEntry>, FetchError> {
        if let Some(entries) = self.cache.get(&self.repo, path) {
            debug!("Listing cache hit for {:?}", path);
            return Ok(entries);
        }
        self.cache.cleanup_expired();
        let entries = self.provider.list_dir(&self.repo, path).await?;
        self.cache.insert(&self.repo, path, entries.clone());
        Ok(entries)
    }

    /// Write a fetch result into the tree.
    pub fn apply(
        &self,
        tree: &mut FileTree,
        id: NodeId,
        listing: Result<Vec<DirEntry>, FetchError>,
    ) -> Result<LoadOutcome, TreeError> {
        match listing {
            Ok(entries) => {
                let children = tree.set_children(id, entries)?;
                Ok(LoadOutcome::Loaded {
                    children: children.len(),
                })
            }
            Err(e) => {
                let path = tree.get(id).map(|n| n.path.clone()).unwrap_or_default();
                warn!("Failed to load {:?} from {}: {}", path, self.repo, e);
                tree.mark_load_failed(id)?;
                Ok(LoadOutcome::Failed { error: e.to_string() })
            }
        }
    }

    /// Fresh tree with the root listing applied.
    pub async fn load_root(&self) -> (FileTree, LoadOutcome) {
        let mut tree = FileTree::new(self.repo.name.clone());
        let root = tree.root();
        let listing = self.fetch_listing("").await;
        let outcome = match self.apply(&mut tree, root, listing) {
            Ok(outcome) => outcome,
            Err(e) => LoadOutcome::Failed { error: e.to_string() },
        };
        info!("Loaded root of {} ({:?})", self.repo, outcome);
        (tree, outcome)
    }

    /// Path of `id` if it needs a fetch, `None` when it is already loaded.
    /// A loaded directory is refetched only when `force` (which also drops
    /// its cached listing) or when its last fetch failed.
    pub fn pending_path(&self, tree: &FileTree, id: NodeId, force: bool) -> Result<Option<String>, TreeError> {
        let node = tree.get(id).ok_or(TreeError::UnknownNode(id))?;
        if !node.is_dir() {
            return Err(TreeError::NotADirectory(id));
        }
        if node.is_loaded() && !force && !tree.load_failed(id) {
            return Ok(None);
        }
        if force {
            self.cache.invalidate(&self.repo, &node.path);
        }
        Ok(Some(node.path.clone()))
    }

    /// Load a directory's children. An already-loaded directory is left
    /// alone unless `force`, which also bypasses the listing cache.
    pub async fn expand(&self, tree: &mut FileTree, id: NodeId, force: bool) -> Result<LoadOutcome, TreeError> {
        let Some(path) = self.pending_path(tree, id, force)? else {
            return Ok(LoadOutcome::AlreadyLoaded);
        };
        let listing = self.fetch_listing(&path).await;
        self.apply(tree, id, listing)
    }

    /// Load every unloaded directory at depth `max_depth` or above, level
    /// by level. Root children are at depth 1.
    pub async fn prefetch(&self, tree: &mut FileTree, max_depth: u32) -> PrefetchReport {
        let mut report = PrefetchReport::default();
        loop {
            let pending: Vec<NodeId> = tree
                .unloaded_directories()
                .into_iter()
                .filter(|&id| tree.get(id).is_some_and(|n| n.depth <= max_depth))
                .collect();
            if pending.is_empty() {
                break;
            }

            for id in pending {
                match self.expand(tree, id, false).await {
                    Ok(LoadOutcome::Failed { .. }) | Err(_) => report.failed += 1,
                    Ok(_) => report.loaded += 1,
                }
            }
        }
        debug!("Prefetch to depth {}: {:?}", max_depth, report);
        report
    }
}

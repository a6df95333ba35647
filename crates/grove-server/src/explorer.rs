//! One opened repository: tree, search index, layout and content loading

use std::sync::Arc;

use grove_core::search::{SizeStats, Suggestion};
use grove_core::{
    analyze, DirEntry, FileTree, GraphLayout, LayoutError, LayoutSnapshot, NodeId, RepoAnalysis, SearchEngine,
    SearchError, SearchOptions, SearchResult, TreeError, Viewport, VisibilityMode,
};
use grove_provider::{ContentProvider, FetchError, LoadOutcome, RepoInfo, RepoRef, TreeLoader};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("no such file in the loaded tree: {0}")]
    UnknownPath(String),
    #[error("{0} is a directory")]
    NotAFile(String),
    /// The repository or directory changed while a fetch was in flight.
    #[error("{0} changed while it was being fetched")]
    Superseded(String),
}

/// Knobs applied to every opened repository.
#[derive(Debug, Clone, Copy)]
pub struct ExplorerSettings {
    pub viewport: Viewport,
    pub max_results: usize,
    /// Directory levels loaded eagerly after the root listing.
    pub prefetch_depth: u32,
}

impl Default for ExplorerSettings {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            max_results: grove_core::search::DEFAULT_MAX_RESULTS,
            prefetch_depth: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub file_types: BTreeMap<String, usize>,
    pub languages: BTreeMap<String, usize>,
    pub size: SizeStats,
}

pub struct Explorer {
    repo: RepoRef,
    info: RepoInfo,
    loader: TreeLoader,
    tree: FileTree,
    engine: SearchEngine,
    layout: GraphLayout,
}

impl Explorer {
    /// Fetch repository metadata and the root listing, then prefetch
    /// `settings.prefetch_depth` levels. Only the metadata request can fail;
    /// listing failures leave flagged directories behind.
    pub async fn open(
        provider: Arc<dyn ContentProvider>,
        repo: RepoRef,
        settings: ExplorerSettings,
    ) -> Result<Self, FetchError> {
        let info = provider.repo_info(&repo).await?;
        let loader = TreeLoader::new(provider, repo.clone());
        let (mut tree, outcome) = loader.load_root().await;
        if outcome.is_failed() {
            warn!("Root listing of {} failed", repo);
        } else if settings.prefetch_depth > 0 {
            loader.prefetch(&mut tree, settings.prefetch_depth).await;
        }

        let mut engine = SearchEngine::new();
        engine.update_files(&tree);
        let layout = GraphLayout::new(&tree, settings.viewport, VisibilityMode::Progressive);
        info!("Opened {} with {} files", repo, engine.file_count());

        Ok(Self {
            repo,
            info,
            loader,
            tree,
            engine,
            layout,
        })
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    pub fn info(&self) -> &RepoInfo {
        &self.info
    }

    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    pub fn engine(&self) -> &SearchEngine {
        &self.engine
    }

    pub fn layout(&self) -> &GraphLayout {
        &self.layout
    }

    pub fn provider(&self) -> &Arc<dyn ContentProvider> {
        self.loader.provider()
    }

    /// Decide whether `id` needs a fetch. The returned [`PendingListing`]
    /// owns everything it needs, so the caller can await it without holding
    /// on to the explorer.
    pub fn begin_expand(&self, id: NodeId, force: bool) -> Result<ExpandStep, ExplorerError> {
        let step = match self.loader.pending_path(&self.tree, id, force)? {
            None => ExpandStep::Done(LoadOutcome::AlreadyLoaded),
            Some(path) => ExpandStep::Fetch(PendingListing {
                loader: self.loader.clone(),
                id,
                path,
                force,
            }),
        };
        Ok(step)
    }

    /// Apply a fetched listing and refresh everything derived from the tree.
    /// A forced reload also drops cached file text below the directory.
    pub fn finish_expand(&mut self, fetched: FetchedListing) -> Result<LoadOutcome, ExplorerError> {
        if fetched.repo != self.repo {
            return Err(ExplorerError::Superseded(fetched.repo.full_name()));
        }
        let node = self.tree.get(fetched.id).ok_or(TreeError::UnknownNode(fetched.id))?;
        if node.path != fetched.path {
            return Err(ExplorerError::Superseded(fetched.path));
        }

        let outcome = self.loader.apply(&mut self.tree, fetched.id, fetched.listing)?;
        if fetched.force {
            self.engine.invalidate_content(&fetched.path);
        }
        self.refresh();
        Ok(outcome)
    }

    /// Load a directory in one go, for callers that own the explorer.
    pub async fn expand(&mut self, id: NodeId, force: bool) -> Result<LoadOutcome, ExplorerError> {
        match self.begin_expand(id, force)? {
            ExpandStep::Done(outcome) => Ok(outcome),
            ExpandStep::Fetch(pending) => {
                let fetched = pending.fetch().await;
                self.finish_expand(fetched)
            }
        }
    }

    /// Cached text of a file, or what to fetch for it.
    pub fn begin_load_file(&self, path: &str) -> Result<FileStep, ExplorerError> {
        let id = self
            .tree
            .find_by_path(path)
            .ok_or_else(|| ExplorerError::UnknownPath(path.to_string()))?;
        let node = self.tree.get(id).ok_or(TreeError::UnknownNode(id))?;
        if node.is_dir() {
            return Err(ExplorerError::NotAFile(node.path.clone()));
        }

        if let Some(content) = self.engine.cached_content(&node.path) {
            return Ok(FileStep::Cached(content.to_string()));
        }
        Ok(FileStep::Fetch(PendingFile {
            provider: Arc::clone(self.loader.provider()),
            repo: self.repo.clone(),
            path: node.path.clone(),
        }))
    }

    /// Cache fetched text, which also makes it searchable.
    pub fn finish_load_file(&mut self, fetched: FetchedFile) -> Result<String, ExplorerError> {
        let content = fetched.content?;
        if fetched.repo != self.repo || self.tree.find_by_path(&fetched.path).is_none() {
            return Err(ExplorerError::Superseded(fetched.path));
        }
        self.engine.update_file_content(&fetched.path, &content);
        debug!("Cached {} bytes of {}", content.len(), fetched.path);
        Ok(content)
    }

    /// File text, fetched once and then served from the search engine's
    /// content cache.
    pub async fn load_file(&mut self, path: &str) -> Result<String, ExplorerError> {
        match self.begin_load_file(path)? {
            FileStep::Cached(content) => Ok(content),
            FileStep::Fetch(pending) => {
                let fetched = pending.fetch().await;
                self.finish_load_file(fetched)
            }
        }
    }

    pub fn search(&self, options: &SearchOptions) -> Result<Vec<SearchResult>, SearchError> {
        self.engine.search(options)
    }

    pub fn suggest(&self, query: &str, limit: usize) -> Vec<Suggestion> {
        self.engine.suggest(query, limit)
    }

    pub fn stats(&self) -> Stats {
        Stats {
            file_types: self.engine.file_type_stats(),
            languages: self.engine.language_stats(),
            size: self.engine.size_stats(),
        }
    }

    pub fn analysis(&self) -> RepoAnalysis {
        analyze(&self.tree, &self.engine)
    }

    pub fn graph(&self) -> LayoutSnapshot {
        self.layout.snapshot()
    }

    pub fn resize(&mut self, viewport: Viewport) {
        if viewport != self.layout.viewport() {
            self.layout.resize(viewport);
        }
    }

    pub fn set_mode(&mut self, mode: VisibilityMode) {
        self.layout.set_mode(mode);
    }

    pub fn toggle(&mut self, id: NodeId) -> Result<bool, LayoutError> {
        self.layout.toggle_expansion(id)
    }

    fn refresh(&mut self) {
        self.engine.update_files(&self.tree);
        self.layout.rebuild(&self.tree);
    }
}

pub enum ExpandStep {
    Done(LoadOutcome),
    Fetch(PendingListing),
}

/// A directory listing still to be fetched.
pub struct PendingListing {
    loader: TreeLoader,
    id: NodeId,
    path: String,
    force: bool,
}

impl PendingListing {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn fetch(self) -> FetchedListing {
        let listing = self.loader.fetch_listing(&self.path).await;
        FetchedListing {
            repo: self.loader.repo().clone(),
            id: self.id,
            path: self.path,
            force: self.force,
            listing,
        }
    }
}

pub struct FetchedListing {
    repo: RepoRef,
    id: NodeId,
    path: String,
    force: bool,
    listing: Result<Vec<DirEntry>, FetchError>,
}

pub enum FileStep {
    Cached(String),
    Fetch(PendingFile),
}

/// File text still to be fetched.
pub struct PendingFile {
    provider: Arc<dyn ContentProvider>,
    repo: RepoRef,
    path: String,
}

impl PendingFile {
    pub async fn fetch(self) -> FetchedFile {
        let content = self.provider.file_content(&self.repo, &self.path).await;
        FetchedFile {
            repo: self.repo,
            path: self.path,
            content,
        }
    }
}

pub struct FetchedFile {
    repo: RepoRef,
    path: String,
    content: Result<String, FetchError>,
}

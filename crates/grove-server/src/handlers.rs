//! REST API handlers for the Grove server

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use axum_extra::extract::Query as MultiQuery;
use grove_core::search::{SizeRange, Suggestion};
use grove_core::{
    BookmarkError, BookmarkedRepo, LayoutError, LayoutSnapshot, NestedNode, NodeId, RepoAnalysis,
    SearchError, SearchFilters, SearchOptions, SearchResult, TreeError, Viewport, VisibilityMode,
};
use grove_provider::{FetchError, LoadOutcome, RateLimitStatus, RepoInfo, RepoRef, RepoRefError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::explorer::{ExpandStep, Explorer, ExplorerError, FileStep, Stats};
use crate::highlight::{highlight_html, syntax_name, DEFAULT_THEME};
use crate::websocket::WsMessage;
use crate::ServerState;

/// Error returned by every handler, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    NoRepository,
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    RateLimited(String),
    Upstream(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NoRepository => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::NoRepository => "no repository is open".to_string(),
            ApiError::BadRequest(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::RateLimited(m)
            | ApiError::Upstream(m)
            | ApiError::Internal(m) => m.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("{}: {}", status, self.message());
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::NotFound(_) => ApiError::NotFound(e.to_string()),
            FetchError::RateLimited { .. } => ApiError::RateLimited(e.to_string()),
            FetchError::InvalidPath(_) => ApiError::BadRequest(e.to_string()),
            FetchError::Io(_) => ApiError::Internal(e.to_string()),
            _ => ApiError::Upstream(e.to_string()),
        }
    }
}

impl From<TreeError> for ApiError {
    fn from(e: TreeError) -> Self {
        match e {
            TreeError::UnknownNode(_) => ApiError::NotFound(e.to_string()),
            _ => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<LayoutError> for ApiError {
    fn from(e: LayoutError) -> Self {
        match e {
            LayoutError::UnknownNode(_) => ApiError::NotFound(e.to_string()),
            LayoutError::NotADirectory(_) => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<RepoRefError> for ApiError {
    fn from(e: RepoRefError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<ExplorerError> for ApiError {
    fn from(e: ExplorerError) -> Self {
        match e {
            ExplorerError::Fetch(e) => e.into(),
            ExplorerError::Tree(e) => e.into(),
            ExplorerError::Search(e) => e.into(),
            ExplorerError::Layout(e) => e.into(),
            ExplorerError::UnknownPath(_) => ApiError::NotFound(e.to_string()),
            ExplorerError::NotAFile(_) => ApiError::BadRequest(e.to_string()),
            ExplorerError::Superseded(_) => ApiError::Conflict(e.to_string()),
        }
    }
}

impl From<BookmarkError> for ApiError {
    fn from(e: BookmarkError) -> Self {
        match e {
            BookmarkError::NotFound(_) | BookmarkError::UnknownFolder(_) => ApiError::NotFound(e.to_string()),
            BookmarkError::FolderExists(_) => ApiError::Conflict(e.to_string()),
            BookmarkError::Malformed(_) => ApiError::BadRequest(e.to_string()),
            BookmarkError::Io(_) => ApiError::Internal(e.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

fn require(explorer: &Option<Explorer>) -> Result<&Explorer, ApiError> {
    explorer.as_ref().ok_or(ApiError::NoRepository)
}

fn require_mut(explorer: &mut Option<Explorer>) -> Result<&mut Explorer, ApiError> {
    explorer.as_mut().ok_or(ApiError::NoRepository)
}

fn announce_tree(state: &ServerState, explorer: &Explorer) {
    let event = WsMessage::TreeUpdated {
        repo: explorer.repo().full_name(),
        files: explorer.engine().file_count(),
    };
    if let Ok(text) = serde_json::to_string(&event) {
        // No subscribers is fine.
        let _ = state.broadcast(text);
    }
}

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub provider: String,
    pub repository: Option<String>,
    pub rate_limit: Option<RateLimitStatus>,
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let repository = state.explorer.read().await.as_ref().map(|e| e.repo().full_name());
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider: state.provider.name().to_string(),
        repository,
        rate_limit: state.provider.rate_limit(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenRepoRequest {
    pub repo: String,
    #[serde(default)]
    pub prefetch_depth: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSummary {
    pub repo: RepoRef,
    pub info: RepoInfo,
    pub files: usize,
    pub directories: usize,
    pub unloaded_directories: usize,
    pub failed_directories: usize,
    pub bookmarked: bool,
}

impl RepoSummary {
    fn new(explorer: &Explorer, bookmarked: bool) -> Self {
        let tree = explorer.tree();
        Self {
            repo: explorer.repo().clone(),
            info: explorer.info().clone(),
            files: explorer.engine().file_count(),
            directories: tree.iter().filter(|n| n.is_dir() && n.id != tree.root()).count(),
            unloaded_directories: tree.unloaded_directories().len(),
            failed_directories: tree.failed_directories().len(),
            bookmarked,
        }
    }
}

/// Open a repository, replacing the current one.
pub async fn open_repo(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<OpenRepoRequest>,
) -> ApiResult<RepoSummary> {
    let repo = RepoRef::parse(&request.repo)?;
    let mut settings = state.settings;
    if let Some(depth) = request.prefetch_depth {
        settings.prefetch_depth = depth;
    }

    let explorer = Explorer::open(Arc::clone(&state.provider), repo.clone(), settings).await?;

    let bookmarked = {
        let mut bookmarks = state.bookmarks.lock().await;
        let key = repo.full_name();
        if bookmarks.is_bookmarked(&key) {
            if let Err(e) = bookmarks.record_visit(&key) {
                warn!("Failed to record visit for {}: {}", key, e);
            }
            if let Err(e) = bookmarks.update_metadata(&key, explorer.info().metadata()) {
                warn!("Failed to refresh bookmark metadata for {}: {}", key, e);
            }
            true
        } else {
            false
        }
    };

    let summary = RepoSummary::new(&explorer, bookmarked);
    let mut guard = state.explorer.write().await;
    let explorer = guard.insert(explorer);
    // Subscribers that react to the event must find the new explorer.
    announce_tree(&state, explorer);
    drop(guard);
    info!("Repository {} is now open", repo);
    Ok(Json(summary))
}

pub async fn get_repo(State(state): State<Arc<ServerState>>) -> ApiResult<RepoSummary> {
    let guard = state.explorer.read().await;
    let explorer = require(&guard)?;
    let bookmarked = state.bookmarks.lock().await.is_bookmarked(&explorer.repo().full_name());
    Ok(Json(RepoSummary::new(explorer, bookmarked)))
}

pub async fn get_tree(State(state): State<Arc<ServerState>>) -> ApiResult<NestedNode> {
    let guard = state.explorer.read().await;
    let explorer = require(&guard)?;
    explorer
        .tree()
        .to_nested()
        .map(Json)
        .ok_or_else(|| ApiError::Internal("tree has no root".to_string()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExpandParams {
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct ExpandResponse {
    pub outcome: LoadOutcome,
    pub tree: Option<NestedNode>,
}

/// Load a directory's children.
pub async fn expand_directory(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<u32>,
    Query(params): Query<ExpandParams>,
) -> ApiResult<ExpandResponse> {
    let step = require(&*state.explorer.read().await)?.begin_expand(NodeId(id), params.force)?;
    let pending = match step {
        ExpandStep::Fetch(pending) => pending,
        ExpandStep::Done(outcome) => {
            let guard = state.explorer.read().await;
            return Ok(Json(ExpandResponse {
                outcome,
                tree: require(&guard)?.tree().to_nested(),
            }));
        }
    };

    debug!("Fetching {:?}", pending.path());
    let fetched = pending.fetch().await;

    let mut guard = state.explorer.write().await;
    let explorer = require_mut(&mut guard)?;
    let outcome = explorer.finish_expand(fetched)?;
    if outcome != LoadOutcome::AlreadyLoaded {
        announce_tree(&state, explorer);
    }
    Ok(Json(ExpandResponse {
        outcome,
        tree: explorer.tree().to_nested(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct FileParams {
    pub path: String,
    #[serde(default)]
    pub theme: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub path: String,
    pub language: String,
    pub syntax: String,
    pub lines: usize,
    pub content: String,
    pub html: Option<String>,
}

/// Cached file text, or a provider fetch made without holding the explorer
/// lock.
async fn fetch_file(state: &ServerState, path: &str) -> Result<String, ApiError> {
    let step = require(&*state.explorer.read().await)?.begin_load_file(path)?;
    let pending = match step {
        FileStep::Cached(content) => return Ok(content),
        FileStep::Fetch(pending) => pending,
    };
    let fetched = pending.fetch().await;
    let mut guard = state.explorer.write().await;
    Ok(require_mut(&mut guard)?.finish_load_file(fetched)?)
}

/// File contents with highlighted HTML.
pub async fn get_file(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<FileParams>,
) -> ApiResult<FileResponse> {
    let content = fetch_file(&state, &params.path).await?;

    let guard = state.explorer.read().await;
    let tree = require(&guard)?.tree();
    let language = tree
        .find_by_path(&params.path)
        .and_then(|id| tree.get(id))
        .map(|n| n.language().name().to_string())
        .unwrap_or_else(|| "other".to_string());
    drop(guard);
    let theme = params.theme.as_deref().unwrap_or(DEFAULT_THEME);

    Ok(Json(FileResponse {
        syntax: syntax_name(&params.path, &content),
        html: highlight_html(&params.path, &content, theme),
        lines: content.lines().count(),
        path: params.path,
        language,
        content,
    }))
}

/// File contents as-is, with a guessed content type.
pub async fn get_raw(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<FileParams>,
) -> Result<Response, ApiError> {
    let content = fetch_file(&state, &params.path).await?;
    let mime = mime_guess::from_path(&params.path).first_or_text_plain();
    Ok(([(header::CONTENT_TYPE, mime.essence_str().to_string())], content).into_response())
}

/// Query-string search: `?q=&type=ts&type=tsx&language=rust&regex=true`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub q: String,
    #[serde(rename = "type")]
    pub types: Vec<String>,
    #[serde(rename = "language")]
    pub languages: Vec<String>,
    pub regex: bool,
    pub case: bool,
    pub content: bool,
    pub max: Option<usize>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
}

impl SearchParams {
    pub fn into_options(self, default_max: usize) -> SearchOptions {
        let size_range = match (self.min_size, self.max_size) {
            (None, None) => None,
            (min, max) => Some(SizeRange {
                min: min.unwrap_or(0),
                max: max.unwrap_or(u64::MAX),
            }),
        };
        SearchOptions::new(self.q)
            .regex(self.regex)
            .case_sensitive(self.case)
            .max_results(self.max.unwrap_or(default_max))
            .filters(SearchFilters {
                file_types: self.types,
                languages: self.languages,
                size_range,
                include_content: self.content,
            })
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub total: usize,
    pub results: Vec<SearchResult>,
}

async fn run_search(state: &ServerState, options: SearchOptions) -> ApiResult<SearchResponse> {
    let guard = state.explorer.read().await;
    let explorer = require(&guard)?;
    let results = explorer.search(&options)?;
    debug!("Search {:?}: {} results", options.query, results.len());
    Ok(Json(SearchResponse {
        query: options.query,
        total: results.len(),
        results,
    }))
}

pub async fn search_query(
    State(state): State<Arc<ServerState>>,
    MultiQuery(params): MultiQuery<SearchParams>,
) -> ApiResult<SearchResponse> {
    let options = params.into_options(state.settings.max_results);
    run_search(&state, options).await
}

pub async fn search_body(
    State(state): State<Arc<ServerState>>,
    Json(options): Json<SearchOptions>,
) -> ApiResult<SearchResponse> {
    run_search(&state, options).await
}

#[derive(Debug, Deserialize)]
pub struct SuggestParams {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_suggest_limit")]
    pub limit: usize,
}

fn default_suggest_limit() -> usize {
    10
}

pub async fn suggest(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<SuggestParams>,
) -> ApiResult<Vec<Suggestion>> {
    let guard = state.explorer.read().await;
    Ok(Json(require(&guard)?.suggest(&params.q, params.limit)))
}

pub async fn get_stats(State(state): State<Arc<ServerState>>) -> ApiResult<Stats> {
    let guard = state.explorer.read().await;
    Ok(Json(require(&guard)?.stats()))
}

pub async fn get_analysis(State(state): State<Arc<ServerState>>) -> ApiResult<RepoAnalysis> {
    let guard = state.explorer.read().await;
    Ok(Json(require(&guard)?.analysis()))
}

#[derive(Debug, Default, Deserialize)]
pub struct GraphParams {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

/// Current layout; `width`/`height` resize the viewport first.
pub async fn get_graph(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<GraphParams>,
) -> ApiResult<LayoutSnapshot> {
    let mut guard = state.explorer.write().await;
    let explorer = require_mut(&mut guard)?;
    if let (Some(width), Some(height)) = (params.width, params.height) {
        if width <= 0.0 || height <= 0.0 {
            return Err(ApiError::BadRequest("viewport must be positive".to_string()));
        }
        explorer.resize(Viewport::new(width, height));
    }
    Ok(Json(explorer.graph()))
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: VisibilityMode,
}

pub async fn set_graph_mode(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<ModeRequest>,
) -> ApiResult<LayoutSnapshot> {
    let mut guard = state.explorer.write().await;
    let explorer = require_mut(&mut guard)?;
    explorer.set_mode(request.mode);
    Ok(Json(explorer.graph()))
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub id: NodeId,
    pub expanded: bool,
    pub graph: LayoutSnapshot,
}

pub async fn toggle_node(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<u32>,
) -> ApiResult<ToggleResponse> {
    let mut guard = state.explorer.write().await;
    let explorer = require_mut(&mut guard)?;
    let expanded = explorer.toggle(NodeId(id))?;
    Ok(Json(ToggleResponse {
        id: NodeId(id),
        expanded,
        graph: explorer.graph(),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BookmarkParams {
    pub q: Option<String>,
    pub tag: Option<String>,
    pub folder: Option<String>,
    pub unfiled: bool,
    /// `visits` orders by visit count.
    pub sort: Option<String>,
    pub limit: Option<usize>,
}

pub async fn list_bookmarks(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<BookmarkParams>,
) -> ApiResult<Vec<BookmarkedRepo>> {
    let store = state.bookmarks.lock().await;
    let mut repos: Vec<&BookmarkedRepo> = match params.q.as_deref() {
        Some(text) => store.search(text),
        None => store.list().iter().collect(),
    };
    if let Some(tag) = params.tag.as_deref() {
        let tagged: Vec<String> = store.by_tag(tag).iter().map(|b| b.key()).collect();
        repos.retain(|b| tagged.contains(&b.key()));
    }
    if params.unfiled {
        repos.retain(|b| b.folder.is_none());
    } else if let Some(folder) = params.folder.as_deref() {
        let filed: Vec<String> = store.in_folder(Some(folder)).iter().map(|b| b.key()).collect();
        repos.retain(|b| filed.contains(&b.key()));
    }
    if params.sort.as_deref() == Some("visits") {
        repos.sort_by(|a, b| b.visit_count.cmp(&a.visit_count));
    }
    if let Some(limit) = params.limit {
        repos.truncate(limit);
    }
    Ok(Json(repos.into_iter().cloned().collect()))
}

#[derive(Debug, Deserialize)]
pub struct AddBookmarkRequest {
    pub repo: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Save a repository. Metadata is copied from the open repository when it
/// is the same one.
pub async fn add_bookmark(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<AddBookmarkRequest>,
) -> Result<(StatusCode, Json<BookmarkedRepo>), ApiError> {
    let repo = RepoRef::parse(&request.repo)?;
    let mut bookmark = BookmarkedRepo::new(&repo.owner, &repo.name).with_tags(request.tags);
    bookmark.folder = request.folder;

    if let Some(explorer) = state.explorer.read().await.as_ref() {
        if explorer.repo().full_name().eq_ignore_ascii_case(&repo.full_name()) {
            let metadata = explorer.info().metadata();
            bookmark.description = metadata.description;
            bookmark.stars = metadata.stars;
            bookmark.forks = metadata.forks;
            bookmark.language = metadata.language;
        }
    }
    if let Some(description) = request.description {
        bookmark.description = Some(description);
    }

    let mut store = state.bookmarks.lock().await;
    if !store.add(bookmark.clone())? {
        return Err(ApiError::Conflict(format!("{} is already bookmarked", repo)));
    }
    let saved = store.get(&bookmark.key()).cloned().unwrap_or(bookmark);
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn get_bookmark(
    State(state): State<Arc<ServerState>>,
    Path((owner, name)): Path<(String, String)>,
) -> ApiResult<BookmarkedRepo> {
    let key = format!("{}/{}", owner, name);
    let store = state.bookmarks.lock().await;
    store
        .get(&key)
        .cloned()
        .map(Json)
        .ok_or_else(|| BookmarkError::NotFound(key).into())
}

pub async fn remove_bookmark(
    State(state): State<Arc<ServerState>>,
    Path((owner, name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let key = format!("{}/{}", owner, name);
    if state.bookmarks.lock().await.remove(&key)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(BookmarkError::NotFound(key).into())
    }
}

pub async fn visit_bookmark(
    State(state): State<Arc<ServerState>>,
    Path((owner, name)): Path<(String, String)>,
) -> ApiResult<serde_json::Value> {
    let key = format!("{}/{}", owner, name);
    let visits = state.bookmarks.lock().await.record_visit(&key)?;
    Ok(Json(json!({ "visitCount": visits })))
}

#[derive(Debug, Deserialize)]
pub struct TagsRequest {
    pub tags: Vec<String>,
}

pub async fn set_bookmark_tags(
    State(state): State<Arc<ServerState>>,
    Path((owner, name)): Path<(String, String)>,
    Json(request): Json<TagsRequest>,
) -> ApiResult<BookmarkedRepo> {
    let key = format!("{}/{}", owner, name);
    let mut store = state.bookmarks.lock().await;
    store.set_tags(&key, request.tags)?;
    store
        .get(&key)
        .cloned()
        .map(Json)
        .ok_or_else(|| BookmarkError::NotFound(key).into())
}

#[derive(Debug, Deserialize)]
pub struct FolderAssignment {
    #[serde(default)]
    pub folder: Option<String>,
}

pub async fn move_bookmark(
    State(state): State<Arc<ServerState>>,
    Path((owner, name)): Path<(String, String)>,
    Json(request): Json<FolderAssignment>,
) -> ApiResult<BookmarkedRepo> {
    let key = format!("{}/{}", owner, name);
    let mut store = state.bookmarks.lock().await;
    store.move_to_folder(&key, request.folder.as_deref())?;
    store
        .get(&key)
        .cloned()
        .map(Json)
        .ok_or_else(|| BookmarkError::NotFound(key).into())
}

pub async fn list_tags(State(state): State<Arc<ServerState>>) -> ApiResult<Vec<String>> {
    let store = state.bookmarks.lock().await;
    Ok(Json(store.all_tags().into_iter().collect()))
}

pub async fn list_folders(State(state): State<Arc<ServerState>>) -> ApiResult<Vec<String>> {
    let store = state.bookmarks.lock().await;
    Ok(Json(store.folders().to_vec()))
}

#[derive(Debug, Deserialize)]
pub struct FolderRequest {
    pub name: String,
}

pub async fn create_folder(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<FolderRequest>,
) -> Result<(StatusCode, Json<Vec<String>>), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::BadRequest("folder name is empty".to_string()));
    }
    let mut store = state.bookmarks.lock().await;
    store.create_folder(&request.name)?;
    Ok((StatusCode::CREATED, Json(store.folders().to_vec())))
}

pub async fn delete_folder(
    State(state): State<Arc<ServerState>>,
    Path(folder): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.bookmarks.lock().await.delete_folder(&folder)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn export_bookmarks(State(state): State<Arc<ServerState>>) -> Result<Response, ApiError> {
    let json = state.bookmarks.lock().await.export_json()?;
    Ok(([(header::CONTENT_TYPE, "application/json")], json).into_response())
}

pub async fn import_bookmarks(State(state): State<Arc<ServerState>>, body: String) -> ApiResult<serde_json::Value> {
    let imported = state.bookmarks.lock().await.import_json(&body)?;
    Ok(Json(json!({ "imported": imported })))
}

//! Axum router setup for the Grove server

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers::*, websocket::ws_handler, ServerState};

/// Create the axum router with all routes
pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        // WebSocket endpoint for live search and tree events
        .route("/ws", get(ws_handler))
        // Repository exploration
        .route("/api/health", get(health_check))
        .route("/api/repo", get(get_repo).post(open_repo))
        .route("/api/tree", get(get_tree))
        .route("/api/tree/:id/expand", post(expand_directory))
        .route("/api/file", get(get_file))
        .route("/api/raw", get(get_raw))
        .route("/api/search", get(search_query).post(search_body))
        .route("/api/suggest", get(suggest))
        .route("/api/stats", get(get_stats))
        .route("/api/analysis", get(get_analysis))
        .route("/api/graph", get(get_graph))
        .route("/api/graph/mode", post(set_graph_mode))
        .route("/api/graph/:id/toggle", post(toggle_node))
        // Bookmarks
        .route("/api/bookmarks", get(list_bookmarks).post(add_bookmark))
        .route("/api/bookmarks/tags", get(list_tags))
        .route("/api/bookmarks/folders", get(list_folders).post(create_folder))
        .route("/api/bookmarks/folders/:folder", delete(delete_folder))
        .route("/api/bookmarks/export", get(export_bookmarks))
        .route("/api/bookmarks/import", post(import_bookmarks))
        .route("/api/bookmarks/:owner/:name", get(get_bookmark).delete(remove_bookmark))
        .route("/api/bookmarks/:owner/:name/visit", post(visit_bookmark))
        .route("/api/bookmarks/:owner/:name/tags", put(set_bookmark_tags))
        .route("/api/bookmarks/:owner/:name/folder", put(move_bookmark))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

//! Integration tests for Grove
//!
//! These tests verify that multiple systems work together correctly.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use grove_core::{
    analyze, BookmarkBackend, BookmarkStore, BookmarkedRepo, GraphLayout, JsonFileBackend, MemoryBackend,
    SearchEngine, SearchOptions, Viewport, VisibilityMode,
};
use grove_provider::providers::local::{local_repo_ref, LocalProvider};
use grove_provider::{ContentProvider, LoadOutcome, TreeLoader};
use grove_server::router::create_router;
use grove_server::{Explorer, ExplorerSettings, ServerState};
use serde_json::Value;
use tempfile::TempDir;

fn fixture() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    std::fs::create_dir_all(root.join("src/net")).unwrap();
    std::fs::create_dir_all(root.join("docs")).unwrap();
    std::fs::write(root.join("Cargo.toml"), "[package]\nname = \"demo\"\n").unwrap();
    std::fs::write(root.join("README.md"), "# Demo\n").unwrap();
    std::fs::write(root.join("src/main.rs"), "fn main() {\n    println!(\"hello grove\");\n}\n").unwrap();
    std::fs::write(root.join("src/lib.rs"), "pub mod net;\n").unwrap();
    std::fs::write(root.join("src/net/client.rs"), "pub struct Client;\n").unwrap();
    std::fs::write(root.join("docs/guide.md"), "Read main.rs first.\n").unwrap();
    temp
}

fn grove(workdir: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_grove"));
    command
        .current_dir(workdir)
        .env("GROVE_STORAGE_DIR", workdir)
        .env_remove("RUST_LOG");
    command
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_invocation() {
    let temp = TempDir::new().unwrap();
    let output = grove(temp.path()).arg("--help").output().expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Explore repositories as trees, searches and radial maps"));
    assert!(stdout.contains("bookmark"));
}

#[test]
fn test_cli_tree_and_search_local() {
    let repo = fixture();
    let workdir = TempDir::new().unwrap();

    let output = grove(workdir.path())
        .args(["--provider", "local", "--local"])
        .arg(repo.path())
        .args(["tree", "--depth", "1"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("  src/"));
    assert!(stdout.contains("    main.rs ("));
    // src/net sits below the prefetch depth.
    assert!(stdout.contains("    net/ …"));
    assert!(stdout.contains("1 directories not loaded"));

    let output = grove(workdir.path())
        .args(["--provider", "local", "--local"])
        .arg(repo.path())
        .args(["search", "main", "--type", "rs"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("src/main.rs (score"));
    assert!(!stdout.contains("guide.md"));
}

#[test]
fn test_cli_bookmarks_persist() {
    let workdir = TempDir::new().unwrap();

    let add = grove(workdir.path())
        .args(["bookmark", "add", "rust-lang/rust", "--offline", "--tag", "Lang", "--folder", "work"])
        .output()
        .unwrap();
    assert!(add.status.success(), "{}", String::from_utf8_lossy(&add.stderr));

    let again = grove(workdir.path())
        .args(["bookmark", "add", "https://github.com/Rust-Lang/rust", "--offline"])
        .output()
        .unwrap();
    assert!(String::from_utf8_lossy(&again.stdout).contains("already bookmarked"));

    let list = grove(workdir.path()).args(["bookmark", "list", "--folder", "work"]).output().unwrap();
    assert!(String::from_utf8_lossy(&list.stdout).contains("rust-lang/rust [lang]"));

    let export = grove(workdir.path()).args(["bookmark", "export"]).output().unwrap();
    let json: Value = serde_json::from_slice(&export.stdout).unwrap();
    assert_eq!(json["bookmarks"][0]["folder"], "work");

    let store = BookmarkStore::open(JsonFileBackend::in_storage(workdir.path())).unwrap();
    assert!(store.is_bookmarked("rust-lang/rust"));

    let clear = grove(workdir.path()).arg("clear").output().unwrap();
    assert!(clear.status.success());
    assert!(!grove_core::storage_dir(workdir.path()).exists());
}

/// Provider, loader, search, layout and analysis over one checkout
#[tokio::test]
async fn test_local_pipeline() {
    let repo = fixture();
    let provider: Arc<dyn ContentProvider> = Arc::new(LocalProvider::new(repo.path()));
    let loader = TreeLoader::new(Arc::clone(&provider), local_repo_ref(repo.path()));

    let (mut tree, outcome) = loader.load_root().await;
    assert!(matches!(outcome, LoadOutcome::Loaded { children: 4 }));
    let report = loader.prefetch(&mut tree, 2).await;
    assert_eq!(report.failed, 0);
    assert!(tree.unloaded_directories().is_empty());

    let mut engine = SearchEngine::new();
    engine.update_files(&tree);
    assert_eq!(engine.file_count(), 6);

    let results = engine.search(&SearchOptions::new("client")).unwrap();
    assert_eq!(results[0].file.path, "src/net/client.rs");

    let layout = GraphLayout::new(&tree, Viewport::default(), VisibilityMode::Full);
    assert_eq!(layout.visible_nodes().count(), tree.len());

    let analysis = analyze(&tree, &engine);
    assert_eq!(analysis.primary_language.as_deref(), Some("rust"));
    assert!(analysis.summary.contains("Rust (Cargo)"));
}

#[tokio::test]
async fn test_explorer_content_search() {
    let repo = fixture();
    let provider: Arc<dyn ContentProvider> = Arc::new(LocalProvider::new(repo.path()));
    let settings = ExplorerSettings {
        prefetch_depth: 2,
        ..Default::default()
    };
    let mut explorer = Explorer::open(provider, local_repo_ref(repo.path()), settings).await.unwrap();

    let content = explorer.load_file("src/main.rs").await.unwrap();
    assert!(content.contains("hello grove"));

    let mut options = SearchOptions::new("hello");
    options.filters.include_content = true;
    let results = explorer.search(&options).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].matches[0].line, Some(2));
}

/// Serve the router on an ephemeral port and talk to it over HTTP
#[tokio::test]
async fn test_server_round_trip() {
    let repo = fixture();
    let provider: Arc<dyn ContentProvider> = Arc::new(LocalProvider::new(repo.path()));
    let backend: Box<dyn BookmarkBackend> = Box::new(MemoryBackend::new());
    let bookmarks = BookmarkStore::open(backend).unwrap();
    let state = Arc::new(ServerState::new(provider, bookmarks, ExplorerSettings::default()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });
    let base = format!("http://{}", address);
    let client = reqwest::Client::new();

    let health: Value = client.get(format!("{}/api/health", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["provider"], "Local");
    assert!(health["repository"].is_null());

    let missing = client.get(format!("{}/api/tree", base)).send().await.unwrap();
    assert_eq!(missing.status(), 409);

    let opened = client
        .post(format!("{}/api/repo", base))
        .json(&serde_json::json!({ "repo": "local/demo" }))
        .send()
        .await
        .unwrap();
    assert!(opened.status().is_success());
    let summary: Value = opened.json().await.unwrap();
    assert_eq!(summary["files"], 5);
    assert_eq!(summary["unloadedDirectories"], 1);

    let search: Value = client
        .get(format!("{}/api/search?q=main&type=rs", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(search["total"], 1);
    assert_eq!(search["results"][0]["file"]["path"], "src/main.rs");

    let added = client
        .post(format!("{}/api/bookmarks", base))
        .json(&serde_json::json!({ "repo": "local/demo", "tags": ["mine"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(added.status(), 201);

    let bookmark = BookmarkedRepo::new("local", "demo");
    let fetched: Value = client
        .get(format!("{}/api/bookmarks/{}", base, bookmark.key()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["tags"][0], "mine");
}

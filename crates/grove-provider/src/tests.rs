//! Unit tests for grove-provider module

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use grove_core::{DirEntry, FileKind, FileTree};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::providers::github::GitHubProvider;
use crate::providers::local::{local_repo_ref, LocalProvider};
use crate::*;

fn github(server: &MockServer) -> GitHubProvider {
    GitHubProvider::new(Some(server.uri()), Some("test-token".to_string()))
}

fn demo() -> RepoRef {
    RepoRef::new("octo", "demo")
}

#[test]
fn test_provider_creation() {
    let github = create_provider("github", ProviderOptions::default());
    assert!(github.is_ok());
    assert_eq!(github.unwrap().name(), "GitHub");

    let local = create_provider("local", ProviderOptions::default());
    assert!(local.is_err());

    let temp = tempfile::TempDir::new().unwrap();
    let options = ProviderOptions {
        local_root: Some(temp.path().to_path_buf()),
        exclude: vec!["[".to_string()],
        ..Default::default()
    };
    assert!(create_provider("local", options).is_err(), "bad glob is rejected");

    let unknown = create_provider("gitlab", ProviderOptions::default());
    assert!(unknown.is_err());
}

#[tokio::test]
async fn test_github_list_root() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/demo/contents"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([
                    {"name": "src", "path": "src", "type": "dir", "size": 0},
                    {"name": "README.md", "path": "README.md", "type": "file", "size": 120},
                    {"name": "Cargo.toml", "path": "Cargo.toml", "type": "file", "size": 80}
                ]))
                .insert_header("x-ratelimit-limit", "60")
                .insert_header("x-ratelimit-remaining", "59"),
        )
        .mount(&server)
        .await;

    let provider = github(&server);
    let entries = provider.list_dir(&demo(), "").await.unwrap();

    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["src", "Cargo.toml", "README.md"]);
    assert_eq!(entries[0].kind, FileKind::Directory);
    assert_eq!(entries[0].size, None);
    assert_eq!(entries[2].size, Some(120));
    assert_eq!(entries[2].extension.as_deref(), Some("md"));

    let quota = provider.rate_limit().unwrap();
    assert_eq!(quota.remaining, 59);
    assert_eq!(quota.warning_level(), RateLimitWarning::Healthy);
}

#[tokio::test]
async fn test_github_nested_listing_and_raw_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/demo/contents/src/bin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "cli.rs", "path": "src/bin/cli.rs", "type": "file", "size": 42}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/demo/contents/src/bin/cli.rs"))
        .and(header("accept", "application/vnd.github.raw"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fn main() {}\n"))
        .mount(&server)
        .await;

    let provider = github(&server);
    let entries = provider.list_dir(&demo(), "/src/bin/").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, "src/bin/cli.rs");

    let content = provider.file_content(&demo(), "src/bin/cli.rs").await.unwrap();
    assert_eq!(content, "fn main() {}\n");
}

#[tokio::test]
async fn test_github_error_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/demo/contents/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/demo/contents/limited"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-limit", "60")
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", "1700000000"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/demo/contents/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/demo/contents/README.md"))
        .and(header("accept", "application/vnd.github+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(
            {"name": "README.md", "path": "README.md", "type": "file", "size": 10}
        )))
        .mount(&server)
        .await;

    let provider = github(&server);

    let err = provider.list_dir(&demo(), "missing").await.unwrap_err();
    assert!(matches!(err, FetchError::NotFound(_)), "{err:?}");

    let err = provider.list_dir(&demo(), "limited").await.unwrap_err();
    match err {
        FetchError::RateLimited { reset_at } => {
            assert_eq!(reset_at.unwrap().timestamp(), 1_700_000_000);
        }
        other => panic!("expected rate limit, got {other:?}"),
    }
    assert!(provider.rate_limit().unwrap().is_exhausted());

    let err = provider.list_dir(&demo(), "broken").await.unwrap_err();
    match err {
        FetchError::Http { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }

    let err = provider.list_dir(&demo(), "README.md").await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidPath(_)), "{err:?}");

    let err = provider.list_dir(&demo(), "../secrets").await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidPath(_)));
}

#[tokio::test]
async fn test_github_repo_info() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/demo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "full_name": "octo/demo",
            "description": "A demo repository",
            "stargazers_count": 42,
            "forks_count": 7,
            "language": "Rust",
            "default_branch": "main",
            "html_url": "https://github.com/octo/demo"
        })))
        .mount(&server)
        .await;

    let info = github(&server).repo_info(&demo()).await.unwrap();
    assert_eq!(info.full_name, "octo/demo");
    assert_eq!(info.stars, 42);
    assert_eq!(info.default_branch, "main");

    let metadata = info.metadata();
    assert_eq!(metadata.forks, Some(7));
    assert_eq!(metadata.language.as_deref(), Some("Rust"));
}

fn local_fixture() -> tempfile::TempDir {
    let temp = tempfile::TempDir::new().unwrap();
    let root = temp.path();
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::create_dir_all(root.join("target/debug")).unwrap();
    std::fs::create_dir_all(root.join("node_modules/left-pad")).unwrap();
    std::fs::write(root.join(".gitignore"), "target/\n").unwrap();
    std::fs::write(root.join(".env"), "SECRET=1\n").unwrap();
    std::fs::write(root.join("README.md"), "# Demo\n").unwrap();
    std::fs::write(root.join("build.log"), "ok\n").unwrap();
    std::fs::write(root.join("src/main.rs"), "fn main() {}\n").unwrap();
    std::fs::write(root.join("target/debug/demo"), "bin").unwrap();
    temp
}

#[tokio::test]
async fn test_local_listing_honours_ignores() {
    let temp = local_fixture();
    let provider = LocalProvider::new(temp.path())
        .with_excludes(["node_modules", "*.log"])
        .unwrap();
    let repo = local_repo_ref(temp.path());

    let root = provider.list_dir(&repo, "").await.unwrap();
    let names: Vec<&str> = root.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["src", "README.md"]);

    let src = provider.list_dir(&repo, "src").await.unwrap();
    assert_eq!(src, vec![DirEntry::file("src/main.rs", 13)]);

    let content = provider.file_content(&repo, "src/main.rs").await.unwrap();
    assert_eq!(content, "fn main() {}\n");
}

#[tokio::test]
async fn test_local_errors() {
    let temp = local_fixture();
    let provider = LocalProvider::new(temp.path());
    let repo = local_repo_ref(temp.path());

    assert!(matches!(provider.list_dir(&repo, "nope").await, Err(FetchError::NotFound(_))));
    assert!(matches!(provider.list_dir(&repo, "README.md").await, Err(FetchError::InvalidPath(_))));
    assert!(matches!(provider.list_dir(&repo, "../").await, Err(FetchError::InvalidPath(_))));
    assert!(matches!(provider.file_content(&repo, "nope.rs").await, Err(FetchError::NotFound(_))));

    let info = provider.repo_info(&repo).await.unwrap();
    assert_eq!(info.default_branch, "local");
    assert_eq!(repo.owner, "local");
}

#[test]
fn test_local_without_gitignore() {
    let temp = local_fixture();
    let provider = LocalProvider::new(temp.path()).respect_gitignore(false);
    let repo = local_repo_ref(temp.path());

    let entries = tokio_test::block_on(provider.list_dir(&repo, "")).unwrap();
    assert!(entries.iter().any(|e| e.name == "target"));
    assert!(entries.iter().all(|e| !e.name.starts_with('.')));
}

/// In-memory provider with per-path failures and a call counter.
#[derive(Default)]
struct FakeProvider {
    listings: HashMap<String, Vec<DirEntry>>,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl FakeProvider {
    fn sample() -> Self {
        let mut listings = HashMap::new();
        listings.insert(
            String::new(),
            vec![DirEntry::directory("src"), DirEntry::directory("docs"), DirEntry::file("README.md", 10)],
        );
        listings.insert(
            "src".to_string(),
            vec![DirEntry::directory("src/core"), DirEntry::file("src/index.ts", 20)],
        );
        listings.insert("src/core".to_string(), vec![DirEntry::file("src/core/tree.ts", 30)]);
        listings.insert("docs".to_string(), vec![DirEntry::file("docs/guide.md", 40)]);
        FakeProvider {
            listings,
            ..Default::default()
        }
    }

    fn fail(&self, path: &str) {
        self.failing.lock().unwrap().insert(path.to_string());
    }

    fn recover(&self, path: &str) {
        self.failing.lock().unwrap().remove(path);
    }
}

#[async_trait::async_trait]
impl ContentProvider for FakeProvider {
    async fn list_dir(&self, _repo: &RepoRef, path: &str) -> Result<Vec<DirEntry>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(path) {
            return Err(FetchError::Http {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        self.listings
            .get(path)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(path.to_string()))
    }

    async fn file_content(&self, _repo: &RepoRef, path: &str) -> Result<String, FetchError> {
        Err(FetchError::NotFound(path.to_string()))
    }

    async fn repo_info(&self, repo: &RepoRef) -> Result<RepoInfo, FetchError> {
        Err(FetchError::NotFound(repo.full_name()))
    }

    fn name(&self) -> &str {
        "Fake"
    }
}

fn loader(provider: &Arc<FakeProvider>) -> TreeLoader {
    TreeLoader::new(provider.clone(), demo())
}

#[tokio::test]
async fn test_load_root_and_expand() {
    let provider = Arc::new(FakeProvider::sample());
    let loader = loader(&provider);

    let (mut tree, outcome) = loader.load_root().await;
    assert_eq!(outcome, LoadOutcome::Loaded { children: 3 });
    assert_eq!(tree.get(tree.root()).unwrap().name, "demo");

    let src = tree.find_by_path("src").unwrap();
    assert!(!tree.get(src).unwrap().is_loaded());

    let outcome = loader.expand(&mut tree, src, false).await.unwrap();
    assert_eq!(outcome, LoadOutcome::Loaded { children: 2 });
    assert_eq!(tree.get(tree.find_by_path("src/index.ts").unwrap()).unwrap().depth, 2);

    let calls = provider.calls.load(Ordering::SeqCst);
    assert_eq!(loader.expand(&mut tree, src, false).await.unwrap(), LoadOutcome::AlreadyLoaded);
    assert_eq!(provider.calls.load(Ordering::SeqCst), calls);

    // Forcing bypasses the cache.
    loader.expand(&mut tree, src, true).await.unwrap();
    assert_eq!(provider.calls.load(Ordering::SeqCst), calls + 1);

    let readme = tree.find_by_path("README.md").unwrap();
    assert_eq!(
        loader.expand(&mut tree, readme, false).await,
        Err(grove_core::TreeError::NotADirectory(readme))
    );
}

#[tokio::test]
async fn test_failed_fetch_marks_directory() {
    let provider = Arc::new(FakeProvider::sample());
    provider.fail("docs");
    let loader = loader(&provider);
    let (mut tree, _) = loader.load_root().await;

    let docs = tree.find_by_path("docs").unwrap();
    let outcome = loader.expand(&mut tree, docs, false).await.unwrap();
    assert!(outcome.is_failed());
    assert_eq!(tree.children(docs), Some(&[][..]));
    assert!(tree.load_failed(docs));

    // A failed directory is retried without forcing.
    provider.recover("docs");
    let outcome = loader.expand(&mut tree, docs, false).await.unwrap();
    assert_eq!(outcome, LoadOutcome::Loaded { children: 1 });
    assert!(!tree.load_failed(docs));
}

#[tokio::test]
async fn test_root_failure_is_not_an_error() {
    let provider = Arc::new(FakeProvider::sample());
    provider.fail("");
    let (tree, outcome) = loader(&provider).load_root().await;
    assert!(outcome.is_failed());
    assert!(tree.load_failed(tree.root()));
    assert_eq!(tree.len(), 1);
}

#[tokio::test]
async fn test_prefetch_respects_depth() {
    let provider = Arc::new(FakeProvider::sample());
    let loader = loader(&provider);
    let (mut tree, _) = loader.load_root().await;

    let report = loader.prefetch(&mut tree, 1).await;
    assert_eq!(report, PrefetchReport { loaded: 2, failed: 0 });
    let core = tree.find_by_path("src/core").unwrap();
    assert!(!tree.get(core).unwrap().is_loaded());

    provider.fail("src/core");
    let report = loader.prefetch(&mut tree, 5).await;
    assert_eq!(report, PrefetchReport { loaded: 0, failed: 1 });
    assert!(tree.unloaded_directories().is_empty());
}

#[tokio::test]
async fn test_loader_feeds_search_engine() {
    let provider = Arc::new(FakeProvider::sample());
    let loader = loader(&provider);
    let (mut tree, _) = loader.load_root().await;
    loader.prefetch(&mut tree, 3).await;

    let mut engine = grove_core::SearchEngine::new();
    engine.update_files(&tree);
    let paths: Vec<&str> = engine.files().iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["src/core/tree.ts", "src/index.ts", "docs/guide.md", "README.md"]);

    let empty = FileTree::new("empty");
    engine.update_files(&empty);
    assert_eq!(engine.file_count(), 0);
}

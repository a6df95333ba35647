//! CLI command implementations

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Subcommand};
use grove_core::{
    BookmarkBackend, BookmarkStore, BookmarkedRepo, FileTree, JsonFileBackend, NodeId, SearchFilters,
    SearchOptions, SizeRange, Viewport, VisibilityMode,
};
use grove_provider::providers::local::local_repo_ref;
use grove_provider::{create_provider, ContentProvider, ProviderOptions, RepoRef};
use grove_server::{Explorer, GroveServer, ServerState};
use tracing::{info, warn};

use crate::config::GroveConfig;

/// Where repository content comes from, as chosen on the command line.
pub struct Source {
    pub provider: String,
    pub local_root: PathBuf,
    pub exclude: Vec<String>,
}

impl Source {
    fn is_local(&self) -> bool {
        self.provider == "local"
    }

    fn provider(&self, config: &GroveConfig) -> anyhow::Result<Arc<dyn ContentProvider>> {
        let options = ProviderOptions {
            api_base: config.github.api_base.clone(),
            token: config.github.token.clone(),
            local_root: Some(self.local_root.clone()),
            exclude: self.exclude.clone(),
        };
        Ok(Arc::from(create_provider(&self.provider, options)?))
    }

    /// The local provider always serves its own directory; GitHub needs a
    /// repository argument.
    fn repo(&self, repo: Option<&str>) -> anyhow::Result<RepoRef> {
        if self.is_local() {
            let root = self
                .local_root
                .canonicalize()
                .with_context(|| format!("Cannot open {}", self.local_root.display()))?;
            return Ok(local_repo_ref(&root));
        }
        let Some(repo) = repo else {
            anyhow::bail!("A repository (owner/name or GitHub URL) is required");
        };
        Ok(repo.parse()?)
    }
}

#[derive(Args)]
pub struct SearchArgs {
    /// Text or pattern to look for
    pub query: String,

    /// Repository (`owner/name` or URL); ignored by the local provider
    #[arg(short, long)]
    pub repo: Option<String>,

    /// Treat the query as a regular expression
    #[arg(long)]
    pub regex: bool,

    /// Match case exactly
    #[arg(long)]
    pub case: bool,

    /// Fetch and scan file contents of every loaded file
    #[arg(long)]
    pub content: bool,

    /// Only files with these extensions
    #[arg(short = 't', long = "type")]
    pub types: Vec<String>,

    /// Only files in these languages
    #[arg(short, long = "language")]
    pub languages: Vec<String>,

    #[arg(long)]
    pub min_size: Option<u64>,

    #[arg(long)]
    pub max_size: Option<u64>,

    /// Maximum number of files reported
    #[arg(short, long)]
    pub max: Option<usize>,

    /// Directory levels to load before searching
    #[arg(short, long, default_value = "3")]
    pub depth: u32,
}

#[derive(Subcommand)]
pub enum BookmarkCommand {
    /// Bookmark a repository
    Add {
        repo: String,
        #[arg(short, long)]
        tag: Vec<String>,
        #[arg(short, long)]
        folder: Option<String>,
        /// Skip fetching description and stars
        #[arg(long)]
        offline: bool,
    },
    /// Remove a bookmark
    Remove { repo: String },
    /// List bookmarks
    List {
        #[arg(short, long)]
        tag: Option<String>,
        #[arg(short, long)]
        folder: Option<String>,
        /// Text to look for in names, descriptions and tags
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Replace the tags of a bookmark
    Tag { repo: String, tags: Vec<String> },
    /// Show every tag in use
    Tags,
    /// Create a folder, or move a bookmark into one
    Folder {
        name: String,
        /// Bookmark to move into the folder
        #[arg(short, long)]
        repo: Option<String>,
    },
    /// Print all bookmarks as JSON
    Export,
    /// Merge bookmarks from a JSON export
    Import { file: PathBuf },
}

async fn open_explorer(
    config: &GroveConfig,
    source: &Source,
    repo: Option<&str>,
    depth: u32,
) -> anyhow::Result<Explorer> {
    let provider = source.provider(config)?;
    let repo = source.repo(repo)?;
    let explorer = Explorer::open(provider, repo.clone(), config.explorer_settings(depth))
        .await
        .with_context(|| format!("Failed to open {}", repo))?;
    Ok(explorer)
}

fn open_bookmarks(config: &GroveConfig) -> anyhow::Result<BookmarkStore<JsonFileBackend>> {
    let backend = JsonFileBackend::in_storage(&config.storage_root());
    BookmarkStore::open(backend).context("Failed to load bookmarks")
}

pub async fn serve(
    config: &GroveConfig,
    source: &Source,
    host: Option<String>,
    port: Option<u16>,
    open: bool,
    repo: Option<String>,
) -> anyhow::Result<()> {
    let mut server_config = config.server_config();
    if let Some(host) = host {
        server_config.host = host;
    }
    if let Some(port) = port {
        server_config.port = port;
    }
    info!("Starting Grove server on {}", server_config.address());

    let provider = source.provider(config)?;
    let backend: Box<dyn BookmarkBackend> = Box::new(JsonFileBackend::in_storage(&config.storage_root()));
    let bookmarks = BookmarkStore::open(backend).context("Failed to load bookmarks")?;
    let settings = config.explorer_settings(1);
    let state = ServerState::new(Arc::clone(&provider), bookmarks, settings);

    if repo.is_some() || source.is_local() {
        let repo = source.repo(repo.as_deref())?;
        match Explorer::open(provider, repo.clone(), settings).await {
            Ok(explorer) => *state.explorer.write().await = Some(explorer),
            Err(e) => warn!("Could not open {} on startup: {}", repo, e),
        }
    }

    let server = GroveServer::new(state, server_config);
    if open {
        let url = format!("http://{}", server.config().address());
        if let Err(e) = open::that(&url) {
            warn!("Failed to open browser at {}: {}", url, e);
        }
    }
    server.start().await
}

pub async fn tree(config: &GroveConfig, source: &Source, repo: Option<String>, depth: u32) -> anyhow::Result<()> {
    let explorer = open_explorer(config, source, repo.as_deref(), depth).await?;
    let tree = explorer.tree();
    print_node(tree, tree.root());

    let unloaded = tree.unloaded_directories().len();
    if unloaded > 0 {
        println!("\n{} directories not loaded (raise --depth to load more)", unloaded);
    }
    Ok(())
}

fn print_node(tree: &FileTree, id: NodeId) {
    let Some(node) = tree.get(id) else {
        return;
    };
    let indent = "  ".repeat(node.depth as usize);
    if node.is_dir() {
        let note = if tree.load_failed(id) {
            " (failed to load)"
        } else if !node.is_loaded() {
            " …"
        } else {
            ""
        };
        println!("{}{}/{}", indent, node.name, note);
    } else {
        match node.size {
            Some(size) => println!("{}{} ({} bytes)", indent, node.name, size),
            None => println!("{}{}", indent, node.name),
        }
    }
    for &child in tree.children(id).unwrap_or(&[]) {
        print_node(tree, child);
    }
}

pub async fn search(config: &GroveConfig, source: &Source, args: SearchArgs) -> anyhow::Result<()> {
    let mut explorer = open_explorer(config, source, args.repo.as_deref(), args.depth).await?;

    if args.content {
        let paths: Vec<String> = explorer.engine().files().iter().map(|f| f.path.clone()).collect();
        info!("Fetching {} files for content search", paths.len());
        for path in paths {
            if let Err(e) = explorer.load_file(&path).await {
                warn!("Skipping content of {}: {}", path, e);
            }
        }
    }

    let size_range = match (args.min_size, args.max_size) {
        (None, None) => None,
        (min, max) => Some(SizeRange {
            min: min.unwrap_or(0),
            max: max.unwrap_or(u64::MAX),
        }),
    };
    let options = SearchOptions::new(args.query)
        .regex(args.regex)
        .case_sensitive(args.case)
        .max_results(args.max.unwrap_or(config.search.max_results))
        .filters(SearchFilters {
            file_types: args.types,
            languages: args.languages,
            size_range,
            include_content: args.content,
        });

    let results = explorer.search(&options)?;
    if results.is_empty() {
        println!("No matches for {:?}", options.query);
        return Ok(());
    }
    for result in &results {
        println!("{} (score {})", result.file.path, result.relevance_score);
        for m in &result.matches {
            match m.line {
                Some(line) => println!("  {:>5}: {}", line, m.content),
                None => println!("  {:?} match", m.kind),
            }
        }
    }
    println!("\n{} files matched", results.len());
    Ok(())
}

pub async fn analyze(
    config: &GroveConfig,
    source: &Source,
    repo: Option<String>,
    depth: u32,
    json: bool,
) -> anyhow::Result<()> {
    let explorer = open_explorer(config, source, repo.as_deref(), depth).await?;
    let analysis = explorer.analysis();
    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    println!("{}", analysis.summary);
    println!();
    for share in &analysis.languages {
        println!("  {:<12} {:>5} files  {:>5.1}%", share.language, share.files, share.percent);
    }
    if !analysis.largest_files.is_empty() {
        println!("\nLargest files:");
        for file in &analysis.largest_files {
            println!("  {:>10}  {}", file.size, file.path);
        }
    }
    Ok(())
}

pub async fn layout(
    config: &GroveConfig,
    source: &Source,
    repo: Option<String>,
    depth: u32,
    full: bool,
    width: Option<f64>,
    height: Option<f64>,
) -> anyhow::Result<()> {
    let mut explorer = open_explorer(config, source, repo.as_deref(), depth).await?;
    let current = explorer.layout().viewport();
    let viewport = Viewport::new(width.unwrap_or(current.width), height.unwrap_or(current.height));
    if viewport.width <= 0.0 || viewport.height <= 0.0 {
        anyhow::bail!("Viewport must be positive, got {}x{}", viewport.width, viewport.height);
    }
    explorer.resize(viewport);
    if full {
        explorer.set_mode(VisibilityMode::Full);
    }
    println!("{}", serde_json::to_string_pretty(&explorer.graph())?);
    Ok(())
}

pub async fn bookmark(config: &GroveConfig, source: &Source, command: BookmarkCommand) -> anyhow::Result<()> {
    let mut store = open_bookmarks(config)?;

    match command {
        BookmarkCommand::Add {
            repo,
            tag,
            folder,
            offline,
        } => {
            let repo: RepoRef = repo.parse()?;
            let mut bookmark = BookmarkedRepo::new(&repo.owner, &repo.name).with_tags(tag);
            if !offline {
                match source.provider(config)?.repo_info(&repo).await {
                    Ok(info) => {
                        let metadata = info.metadata();
                        bookmark.description = metadata.description;
                        bookmark.stars = metadata.stars;
                        bookmark.forks = metadata.forks;
                        bookmark.language = metadata.language;
                    }
                    Err(e) => warn!("Bookmarking {} without metadata: {}", repo, e),
                }
            }
            let key = bookmark.key();
            if !store.add(bookmark)? {
                println!("{} is already bookmarked", repo);
                return Ok(());
            }
            if let Some(folder) = folder {
                if !store.folders().contains(&folder) {
                    store.create_folder(&folder)?;
                }
                store.move_to_folder(&key, Some(&folder))?;
            }
            println!("Bookmarked {}", repo);
        }
        BookmarkCommand::Remove { repo } => {
            let repo: RepoRef = repo.parse()?;
            if store.remove(&repo.full_name())? {
                println!("Removed {}", repo);
            } else {
                anyhow::bail!("{} is not bookmarked", repo);
            }
        }
        BookmarkCommand::List { tag, folder, query } => {
            let mut bookmarks: Vec<&BookmarkedRepo> = match (&query, &tag, &folder) {
                (Some(query), _, _) => store.search(query),
                (None, Some(tag), _) => store.by_tag(tag),
                (None, None, Some(folder)) => store.in_folder(Some(folder.as_str())),
                (None, None, None) => store.list().iter().collect(),
            };
            bookmarks.sort_by(|a, b| b.visit_count.cmp(&a.visit_count).then_with(|| a.key().cmp(&b.key())));
            if bookmarks.is_empty() {
                println!("No bookmarks");
            }
            for bookmark in bookmarks {
                let tags = if bookmark.tags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", bookmark.tags.join(", "))
                };
                let stars = bookmark.stars.map(|s| format!(" ★{}", s)).unwrap_or_default();
                println!("{}/{}{}{}", bookmark.owner, bookmark.name, stars, tags);
                if let Some(description) = &bookmark.description {
                    println!("    {}", description);
                }
            }
        }
        BookmarkCommand::Tag { repo, tags } => {
            let repo: RepoRef = repo.parse()?;
            store.set_tags(&repo.full_name(), tags)?;
            println!("Tagged {}", repo);
        }
        BookmarkCommand::Tags => {
            for tag in store.all_tags() {
                println!("{}", tag);
            }
        }
        BookmarkCommand::Folder { name, repo } => {
            if !store.folders().contains(&name) {
                store.create_folder(&name)?;
                println!("Created folder {}", name);
            }
            if let Some(repo) = repo {
                let repo: RepoRef = repo.parse()?;
                store.move_to_folder(&repo.full_name(), Some(&name))?;
                println!("Moved {} to {}", repo, name);
            }
        }
        BookmarkCommand::Export => {
            println!("{}", store.export_json()?);
        }
        BookmarkCommand::Import { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let imported = store.import_json(&json)?;
            println!("Imported {} bookmarks", imported);
        }
    }
    Ok(())
}

pub fn clear(config: &GroveConfig) -> anyhow::Result<()> {
    let root = config.storage_root();
    tracing::info!("Clearing storage under: {}", root.display());

    grove_core::clear_storage(&root)?;

    tracing::info!("Storage cleared");
    Ok(())
}

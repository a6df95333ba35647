//! Grove CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;

use commands::{BookmarkCommand, SearchArgs, Source};
use config::GroveConfig;

#[derive(Parser)]
#[command(name = "grove")]
#[command(about = "Explore repositories as trees, searches and radial maps", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./grove.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Where repository content comes from
    #[arg(long, global = true, default_value = "github", value_parser = ["github", "local"])]
    provider: String,

    /// Directory served by the local provider
    #[arg(long, global = true, default_value = ".")]
    local: PathBuf,

    /// Glob patterns skipped by the local provider
    #[arg(long, global = true)]
    exclude: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the explorer server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Repository to open on startup
        #[arg(short, long)]
        repo: Option<String>,
    },
    /// Print the loaded file tree
    Tree {
        /// Repository (`owner/name` or URL); ignored by the local provider
        repo: Option<String>,

        /// Directory levels to load
        #[arg(short, long, default_value = "2")]
        depth: u32,
    },
    /// Search file names, paths and optionally contents
    Search(SearchArgs),
    /// Summarize a repository
    Analyze {
        repo: Option<String>,

        #[arg(short, long, default_value = "2")]
        depth: u32,

        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the radial layout as JSON
    Layout {
        repo: Option<String>,

        #[arg(short, long, default_value = "1")]
        depth: u32,

        /// Show every node instead of progressive disclosure
        #[arg(long)]
        full: bool,

        #[arg(long)]
        width: Option<f64>,

        #[arg(long)]
        height: Option<f64>,
    },
    /// Manage bookmarked repositories
    #[command(subcommand)]
    Bookmark(BookmarkCommand),
    /// Remove everything Grove stored on disk
    Clear,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("grove={0},grove_server={0},grove_provider={0}", log_level)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Grove v{}", env!("CARGO_PKG_VERSION"));

    let config = GroveConfig::load(cli.config.as_deref())?;
    let source = Source {
        provider: cli.provider,
        local_root: cli.local,
        exclude: cli.exclude,
    };

    match cli.command {
        Commands::Serve { port, host, open, repo } => {
            commands::serve(&config, &source, host, port, open, repo).await
        }
        Commands::Tree { repo, depth } => commands::tree(&config, &source, repo, depth).await,
        Commands::Search(args) => commands::search(&config, &source, args).await,
        Commands::Analyze { repo, depth, json } => commands::analyze(&config, &source, repo, depth, json).await,
        Commands::Layout {
            repo,
            depth,
            full,
            width,
            height,
        } => commands::layout(&config, &source, repo, depth, full, width, height).await,
        Commands::Bookmark(command) => commands::bookmark(&config, &source, command).await,
        Commands::Clear => commands::clear(&config),
        Commands::Version => {
            println!("Grove v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

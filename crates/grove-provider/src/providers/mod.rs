//! Content provider implementations

pub mod github;
pub mod local;

use std::path::PathBuf;

use anyhow::Result;

use super::provider::ContentProvider;

/// Settings shared by the provider constructors.
#[derive(Debug, Clone, Default)]
pub struct ProviderOptions {
    /// GitHub API base URL, `https://api.github.com` when unset.
    pub api_base: Option<String>,
    /// Bearer token; falls back to `GITHUB_TOKEN`.
    pub token: Option<String>,
    /// Directory served by the local provider.
    pub local_root: Option<PathBuf>,
    /// Glob patterns the local provider skips.
    pub exclude: Vec<String>,
}

/// Factory function to create content providers
pub fn create_provider(kind: &str, options: ProviderOptions) -> Result<Box<dyn ContentProvider>> {
    match kind {
        "github" => Ok(Box::new(github::GitHubProvider::new(options.api_base, options.token))),
        "local" => {
            let Some(root) = options.local_root else {
                anyhow::bail!("The local provider needs a directory");
            };
            let provider = local::LocalProvider::new(root).with_excludes(&options.exclude)?;
            Ok(Box::new(provider))
        }
        _ => anyhow::bail!("Unknown content provider: {}", kind),
    }
}

//! `grove.toml` configuration with environment overrides

use std::path::{Path, PathBuf};

use anyhow::Context;
use grove_core::Viewport;
use grove_server::{ExplorerSettings, ServerConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "grove.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroveConfig {
    pub server: ServerSection,
    pub github: GitHubSection,
    pub search: SearchSection,
    pub layout: LayoutSection,
    pub storage: StorageSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            host: defaults.host,
            port: defaults.port,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubSection {
    pub api_base: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub max_results: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            max_results: grove_core::search::DEFAULT_MAX_RESULTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSection {
    pub width: f64,
    pub height: f64,
}

impl Default for LayoutSection {
    fn default() -> Self {
        let viewport = Viewport::default();
        Self {
            width: viewport.width,
            height: viewport.height,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Directory holding `.grove/`; the working directory when unset.
    pub dir: Option<PathBuf>,
}

impl GroveConfig {
    /// Read `path`, or `grove.toml` if present, then apply environment
    /// overrides. An explicit path that does not exist is an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&text).with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// `GITHUB_TOKEN` and `GROVE_*` variables win over the file.
    pub fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("GROVE_GITHUB_TOKEN").or_else(|| lookup("GITHUB_TOKEN")) {
            self.github.token = Some(token);
        }
        if let Some(api_base) = lookup("GROVE_API_BASE") {
            self.github.api_base = Some(api_base);
        }
        if let Some(host) = lookup("GROVE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("GROVE_PORT") {
            self.server.port = port.parse().with_context(|| format!("GROVE_PORT is not a port: {}", port))?;
        }
        if let Some(max) = lookup("GROVE_MAX_RESULTS") {
            self.search.max_results = max
                .parse()
                .with_context(|| format!("GROVE_MAX_RESULTS is not a number: {}", max))?;
        }
        if let Some(dir) = lookup("GROVE_STORAGE_DIR") {
            self.storage.dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    pub fn storage_root(&self) -> PathBuf {
        self.storage.dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.server.host.clone(),
            port: self.server.port,
        }
    }

    pub fn explorer_settings(&self, prefetch_depth: u32) -> ExplorerSettings {
        ExplorerSettings {
            viewport: Viewport::new(self.layout.width, self.layout.height),
            max_results: self.search.max_results,
            prefetch_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = GroveConfig::from_toml("").unwrap();
        assert_eq!(config, GroveConfig::default());
        assert_eq!(config.server.port, 7890);
        assert_eq!(config.search.max_results, 50);
        assert_eq!(config.layout.width, 800.0);
        assert_eq!(config.storage_root(), PathBuf::from("."));
    }

    #[test]
    fn test_partial_file() {
        let config = GroveConfig::from_toml(
            r#"
            [server]
            port = 9000

            [github]
            api_base = "http://localhost:8080"

            [layout]
            width = 1024.0
            "#,
        )
        .unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.github.api_base.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.layout.height, 600.0);

        assert!(GroveConfig::from_toml("[server]\nport = \"high\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("GITHUB_TOKEN", "ghp_env"),
            ("GROVE_PORT", "8123"),
            ("GROVE_MAX_RESULTS", "10"),
            ("GROVE_STORAGE_DIR", "/tmp/grove"),
        ]);
        let mut config = GroveConfig::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.github.token.as_deref(), Some("ghp_env"));
        assert_eq!(config.server.port, 8123);
        assert_eq!(config.explorer_settings(1).max_results, 10);
        assert_eq!(config.storage_root(), PathBuf::from("/tmp/grove"));

        let mut config = GroveConfig::default();
        assert!(config.apply_env(|key| (key == "GROVE_PORT").then(|| "x".to_string())).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("grove.toml");
        std::fs::write(&path, "[search]\nmax_results = 5\n").unwrap();
        let config = GroveConfig::from_file(&path).unwrap();
        assert_eq!(config.search.max_results, 5);

        assert!(GroveConfig::from_file(&temp.path().join("missing.toml")).is_err());
    }
}

//! GitHub REST API provider

use std::sync::RwLock;

use grove_core::{DirEntry, FileKind};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, USER_AGENT};
use reqwest::{Response, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::{clean_path, sort_entries, ContentProvider, FetchError, RepoInfo};
use crate::rate_limit::RateLimitStatus;
use crate::reference::RepoRef;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";

pub struct GitHubProvider {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
    rate_limit: RwLock<Option<RateLimitStatus>>,
}

impl GitHubProvider {
    pub fn new(api_base: Option<String>, token: Option<String>) -> Self {
        let token = token
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .filter(|t| !t.trim().is_empty());

        Self {
            client: reqwest::Client::new(),
            api_base: api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            token,
            rate_limit: RwLock::new(None),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, segments: &[&str], path: &str) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| FetchError::InvalidPath(format!("{}: {}", self.api_base, e)))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidPath(self.api_base.clone()))?
            .pop_if_empty()
            .extend(segments)
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    async fn get(&self, url: Url, accept: &str) -> Result<Response, FetchError> {
        debug!("GET {}", url);
        let mut request = self
            .client
            .get(url.clone())
            .header(USER_AGENT, "grove")
            .header(ACCEPT, accept)
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request.send().await?;
        self.record_rate_limit(response.headers());

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let rate_limit = RateLimitStatus::from_headers(response.headers());
        match status {
            StatusCode::NOT_FOUND => Err(FetchError::NotFound(url.path().to_string())),
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
                if rate_limit.is_some_and(|r| r.is_exhausted()) || status == StatusCode::TOO_MANY_REQUESTS =>
            {
                warn!("GitHub rate limit exceeded");
                Err(FetchError::RateLimited {
                    reset_at: rate_limit.and_then(|r| r.reset_at),
                })
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiMessage>(&body)
                    .map(|m| m.message)
                    .unwrap_or(body);
                Err(FetchError::Http {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    fn record_rate_limit(&self, headers: &HeaderMap) {
        if let Some(status) = RateLimitStatus::from_headers(headers) {
            if let Ok(mut slot) = self.rate_limit.write() {
                *slot = Some(status);
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: Option<u64>,
}

impl From<ContentItem> for DirEntry {
    fn from(item: ContentItem) -> Self {
        if item.kind == "dir" {
            DirEntry {
                name: item.name,
                path: item.path,
                kind: FileKind::Directory,
                size: None,
                extension: None,
            }
        } else {
            let mut entry = DirEntry::file(item.path, item.size.unwrap_or(0));
            entry.name = item.name;
            entry.size = item.size;
            entry
        }
    }
}

/// `GET /repos/{owner}/{repo}/contents/{path}` answers with an array for a
/// directory and an object for a file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<ContentItem>),
    Single(ContentItem),
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    full_name: String,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    language: Option<String>,
    default_branch: String,
    html_url: String,
}

#[async_trait::async_trait]
impl ContentProvider for GitHubProvider {
    async fn list_dir(&self, repo: &RepoRef, path: &str) -> Result<Vec<DirEntry>, FetchError> {
        let path = clean_path(path)?;
        let url = self.url(&["repos", &repo.owner, &repo.name, "contents"], &path)?;
        let response = self.get(url, JSON_MEDIA_TYPE).await?;
        let body: ContentsResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        let items = match body {
            ContentsResponse::Listing(items) => items,
            ContentsResponse::Single(item) => {
                return Err(FetchError::InvalidPath(format!("{} is a {}, not a directory", item.path, item.kind)));
            }
        };

        let mut entries: Vec<DirEntry> = items.into_iter().map(DirEntry::from).collect();
        sort_entries(&mut entries);
        debug!("Listed {} entries in {}:{}", entries.len(), repo, path);
        Ok(entries)
    }

    async fn file_content(&self, repo: &RepoRef, path: &str) -> Result<String, FetchError> {
        let path = clean_path(path)?;
        let url = self.url(&["repos", &repo.owner, &repo.name, "contents"], &path)?;
        let response = self.get(url, RAW_MEDIA_TYPE).await?;
        let bytes = response.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|_| FetchError::Decode(format!("{} is not valid UTF-8", path)))
    }

    async fn repo_info(&self, repo: &RepoRef) -> Result<RepoInfo, FetchError> {
        let url = self.url(&["repos", &repo.owner, &repo.name], "")?;
        let response = self.get(url, JSON_MEDIA_TYPE).await?;
        let body: RepoResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(RepoInfo {
            full_name: body.full_name,
            description: body.description,
            stars: body.stargazers_count,
            forks: body.forks_count,
            language: body.language,
            default_branch: body.default_branch,
            html_url: body.html_url,
        })
    }

    fn name(&self) -> &str {
        "GitHub"
    }

    fn rate_limit(&self) -> Option<RateLimitStatus> {
        self.rate_limit.read().ok().and_then(|slot| *slot)
    }
}

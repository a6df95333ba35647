//! Text search and relevance ranking over a flattened file tree

use std::collections::{BTreeMap, HashMap};

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SearchError;
use crate::model::FileNode;
use crate::tree::FileTree;

pub const DEFAULT_MAX_RESULTS: usize = 50;

/// Lines of context kept on each side of a content match.
const CONTEXT_LINES: usize = 2;

/// Files larger than this lose ranking points.
const LARGE_FILE_BYTES: u64 = 100_000;

const COMMON_EXTENSIONS: &[&str] = &["js", "ts", "jsx", "tsx", "py", "java", "cpp", "c"];
const ENTRY_NAME_HINTS: &[&str] = &["index", "main", "app", "server"];

/// Inclusive byte-size window. Files without a known size count as 0 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRange {
    pub min: u64,
    pub max: u64,
}

impl SizeRange {
    pub fn contains(&self, size: u64) -> bool {
        size >= self.min && size <= self.max
    }
}

/// Narrowing applied before any matching. Empty allow-lists do not filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    /// Extensions without the leading dot, compared case-insensitively.
    pub file_types: Vec<String>,
    /// Language names as produced by [`Language::name`](crate::model::Language::name).
    pub languages: Vec<String>,
    pub size_range: Option<SizeRange>,
    /// Also scan cached file contents line by line.
    pub include_content: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchOptions {
    pub query: String,
    pub filters: SearchFilters,
    pub case_sensitive: bool,
    pub use_regex: bool,
    pub max_results: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            query: String::new(),
            filters: SearchFilters::default(),
            case_sensitive: false,
            use_regex: false,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl SearchOptions {
    pub fn new(query: impl Into<String>) -> Self {
        SearchOptions {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn regex(mut self, use_regex: bool) -> Self {
        self.use_regex = use_regex;
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// Where in a file a match was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Name,
    Path,
    Content,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    /// 1-based line number, only set for content matches.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub line: Option<u32>,
    pub content: String,
    pub context: String,
    #[serde(rename = "type")]
    pub kind: MatchKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub file: FileNode,
    pub matches: Vec<SearchMatch>,
    pub relevance_score: i64,
}

/// Fuzzy path suggestion for quick-open style lookups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub path: String,
    pub score: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileSize {
    pub path: String,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeStats {
    pub total_files: usize,
    pub total_size: u64,
    pub average_size: u64,
    pub largest: Option<FileSize>,
    pub smallest: Option<FileSize>,
}

/// Search engine over the files of one tree snapshot plus a cache of
/// fetched file contents.
#[derive(Debug, Default)]
pub struct SearchEngine {
    files: Vec<FileNode>,
    contents: HashMap<String, String>,
}

impl SearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the searchable file list with the files of `tree`, in
    /// depth-first order. Directories are never search targets.
    pub fn update_files(&mut self, tree: &FileTree) {
        self.files = tree.files().cloned().collect();
        debug!("Search index holds {} files", self.files.len());
    }

    /// Cache the text of `path`, replacing any earlier entry.
    pub fn update_file_content(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.contents.insert(path.into(), content.into());
    }

    pub fn cached_content(&self, path: &str) -> Option<&str> {
        self.contents.get(path).map(String::as_str)
    }

    pub fn clear_content_cache(&mut self) {
        self.contents.clear();
    }

    /// Forget cached text for `prefix` and everything below it. An empty
    /// prefix is the repository root.
    pub fn invalidate_content(&mut self, prefix: &str) {
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            self.clear_content_cache();
            return;
        }
        let before = self.contents.len();
        self.contents.retain(|path, _| {
            !(path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/')))
        });
        debug!("Dropped {} cached files under {:?}", before - self.contents.len(), prefix);
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn files(&self) -> &[FileNode] {
        &self.files
    }

    /// Files surviving the type, language and size filters, in that order.
    pub fn filter_files<'a>(&'a self, filters: &'a SearchFilters) -> impl Iterator<Item = &'a FileNode> + 'a {
        self.files
            .iter()
            .filter(move |file| {
                filters.file_types.is_empty() || {
                    let ext = file.extension.as_deref().unwrap_or("");
                    filters
                        .file_types
                        .iter()
                        .any(|t| t.trim_start_matches('.').eq_ignore_ascii_case(ext))
                }
            })
            .filter(move |file| {
                filters.languages.is_empty() || {
                    let language = file.language().name();
                    filters.languages.iter().any(|l| l.eq_ignore_ascii_case(language))
                }
            })
            .filter(move |file| {
                filters
                    .size_range
                    .is_none_or(|range| range.contains(file.size.unwrap_or(0)))
            })
    }

    /// Run a query. Blank queries yield no results; an invalid regex is the
    /// only error.
    ///
    /// The scan walks files in flattened order and stops as soon as
    /// `max_results` files have matched; only that collected set is then
    /// sorted by descending relevance. Highly relevant files later in the
    /// tree can therefore be missed when many files match.
    pub fn search(&self, options: &SearchOptions) -> Result<Vec<SearchResult>, SearchError> {
        if options.query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let matcher = build_matcher(options)?;
        let query_lower = options.query.to_lowercase();

        let mut results = Vec::new();
        for file in self.filter_files(&options.filters) {
            if results.len() >= options.max_results {
                break;
            }

            let mut matches = Vec::new();
            if matcher.is_match(&file.name) {
                matches.push(SearchMatch {
                    line: None,
                    content: file.name.clone(),
                    context: file.name.clone(),
                    kind: MatchKind::Name,
                });
            }
            if matcher.is_match(&file.path) {
                matches.push(SearchMatch {
                    line: None,
                    content: file.path.clone(),
                    context: file.path.clone(),
                    kind: MatchKind::Path,
                });
            }
            if options.filters.include_content {
                if let Some(content) = self.contents.get(&file.path) {
                    matches.extend(content_matches(&matcher, content));
                }
            }

            if matches.is_empty() {
                continue;
            }

            let relevance_score = relevance(file, matches.len(), &query_lower);
            results.push(SearchResult {
                file: file.clone(),
                matches,
                relevance_score,
            });
        }

        // Stable: equal scores keep scan order.
        results.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));
        debug!("Query {:?} matched {} files", options.query, results.len());
        Ok(results)
    }

    /// Fuzzy-match `query` against every file path, best first.
    pub fn suggest(&self, query: &str, limit: usize) -> Vec<Suggestion> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let matcher = SkimMatcherV2::default();
        let mut scored: Vec<Suggestion> = self
            .files
            .iter()
            .filter_map(|f| {
                matcher.fuzzy_match(&f.path, query).map(|score| Suggestion {
                    path: f.path.clone(),
                    score,
                })
            })
            .collect();
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored.truncate(limit);
        scored
    }

    /// Count of files per extension; files without one are counted under
    /// `"none"`.
    pub fn file_type_stats(&self) -> BTreeMap<String, usize> {
        let mut stats = BTreeMap::new();
        for file in &self.files {
            let key = file.extension.clone().unwrap_or_else(|| "none".to_string());
            *stats.entry(key).or_insert(0) += 1;
        }
        stats
    }

    pub fn language_stats(&self) -> BTreeMap<String, usize> {
        let mut stats = BTreeMap::new();
        for file in &self.files {
            *stats.entry(file.language().name().to_string()).or_insert(0) += 1;
        }
        stats
    }

    pub fn size_stats(&self) -> SizeStats {
        let mut stats = SizeStats {
            total_files: self.files.len(),
            ..Default::default()
        };
        for file in &self.files {
            let size = file.size.unwrap_or(0);
            stats.total_size += size;
            if stats.largest.as_ref().is_none_or(|l| size > l.size) {
                stats.largest = Some(FileSize { path: file.path.clone(), size });
            }
            if stats.smallest.as_ref().is_none_or(|s| size < s.size) {
                stats.smallest = Some(FileSize { path: file.path.clone(), size });
            }
        }
        if stats.total_files > 0 {
            stats.average_size = stats.total_size / stats.total_files as u64;
        }
        stats
    }
}

fn build_matcher(options: &SearchOptions) -> Result<Regex, SearchError> {
    let pattern = if options.use_regex {
        options.query.clone()
    } else {
        regex::escape(&options.query)
    };
    RegexBuilder::new(&pattern)
        .case_insensitive(!options.case_sensitive)
        .build()
        .map_err(|source| SearchError::InvalidPattern {
            pattern: options.query.clone(),
            source,
        })
}

fn content_matches(matcher: &Regex, content: &str) -> Vec<SearchMatch> {
    let lines: Vec<&str> = content.lines().collect();
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| matcher.is_match(line))
        .map(|(i, line)| {
            let start = i.saturating_sub(CONTEXT_LINES);
            let end = (i + CONTEXT_LINES).min(lines.len() - 1);
            SearchMatch {
                line: Some(i as u32 + 1),
                content: line.trim().to_string(),
                context: lines[start..=end].join("\n"),
                kind: MatchKind::Content,
            }
        })
        .collect()
}

fn relevance(file: &FileNode, match_count: usize, query_lower: &str) -> i64 {
    let name_lower = file.name.to_lowercase();
    let mut score = match_count as i64;
    if name_lower.contains(query_lower) {
        score += 10;
    }
    if file
        .extension
        .as_deref()
        .is_some_and(|ext| COMMON_EXTENSIONS.contains(&ext))
    {
        score += 5;
    }
    if ENTRY_NAME_HINTS.iter().any(|hint| name_lower.contains(hint)) {
        score += 8;
    }
    if file.size.unwrap_or(0) > LARGE_FILE_BYTES {
        score -= 2;
    }
    score
}

//! Heuristic repository analysis shown in the "analysis" panel

use serde::Serialize;

use crate::layout::select_entry_points;
use crate::search::{FileSize, SearchEngine};
use crate::tree::FileTree;

const LARGEST_FILES: usize = 5;

/// Build system detected from manifests at the repository root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    Cargo,
    Npm,
    GoModules,
    Maven,
    Gradle,
    Python,
    Unknown,
}

impl ProjectKind {
    pub fn label(self) -> &'static str {
        match self {
            ProjectKind::Cargo => "Rust (Cargo)",
            ProjectKind::Npm => "JavaScript/TypeScript (npm)",
            ProjectKind::GoModules => "Go modules",
            ProjectKind::Maven => "Java (Maven)",
            ProjectKind::Gradle => "JVM (Gradle)",
            ProjectKind::Python => "Python",
            ProjectKind::Unknown => "general",
        }
    }
}

/// Detect the project type from the root listing.
pub fn detect_project_kind(tree: &FileTree) -> ProjectKind {
    let names: Vec<String> = tree
        .children(tree.root())
        .unwrap_or(&[])
        .iter()
        .filter_map(|&id| tree.get(id))
        .filter(|n| n.is_file())
        .map(|n| n.name.to_lowercase())
        .collect();
    let has = |name: &str| names.iter().any(|n| n == name);

    if has("cargo.toml") {
        ProjectKind::Cargo
    } else if has("package.json") {
        ProjectKind::Npm
    } else if has("go.mod") {
        ProjectKind::GoModules
    } else if has("pom.xml") {
        ProjectKind::Maven
    } else if has("build.gradle") || has("build.gradle.kts") {
        ProjectKind::Gradle
    } else if has("pyproject.toml") || has("requirements.txt") || has("setup.py") {
        ProjectKind::Python
    } else {
        ProjectKind::Unknown
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageShare {
    pub language: String,
    pub files: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoAnalysis {
    pub project_kind: ProjectKind,
    pub total_files: usize,
    pub total_directories: usize,
    pub total_size: u64,
    pub languages: Vec<LanguageShare>,
    pub primary_language: Option<String>,
    pub entry_points: Vec<String>,
    pub largest_files: Vec<FileSize>,
    pub unloaded_directories: usize,
    pub failed_directories: usize,
    pub summary: String,
}

/// Summarize what is currently loaded. Only the loaded part of the tree is
/// described; unloaded directories are counted so the caller can say so.
pub fn analyze(tree: &FileTree, engine: &SearchEngine) -> RepoAnalysis {
    let project_kind = detect_project_kind(tree);
    let total_files = engine.file_count();
    let total_directories = tree.iter().filter(|n| n.is_dir() && n.id != tree.root()).count();
    let total_size = engine.size_stats().total_size;

    let mut languages: Vec<LanguageShare> = engine
        .language_stats()
        .into_iter()
        .map(|(language, files)| LanguageShare {
            percent: percent(files, total_files),
            language,
            files,
        })
        .collect();
    languages.sort_by(|a, b| b.files.cmp(&a.files).then_with(|| a.language.cmp(&b.language)));
    let primary_language = languages
        .iter()
        .find(|l| l.language != "other")
        .map(|l| l.language.clone());

    let entry_points: Vec<String> = select_entry_points(tree)
        .into_iter()
        .filter(|&id| id != tree.root())
        .filter_map(|id| tree.get(id).map(|n| n.path.clone()))
        .collect();

    let mut largest: Vec<FileSize> = engine
        .files()
        .iter()
        .map(|f| FileSize {
            path: f.path.clone(),
            size: f.size.unwrap_or(0),
        })
        .collect();
    largest.sort_by(|a, b| b.size.cmp(&a.size));
    largest.truncate(LARGEST_FILES);

    let unloaded_directories = tree.unloaded_directories().len();
    let failed_directories = tree.failed_directories().len();

    let mut analysis = RepoAnalysis {
        project_kind,
        total_files,
        total_directories,
        total_size,
        languages,
        primary_language,
        entry_points,
        largest_files: largest,
        unloaded_directories,
        failed_directories,
        summary: String::new(),
    };
    analysis.summary = summarize(tree, &analysis);
    analysis
}

fn summarize(tree: &FileTree, analysis: &RepoAnalysis) -> String {
    let name = tree.get(tree.root()).map(|n| n.name.as_str()).unwrap_or("This repository");
    let mut parts = vec![format!(
        "{} looks like a {} project with {} files across {} directories.",
        name,
        analysis.project_kind.label(),
        analysis.total_files,
        analysis.total_directories
    )];

    if let Some(primary) = &analysis.primary_language {
        if let Some(share) = analysis.languages.iter().find(|l| &l.language == primary) {
            parts.push(format!("Most files are {} ({:.1}%).", primary, share.percent));
        }
    }
    if !analysis.entry_points.is_empty() {
        parts.push(format!("Good places to start: {}.", analysis.entry_points.join(", ")));
    }
    if analysis.unloaded_directories > 0 {
        parts.push(format!(
            "{} directories have not been loaded yet.",
            analysis.unloaded_directories
        ));
    }
    if analysis.failed_directories > 0 {
        parts.push(format!(
            "{} directories failed to load and can be retried.",
            analysis.failed_directories
        ));
    }
    parts.join(" ")
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 * 1000.0 / total as f64).round() / 10.0
}

//! Parsing user-supplied repository references

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepoRefError {
    #[error("repository reference is empty")]
    Empty,
    #[error("not a GitHub repository reference: {0}")]
    Invalid(String),
}

/// `owner/name` of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        RepoRef {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Accepts `owner/name`, `github.com/owner/name`,
    /// `https://github.com/owner/name(.git)` with any trailing
    /// `/tree/...` or `/blob/...` segments, and `git@github.com:owner/name.git`.
    pub fn parse(input: &str) -> Result<Self, RepoRefError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RepoRefError::Empty);
        }

        let rest = if let Some(rest) = trimmed.strip_prefix("git@github.com:") {
            rest
        } else {
            let without_scheme = trimmed
                .strip_prefix("https://")
                .or_else(|| trimmed.strip_prefix("http://"))
                .unwrap_or(trimmed);
            let without_www = without_scheme.strip_prefix("www.").unwrap_or(without_scheme);
            match without_www.strip_prefix("github.com/") {
                Some(rest) => rest,
                None if without_scheme.len() != trimmed.len() => {
                    return Err(RepoRefError::Invalid(trimmed.to_string()));
                }
                None => without_www,
            }
        };

        let mut segments = rest.split('/').filter(|s| !s.is_empty());
        let (Some(owner), Some(name)) = (segments.next(), segments.next()) else {
            return Err(RepoRefError::Invalid(trimmed.to_string()));
        };
        let name = name.strip_suffix(".git").unwrap_or(name);

        if !is_valid_segment(owner) || !is_valid_segment(name) {
            return Err(RepoRefError::Invalid(trimmed.to_string()));
        }
        Ok(RepoRef::new(owner, name))
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

impl FromStr for RepoRef {
    type Err = RepoRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RepoRef::parse(s)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepted_forms() {
        let expected = RepoRef::new("rust-lang", "cargo");
        for input in [
            "rust-lang/cargo",
            "  rust-lang/cargo  ",
            "github.com/rust-lang/cargo",
            "https://github.com/rust-lang/cargo",
            "https://www.github.com/rust-lang/cargo/",
            "http://github.com/rust-lang/cargo.git",
            "https://github.com/rust-lang/cargo/tree/master/src",
            "git@github.com:rust-lang/cargo.git",
        ] {
            assert_eq!(RepoRef::parse(input), Ok(expected.clone()), "{input}");
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(RepoRef::parse("   "), Err(RepoRefError::Empty));
        assert!(matches!(RepoRef::parse("cargo"), Err(RepoRefError::Invalid(_))));
        assert!(matches!(RepoRef::parse("https://gitlab.com/a/b"), Err(RepoRefError::Invalid(_))));
        assert!(matches!(RepoRef::parse("a b/c"), Err(RepoRefError::Invalid(_))));
        assert!(matches!(RepoRef::parse("../etc"), Err(RepoRefError::Invalid(_))));
    }

    #[test]
    fn test_display_and_urls() {
        let repo: RepoRef = "octo/demo".parse().unwrap();
        assert_eq!(repo.to_string(), "octo/demo");
        assert_eq!(repo.full_name(), "octo/demo");
        assert_eq!(repo.html_url(), "https://github.com/octo/demo");
    }
}

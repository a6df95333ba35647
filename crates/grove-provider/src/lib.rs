//! Repository content providers for Grove
//!
//! This crate fetches directory listings, file contents and repository
//! metadata from GitHub (or a local checkout) and applies them to a
//! [`grove_core::FileTree`].

pub mod reference;
pub mod provider;
pub mod providers;
pub mod cache;
pub mod rate_limit;
pub mod loader;

#[cfg(test)]
pub mod tests;

pub use reference::{RepoRef, RepoRefError};
pub use provider::{ContentProvider, FetchError, RepoInfo};
pub use providers::{create_provider, ProviderOptions};
pub use cache::ListingCache;
pub use rate_limit::{RateLimitStatus, RateLimitWarning};
pub use loader::{LoadOutcome, PrefetchReport, TreeLoader};

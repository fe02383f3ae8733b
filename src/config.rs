//! TOML configuration front-end
//!
//! Parses a `repositories.toml`-style file into repository descriptors and
//! a cache retention policy:
//!
//! ```toml
//! [[repository]]
//! name = "central"
//! url = "https://example.org/m2"
//! artifact-urls = ["https://mirror.example.org"]
//! prefer-structured-metadata = true
//!
//! [cache]
//! unused-entry-days = 14
//! ```

use crate::error::Result;
use crate::location::LocationResolver;
use crate::repository::RepositoryDescriptor;
use crate::retention::RetentionPolicy;
use crate::transport::Authentication;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// Parsed repository configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepoConfig {
    #[serde(default, rename = "repository")]
    pub repositories: Vec<RepositoryEntry>,

    #[serde(default)]
    pub cache: CacheSection,
}

/// One `[[repository]]` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RepositoryEntry {
    pub name: String,

    /// Primary URL token; may be absent, which only fails once a resolver
    /// is built from the descriptor
    pub url: Option<String>,

    /// Additional artifact locations, searched in order after the primary
    #[serde(default)]
    pub artifact_urls: Vec<String>,

    #[serde(default)]
    pub prefer_structured_metadata: bool,

    /// Optional bearer token for HTTP repositories
    pub token: Option<String>,
}

/// The `[cache]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheSection {
    pub unused_entry_days: Option<u32>,
}

/// Parse configuration from a file path
pub fn from_path(path: impl AsRef<Path>) -> Result<RepoConfig> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    from_str(&contents)
}

/// Parse configuration from a string
pub fn from_str(s: &str) -> Result<RepoConfig> {
    Ok(toml::from_str(s)?)
}

impl RepoConfig {
    /// Materialize descriptors, wiring each to the given location resolver
    pub fn descriptors(
        &self,
        locations: &Arc<dyn LocationResolver>,
    ) -> Vec<RepositoryDescriptor> {
        self.repositories
            .iter()
            .map(|entry| {
                let mut repo = RepositoryDescriptor::new(&entry.name, Arc::clone(locations));
                if let Some(url) = &entry.url {
                    repo.set_url(url.as_str());
                }
                repo.artifact_urls(entry.artifact_urls.iter().map(String::as_str));
                repo.set_prefer_structured_metadata(entry.prefer_structured_metadata);
                if let Some(token) = &entry.token {
                    repo.set_authentication(Authentication::bearer(token));
                }
                repo
            })
            .collect()
    }

    /// Materialize the retention policy through its validating setter
    ///
    /// An out-of-range configured value is rejected, never clamped.
    pub fn retention(&self) -> Result<RetentionPolicy> {
        let mut policy = RetentionPolicy::new();
        if let Some(days) = self.cache.unused_entry_days {
            policy.set_unused_entry_days(days)?;
        }
        Ok(policy)
    }
}

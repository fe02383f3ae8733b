//! Repository descriptors
//!
//! A [`RepositoryDescriptor`] is the user-facing configuration object for a
//! single artifact repository: its identity, primary URL, additional
//! artifact search URLs, and metadata-format preference. It accepts URL
//! tokens without validation and resolves them lazily on every read.

use crate::error::Result;
use crate::location::{Location, LocationResolver};
use crate::transport::Authentication;
use std::sync::Arc;
use url::Url;

/// Configuration for one artifact repository
#[derive(Clone)]
pub struct RepositoryDescriptor {
    name: String,
    url: Option<Location>,
    additional_urls: Vec<Location>,
    prefer_structured_metadata: bool,
    authentication: Authentication,
    locations: Arc<dyn LocationResolver>,
}

impl RepositoryDescriptor {
    pub fn new(name: impl Into<String>, locations: Arc<dyn LocationResolver>) -> Self {
        Self {
            name: name.into(),
            url: None,
            additional_urls: Vec::new(),
            prefer_structured_metadata: false,
            authentication: Authentication::none(),
            locations,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the primary URL token; accepted without validation
    pub fn set_url(&mut self, url: impl Into<Location>) {
        self.url = Some(url.into());
    }

    /// Resolve and return the primary URL
    ///
    /// Resolution runs on every call so that the result reflects the
    /// current external context; malformed tokens fail here, not at set
    /// time.
    pub fn url(&self) -> Result<Option<Url>> {
        match &self.url {
            Some(token) => Ok(Some(self.locations.resolve(token)?)),
            None => Ok(None),
        }
    }

    /// Append additional artifact locations, preserving order and
    /// duplicates
    pub fn artifact_urls<I, T>(&mut self, urls: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<Location>,
    {
        self.additional_urls.extend(urls.into_iter().map(Into::into));
    }

    /// Replace the entire additional-URL set
    pub fn set_artifact_urls<I, T>(&mut self, urls: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<Location>,
    {
        self.additional_urls = urls.into_iter().map(Into::into).collect();
    }

    /// Resolve the additional artifact URLs in insertion order
    ///
    /// Duplicate tokens that resolve to the same URL collapse to the first
    /// occurrence; there is no further dedup logic.
    pub fn resolved_artifact_urls(&self) -> Result<Vec<Url>> {
        let mut result: Vec<Url> = Vec::with_capacity(self.additional_urls.len());
        for token in &self.additional_urls {
            let url = self.locations.resolve(token)?;
            if !result.contains(&url) {
                result.push(url);
            }
        }
        Ok(result)
    }

    pub fn prefer_structured_metadata(&self) -> bool {
        self.prefer_structured_metadata
    }

    /// Toggle whether structured metadata is tried before legacy POM
    /// descriptors; this ordering is policy, not contract
    pub fn set_prefer_structured_metadata(&mut self, prefer: bool) {
        self.prefer_structured_metadata = prefer;
    }

    pub fn authentication(&self) -> &Authentication {
        &self.authentication
    }

    pub fn set_authentication(&mut self, authentication: Authentication) {
        self.authentication = authentication;
    }

    /// Human-readable name for diagnostics: `name` without a URL,
    /// `name(url)` with one; never used for equality or lookup
    pub fn display_name(&self) -> String {
        match self.url() {
            Ok(Some(url)) => format!("{}({})", self.name, url),
            Ok(None) => self.name.clone(),
            Err(e) => {
                log::debug!("cannot resolve URL of repository '{}': {}", self.name, e);
                self.name.clone()
            }
        }
    }
}

impl std::fmt::Debug for RepositoryDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryDescriptor")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("additional_urls", &self.additional_urls)
            .field(
                "prefer_structured_metadata",
                &self.prefer_structured_metadata,
            )
            .finish()
    }
}
